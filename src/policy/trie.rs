//! Per-character trie mapping filesystem paths to access decisions.
//!
//! Nodes live in an arena (`Vec` indexed by `usize`, root at index 0), so
//! the structure has no manual allocation, drops trivially even with
//! overlapping prefix registrations, and is safe to share read-only across
//! threads.
//!
//! Wildcards match exactly one path segment: a `*` edge consumes characters
//! up to the next separator, never across it, which bounds wildcard fan-out
//! to one directory level per hop. Matching is non-backtracking — a literal
//! child, when present, is always taken over the wildcard — so a query costs
//! one node visit per input character plus at most [`DEFAULT_WILDCARD_TTL`]
//! wildcard hops.

use std::collections::HashMap;

use crate::paths::PATH_SEPARATOR;

/// Maximum wildcard hops per query before the lookup fails closed.
///
/// This is a recursion budget, not a path-depth limit: literal matching is
/// never charged against it. 64 hops is far deeper than any sane filesystem
/// layout while still bounding work on maliciously deep query paths.
pub const DEFAULT_WILDCARD_TTL: u32 = 64;

/// Access decision attached to a registered path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Path is visible but immutable.
    ReadOnly,
    /// Path is visible and writable.
    ReadWrite,
    /// Path is explicitly hidden, overriding any broader grant.
    Deny,
}

#[derive(Debug, Default)]
struct Node {
    children: HashMap<char, usize>,
    /// Distinguished child matching any single path segment.
    wildcard: Option<usize>,
    /// Decision for the path ending exactly at this node. `None` on interior
    /// nodes that were never registered themselves.
    flag: Option<Access>,
}

/// Trie of path-to-access rules with single-segment wildcards.
///
/// # Example
///
/// ```
/// use fsjail::policy::{Access, AccessTrie};
///
/// let mut trie = AccessTrie::new();
/// trie.set("/etc/passwd", Access::ReadOnly, false);
/// trie.set("/tmp/*", Access::ReadWrite, true);
///
/// assert_eq!(trie.get("/etc/passwd"), Some(Access::ReadOnly));
/// assert_eq!(trie.get("/tmp/scratch"), Some(Access::ReadWrite));
/// assert_eq!(trie.get("/etc/shadow"), None); // no rule: fail closed
/// ```
#[derive(Debug)]
pub struct AccessTrie {
    nodes: Vec<Node>,
    wildcard_ttl: u32,
}

impl Default for AccessTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessTrie {
    /// Creates an empty trie with the default wildcard hop budget.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            wildcard_ttl: DEFAULT_WILDCARD_TTL,
        }
    }

    /// Overrides the wildcard hop budget applied to each query.
    #[must_use]
    pub fn with_wildcard_ttl(mut self, ttl: u32) -> Self {
        self.wildcard_ttl = ttl;
        self
    }

    /// Registers `access` for `path`, overwriting any earlier decision for
    /// the identical path. Rules for other paths, including ancestors and
    /// descendants, are unaffected.
    ///
    /// With `wildcard` set, each `*` in `path` becomes a single-segment
    /// wildcard edge; otherwise `*` is an ordinary literal character.
    pub fn set(&mut self, path: &str, access: Access, wildcard: bool) {
        let mut cur = 0;
        for ch in path.chars() {
            cur = if wildcard && ch == '*' {
                match self.nodes[cur].wildcard {
                    Some(next) => next,
                    None => {
                        let next = self.alloc();
                        self.nodes[cur].wildcard = Some(next);
                        next
                    }
                }
            } else {
                match self.nodes[cur].children.get(&ch) {
                    Some(&next) => next,
                    None => {
                        let next = self.alloc();
                        self.nodes[cur].children.insert(ch, next);
                        next
                    }
                }
            };
        }
        self.nodes[cur].flag = Some(access);
    }

    /// Looks up the decision applying to `path`.
    ///
    /// Returns `None` — the fail-closed sentinel — when no registered rule
    /// matches, when the walk dead-ends, or when the wildcard budget is
    /// exhausted. A literal edge always wins over a wildcard edge for the
    /// same position, so exact registrations shadow patterns.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Access> {
        let input: Vec<char> = path.chars().collect();
        let mut cur = 0;
        let mut i = 0;
        let mut ttl = self.wildcard_ttl;

        while i < input.len() {
            if let Some(&next) = self.nodes[cur].children.get(&input[i]) {
                cur = next;
                i += 1;
            } else if let Some(next) = self.nodes[cur].wildcard {
                if ttl == 0 {
                    return None;
                }
                ttl -= 1;
                // Consume the rest of the current segment in one step
                while i < input.len() && input[i] != PATH_SEPARATOR {
                    i += 1;
                }
                cur = next;
            } else {
                return None;
            }
        }

        self.nodes[cur].flag
    }

    fn alloc(&mut self) -> usize {
        self.nodes.push(Node::default());
        self.nodes.len() - 1
    }
}
