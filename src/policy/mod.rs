//! Path-based access control.
//!
//! The supervisor registers per-path access decisions here and consults them
//! on the hot path of every filesystem check, so lookup cost must scale with
//! path length, not with the number of registered rules.

mod trie;

pub use trie::{Access, AccessTrie, DEFAULT_WILDCARD_TTL};
