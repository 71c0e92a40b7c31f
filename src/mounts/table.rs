//! Live mount table parsing and lookup.
//!
//! The kernel's mount list (`/proc/mounts`) is re-parsed on every query.
//! Mounts change underneath us between calls — a cached table would answer
//! teardown questions about a world that no longer exists — and the file is
//! small enough that re-reading is cheap.
//!
//! The table is kernel-authoritative text, not validated input: lines that
//! do not match the expected shape are skipped, never escalated.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};

use tracing::{trace, warn};

use crate::error::MountError;
use crate::paths::{self, MOUNTS_PATH};

/// One row of the live mount table, keyed by its mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Source device or name (first field).
    pub fsname: String,
    /// Mount point, absolute path.
    pub dir: String,
    /// Filesystem type name, e.g. `tmpfs` or `cgroup`.
    pub fstype: String,
    /// Comma-separated option string as reported by the kernel.
    pub opts: String,
}

/// Reads the live mount table into a map from mount point to entry.
///
/// Unparseable lines are skipped. Only failure to open the table itself is
/// reported as an error.
pub fn get_mounts() -> Result<HashMap<String, MountEntry>, MountError> {
    parse_mounts_file(MOUNTS_PATH)
}

fn parse_mounts_file(path: &str) -> Result<HashMap<String, MountEntry>, MountError> {
    let file = File::open(path).map_err(|e| MountError::Table {
        path: path.to_string(),
        source: e,
    })?;
    Ok(parse_mounts_reader(BufReader::new(file)))
}

fn parse_mounts_reader<R: BufRead>(reader: R) -> HashMap<String, MountEntry> {
    let mut mounts = HashMap::new();
    for line in reader.lines() {
        // One unreadable line must not hide the mounts after it from
        // teardown discovery
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable mount table line");
                continue;
            }
        };
        match parse_mounts_line(&line) {
            Some(entry) => {
                mounts.insert(entry.dir.clone(), entry);
            }
            None => {
                if !line.trim().is_empty() {
                    warn!(line = %line, "Skipping malformed mount table line");
                }
            }
        }
    }

    trace!(count = mounts.len(), "Parsed mount table");
    mounts
}

/// Parses one whitespace-separated mount table line:
/// `fsname dir type opts freq passno`. The two trailing numeric fields are
/// ignored.
fn parse_mounts_line(line: &str) -> Option<MountEntry> {
    let mut fields = line.split_whitespace();
    let fsname = fields.next()?;
    let dir = fields.next()?;
    let fstype = fields.next()?;
    let opts = fields.next()?;

    Some(MountEntry {
        fsname: unescape(fsname),
        dir: unescape(dir),
        fstype: fstype.to_string(),
        opts: opts.to_string(),
    })
}

/// Decodes the kernel's octal escapes in mount table fields.
///
/// Spaces are encoded as `\040`, tabs as `\011`, and so on; a backslash that
/// does not start a three-digit octal sequence is kept as-is.
fn unescape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        let mut octal = String::new();
        for _ in 0..3 {
            match chars.peek() {
                Some(&d) if ('0'..='7').contains(&d) => {
                    octal.push(d);
                    chars.next();
                }
                _ => break,
            }
        }
        match u8::from_str_radix(&octal, 8) {
            Ok(code) if octal.len() == 3 => result.push(code as char),
            _ => {
                result.push(c);
                result.push_str(&octal);
            }
        }
    }

    result
}

/// Returns the mount point governing `path`: the longest prefix of the
/// lexically expanded path that is a key in the current mount table.
///
/// With stacked mounts, several ancestors of a path can themselves be mount
/// points; the most specific one wins. Returns `None` only when nothing, not
/// even the root, matches — which should not happen on a live system.
pub fn get_mount_point(path: &str) -> Result<Option<String>, MountError> {
    let mounts = get_mounts()?;
    let expanded = paths::expand(path);
    Ok(longest_mounted_prefix(&expanded, &mounts))
}

fn longest_mounted_prefix(
    expanded: &str,
    mounts: &HashMap<String, MountEntry>,
) -> Option<String> {
    let mut candidate = expanded;
    loop {
        if mounts.contains_key(candidate) {
            return Some(candidate.to_string());
        }
        if candidate == "/" {
            return None;
        }
        candidate = match candidate.rfind(paths::PATH_SEPARATOR) {
            Some(0) => "/",
            Some(idx) => &candidate[..idx],
            None => return None,
        };
    }
}

/// Returns every current mount at or below `root`, deepest mount point
/// first.
///
/// This is the unmount order: an outer mount detached before its inner
/// mounts orphans them, so teardown walks this list front to back.
pub fn mounts_under(root: &str) -> Result<Vec<MountEntry>, MountError> {
    let root = paths::expand(root);
    let mut entries: Vec<MountEntry> = get_mounts()?
        .into_values()
        .filter(|e| e.dir == root || e.dir.starts_with(&paths::join(&root, "")))
        .collect();
    entries.sort_by(|a, b| b.dir.len().cmp(&a.dir.len()).then(b.dir.cmp(&a.dir)));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_tmpfs() {
        let entry = parse_mounts_line("tmpfs /sandbox/tmp tmpfs rw,size=1048576 0 0")
            .expect("should parse");
        assert_eq!(entry.fsname, "tmpfs");
        assert_eq!(entry.dir, "/sandbox/tmp");
        assert_eq!(entry.fstype, "tmpfs");
        assert!(entry.opts.contains("size=1048576"));
    }

    #[test]
    fn test_parse_line_rejects_short_lines() {
        assert!(parse_mounts_line("").is_none());
        assert!(parse_mounts_line("tmpfs /x").is_none());
        assert!(parse_mounts_line("tmpfs /x tmpfs").is_none());
    }

    #[test]
    fn test_unescape_octal() {
        assert_eq!(unescape(r"/mnt/with\040space"), "/mnt/with space");
        assert_eq!(unescape(r"/tab\011here"), "/tab\there");
        assert_eq!(unescape("/plain"), "/plain");
        // Incomplete escape is preserved
        assert_eq!(unescape(r"/odd\04"), r"/odd\04");
    }

    #[test]
    fn test_parse_reader_skips_unreadable_line() {
        use std::io::{BufReader, Read};

        // Yields one good line, then an I/O error, then another good line
        struct FlakyReader {
            chunks: Vec<Option<&'static [u8]>>,
        }

        impl Read for FlakyReader {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                match self.chunks.pop() {
                    Some(Some(bytes)) => {
                        buf[..bytes.len()].copy_from_slice(bytes);
                        Ok(bytes.len())
                    }
                    Some(None) => Err(std::io::Error::other("transient read failure")),
                    None => Ok(0),
                }
            }
        }

        let reader = FlakyReader {
            // Popped back to front
            chunks: vec![
                Some(b"tmpfs /b tmpfs rw 0 0\n"),
                None,
                Some(b"tmpfs /a tmpfs rw 0 0\n"),
            ],
        };

        let mounts = parse_mounts_reader(BufReader::new(reader));
        assert!(mounts.contains_key("/a"));
        assert!(
            mounts.contains_key("/b"),
            "mounts after a read error were dropped: {mounts:?}"
        );
    }

    #[test]
    fn test_longest_prefix_picks_most_specific() {
        let mut mounts = HashMap::new();
        for dir in ["/", "/sandbox", "/sandbox/tmp"] {
            mounts.insert(
                dir.to_string(),
                MountEntry {
                    fsname: "x".into(),
                    dir: dir.to_string(),
                    fstype: "tmpfs".into(),
                    opts: "rw".into(),
                },
            );
        }

        assert_eq!(
            longest_mounted_prefix("/sandbox/tmp/file", &mounts),
            Some("/sandbox/tmp".to_string())
        );
        assert_eq!(
            longest_mounted_prefix("/sandbox/etc", &mounts),
            Some("/sandbox".to_string())
        );
        assert_eq!(
            longest_mounted_prefix("/usr/bin", &mounts),
            Some("/".to_string())
        );
    }

    #[test]
    fn test_longest_prefix_empty_table() {
        let mounts = HashMap::new();
        assert_eq!(longest_mounted_prefix("/anything", &mounts), None);
    }

    #[test]
    fn test_get_mounts_live_table_has_root() {
        // /proc/mounts always lists the root filesystem
        let mounts = get_mounts().expect("mount table should be readable");
        assert!(mounts.contains_key("/"), "root mount missing: {mounts:?}");
    }

    #[test]
    fn test_get_mount_point_resolves_dotdot() {
        let mp = get_mount_point("/usr/../usr/bin")
            .expect("table readable")
            .expect("some mount governs /usr/bin");
        assert!(paths::is_absolute(&mp));
    }
}
