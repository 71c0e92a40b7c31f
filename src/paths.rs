//! Path manipulation and inspection helpers.
//!
//! These are the string-level path operations the mount layer and the access
//! policy share: joining, lexical normalization, symlink resolution with a
//! defined fallback, and access testing. Paths are handled as strings because
//! the access-control trie matches on characters and the mount table reports
//! plain text; callers convert to `Path` at the syscall boundary.
//!
//! Everything here is side-effect-free apart from read-only filesystem
//! queries (stat/access/readlink).

use std::fs;
use std::path::Path;

use nix::unistd::{access, AccessFlags};
use tracing::trace;

/// Path separator. Should be '/'.
pub const PATH_SEPARATOR: char = '/';

/// Location of the live mount table, typically `/proc/mounts`.
pub const MOUNTS_PATH: &str = "/proc/mounts";

/// procfs root.
pub const PROC_PATH: &str = "/proc";

/// cgroup filesystem type name.
pub const TYPE_CGROUP: &str = "cgroup";

/// tmpfs filesystem type name.
pub const TYPE_TMPFS: &str = "tmpfs";

/// Joins `dir` and `base` with exactly one separator at the seam.
///
/// Trailing separators on `dir` and leading separators on `base` are
/// collapsed, so `join("/a/", "/b")`, `join("/a", "b")` and `join("/a/", "b")`
/// all produce `/a/b`.
#[must_use]
pub fn join(dir: &str, base: &str) -> String {
    let dir = dir.trim_end_matches(PATH_SEPARATOR);
    let base = base.trim_start_matches(PATH_SEPARATOR);
    if dir.is_empty() && base.is_empty() {
        return String::from(PATH_SEPARATOR);
    }
    format!("{dir}{PATH_SEPARATOR}{base}")
}

/// Returns true iff `path` starts with the separator.
#[must_use]
pub fn is_absolute(path: &str) -> bool {
    path.starts_with(PATH_SEPARATOR)
}

/// Lexically normalizes `path` without touching the filesystem.
///
/// Collapses repeated separators, removes `.` segments, and folds `..`
/// against the preceding segment. A `..` that would climb above the root of
/// an absolute path is clamped at the root; on a relative path it is kept.
///
/// Symlinks are NOT followed, so `expand("/a/link/..")` may name a different
/// file than the kernel would resolve. Use [`resolve`] when link-accurate
/// results are required.
#[must_use]
pub fn expand(path: &str) -> String {
    let absolute = is_absolute(path);
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split(PATH_SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                if let Some(last) = segments.last() {
                    if *last != ".." {
                        segments.pop();
                        continue;
                    }
                }
                // Keep ".." on relative paths, clamp at root on absolute ones
                if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        String::from(".")
    } else {
        joined
    }
}

/// Resolves `path` through symlinks, recursively.
///
/// Relative paths are interpreted against `work_dir`. If resolution fails —
/// the path does not exist, a component is not traversable, or the kernel
/// reports a symlink loop — the lexical fallback of
/// `expand(join(work_dir, path))` (or `expand(path)` when absolute) is
/// returned instead, so callers always get a usable normalized path.
#[must_use]
pub fn resolve(path: &str, work_dir: &str) -> String {
    let full = if is_absolute(path) {
        path.to_string()
    } else {
        join(work_dir, path)
    };

    // canonicalize resolves every link in every component and fails with
    // ELOOP on cycles, which is exactly the termination guarantee we need.
    match fs::canonicalize(&full) {
        Ok(resolved) => resolved.to_string_lossy().into_owned(),
        Err(e) => {
            trace!(path = %full, error = %e, "canonicalize failed, using lexical expansion");
            expand(&full)
        }
    }
}

/// Tests access to `path`, resolved against `work_dir`.
///
/// `mode` follows `faccessat` semantics. A missing or unresolvable file is
/// simply not accessible; this never returns an error.
#[must_use]
pub fn is_accessible(path: &str, mode: AccessFlags, work_dir: &str) -> bool {
    let resolved = resolve(path, work_dir);
    access(resolved.as_str(), mode).is_ok()
}

/// Returns true if `path` names an existing directory.
#[must_use]
pub fn is_dir(path: &str) -> bool {
    Path::new(path).is_dir()
}

/// Creates `dir` and any missing ancestors, like `mkdir -p`.
///
/// Returns the number of directories actually created.
pub fn mkdir_p(dir: &str, mode: u32) -> std::io::Result<usize> {
    use std::os::unix::fs::PermissionsExt;

    let expanded = expand(dir);
    let absolute = is_absolute(&expanded);
    let mut created = 0;
    let mut prefix = String::new();

    for segment in expanded.split(PATH_SEPARATOR) {
        if segment.is_empty() {
            continue;
        }
        if !prefix.is_empty() || absolute {
            prefix.push(PATH_SEPARATOR);
        }
        prefix.push_str(segment);
        let p = Path::new(&prefix);
        if !p.is_dir() {
            fs::create_dir(p)?;
            fs::set_permissions(p, fs::Permissions::from_mode(mode))?;
            created += 1;
        }
    }

    Ok(created)
}

/// Writes `content` to the file at `path`, creating or truncating it.
pub fn write_file(path: &str, content: &str) -> std::io::Result<()> {
    fs::write(path, content)
}

/// Reads up to `max_len` bytes from the file at `path`.
///
/// Returns an empty string on any failure; control files under procfs
/// routinely vanish, and callers treat "unreadable" and "empty" alike.
#[must_use]
pub fn read_file(path: &str, max_len: usize) -> String {
    use std::io::Read;

    let Ok(file) = fs::File::open(path) else {
        return String::new();
    };
    let mut buf = String::new();
    match file.take(max_len as u64).read_to_string(&mut buf) {
        Ok(_) => buf,
        Err(_) => String::new(),
    }
}
