//! Mount-capability detection.
//!
//! Probed once at startup instead of silently treating unsupported mount
//! flags as no-ops: a supervisor that asks for slave propagation on a kernel
//! without shared subtrees should learn that up front, not discover it from
//! a sandbox that quietly shares its mounts with the host.

use std::fs;

use tracing::debug;

use crate::paths::TYPE_TMPFS;

/// Shared subtrees (and thus MS_SLAVE/MS_PRIVATE/MS_SHARED) landed in 2.6.15.
pub const MIN_KERNEL_SHARED_SUBTREES: (u32, u32, u32) = (2, 6, 15);

/// Lazy unmount (MNT_DETACH) landed in 2.4.11.
pub const MIN_KERNEL_LAZY_UMOUNT: (u32, u32, u32) = (2, 4, 11);

/// What the running kernel supports of the mount features this crate uses.
#[derive(Debug, Clone)]
pub struct MountCapabilities {
    /// Kernel release string, e.g. "6.8.0-45-generic".
    pub kernel_release: String,
    /// Propagation-mode changes (shared subtrees) are available.
    pub propagation: bool,
    /// MNT_DETACH lazy unmounting is available.
    pub lazy_umount: bool,
    /// tmpfs is listed in /proc/filesystems.
    pub tmpfs: bool,
}

impl MountCapabilities {
    /// Probes the running kernel.
    ///
    /// Unparseable version strings degrade to "not supported" for the
    /// version-gated features, which fails toward less capability rather
    /// than attempting a mount the kernel may misinterpret.
    #[must_use]
    pub fn detect() -> Self {
        let release = kernel_release();
        let version = parse_kernel_release(&release);

        let caps = Self {
            propagation: version.is_some_and(|v| v >= MIN_KERNEL_SHARED_SUBTREES),
            lazy_umount: version.is_some_and(|v| v >= MIN_KERNEL_LAZY_UMOUNT),
            tmpfs: filesystem_supported(TYPE_TMPFS),
            kernel_release: release,
        };
        debug!(?caps, "Detected mount capabilities");
        caps
    }

    /// True when every feature this crate relies on is present.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.propagation && self.lazy_umount && self.tmpfs
    }
}

fn kernel_release() -> String {
    match nix::sys::utsname::uname() {
        Ok(uts) => uts.release().to_string_lossy().into_owned(),
        Err(_) => String::new(),
    }
}

/// Parses "major.minor.patch[-suffix]" into a comparable triple.
fn parse_kernel_release(release: &str) -> Option<(u32, u32, u32)> {
    let mut parts = release.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    // Patch may carry a suffix like "0-45-generic"
    let patch = parts
        .next()
        .and_then(|p| {
            p.split(|c: char| !c.is_ascii_digit())
                .next()
                .and_then(|digits| digits.parse().ok())
        })
        .unwrap_or(0);
    Some((major, minor, patch))
}

/// Checks /proc/filesystems for a filesystem type name.
fn filesystem_supported(fstype: &str) -> bool {
    let Ok(content) = fs::read_to_string("/proc/filesystems") else {
        return false;
    };
    content
        .lines()
        .filter_map(|line| line.split_whitespace().last())
        .any(|name| name == fstype)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kernel_release_standard() {
        assert_eq!(parse_kernel_release("6.8.0"), Some((6, 8, 0)));
    }

    #[test]
    fn test_parse_kernel_release_with_suffix() {
        assert_eq!(parse_kernel_release("6.8.0-45-generic"), Some((6, 8, 0)));
        assert_eq!(parse_kernel_release("5.15.12-arch1"), Some((5, 15, 12)));
    }

    #[test]
    fn test_parse_kernel_release_short_and_invalid() {
        assert_eq!(parse_kernel_release("2.6"), Some((2, 6, 0)));
        assert_eq!(parse_kernel_release("garbage"), None);
        assert_eq!(parse_kernel_release("6"), None);
    }

    #[test]
    fn test_version_gates() {
        assert!((2, 6, 15) >= MIN_KERNEL_SHARED_SUBTREES);
        assert!((2, 6, 14) < MIN_KERNEL_SHARED_SUBTREES);
        assert!((2, 4, 11) >= MIN_KERNEL_LAZY_UMOUNT);
    }

    #[test]
    fn test_detect_on_live_kernel() {
        let caps = MountCapabilities::detect();
        // Any kernel this crate builds on is far past 2.6.15
        assert!(caps.propagation, "caps: {caps:?}");
        assert!(caps.lazy_umount, "caps: {caps:?}");
        assert!(caps.tmpfs, "caps: {caps:?}");
        assert!(caps.is_satisfied());
    }
}
