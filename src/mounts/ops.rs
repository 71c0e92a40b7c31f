//! Privileged mount operations.
//!
//! These are the individually-correct primitives a sandbox supervisor
//! composes: propagation change, tmpfs and bind mounts, remount-to-tighten,
//! and reverse-order unmounting. Sequencing a full sandbox build is the
//! caller's job; each operation here is synchronous and may block on kernel
//! contention.
//!
//! # Security invariants
//!
//! - Every bind mount carries `MS_NOSUID`, unconditionally. Bind mounts are
//!   how host files become visible inside the sandbox, and a set-uid binary
//!   crossing that boundary is a privilege escalation.
//! - Propagation defaults to slave: mount events may flow from the host into
//!   the sandbox but never back out.

use nix::errno::Errno;
use nix::mount::{mount, umount2, MntFlags, MsFlags};
use nix::unistd::AccessFlags;
use tracing::{debug, instrument, warn};

use crate::error::MountError;
use crate::paths::{self, TYPE_TMPFS};

use super::table;

/// Mount propagation mode.
///
/// `Slave` is the default everywhere in this crate: an isolation layer must
/// fail toward less sharing, not more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Receive mount events from the parent namespace, propagate none back.
    #[default]
    Slave,
    /// No propagation in either direction.
    Private,
    /// Bidirectional propagation.
    Shared,
}

impl Propagation {
    fn flags(self) -> MsFlags {
        match self {
            Propagation::Slave => MsFlags::MS_SLAVE,
            Propagation::Private => MsFlags::MS_PRIVATE,
            Propagation::Shared => MsFlags::MS_SHARED,
        }
    }
}

fn syscall_err(op: &'static str, path: &str, errno: Errno) -> MountError {
    MountError::Syscall {
        op,
        path: path.to_string(),
        errno,
    }
}

/// Bind-mounts `src` onto `dest` with `MS_NOSUID` always applied.
///
/// The bind is non-recursive: mount points below `src` are not replicated
/// into `dest`. A recursive bind would copy submounts with their original
/// flags, and a set-uid-capable submount slipping through would break the
/// nosuid guarantee for exactly the paths it covers.
///
/// The source is access-checked before any syscall, so
/// [`MountError::SourceUnavailable`] means the mount table was not touched.
///
/// # Errors
///
/// `SourceUnavailable` if `src` cannot be accessed, `Syscall` if the kernel
/// refuses either the bind or the nosuid remount.
#[instrument]
pub fn bind(src: &str, dest: &str) -> Result<(), MountError> {
    bind_with_flags(src, dest, MsFlags::empty())
}

/// Bind-mounts `src` onto `dest` read-only (and, as always, nosuid).
///
/// Used to expose host files the sandboxed process may read but must not
/// mutate.
#[instrument]
pub fn bind_readonly(src: &str, dest: &str) -> Result<(), MountError> {
    bind_with_flags(src, dest, MsFlags::MS_RDONLY)
}

fn bind_with_flags(src: &str, dest: &str, extra: MsFlags) -> Result<(), MountError> {
    if !paths::is_accessible(src, AccessFlags::F_OK, "") {
        return Err(MountError::SourceUnavailable {
            path: src.to_string(),
        });
    }

    debug!("Creating bind mount");
    mount(
        Some(src),
        dest,
        None::<&str>,
        MsFlags::MS_BIND,
        None::<&str>,
    )
    .map_err(|e| syscall_err("bind mount", dest, e))?;

    // The kernel ignores permission flags on the initial bind; they only
    // take effect on a bind-remount.
    mount(
        None::<&str>,
        dest,
        None::<&str>,
        MsFlags::MS_REMOUNT | MsFlags::MS_BIND | MsFlags::MS_NOSUID | extra,
        None::<&str>,
    )
    .map_err(|e| syscall_err("bind remount", dest, e))?;

    Ok(())
}

/// Mounts a size-bounded tmpfs at `dest`.
///
/// `max_size` is in bytes and advisory: the kernel rounds it up to its block
/// granularity, so callers must not assume exact byte accounting. `mode`
/// is the root directory mode, e.g. `0o777` for a world-writable scratch
/// area.
///
/// # Errors
///
/// `AlreadyMounted` if `dest` is already a tmpfs mount point, `Syscall` if
/// the mount fails.
#[instrument]
pub fn tmpfs(dest: &str, max_size: usize, mode: u32) -> Result<(), MountError> {
    let expanded = paths::expand(dest);
    if let Some(entry) = table::get_mounts()?.get(&expanded) {
        if entry.fstype == TYPE_TMPFS {
            return Err(MountError::AlreadyMounted { path: expanded });
        }
    }

    let options = format!("size={max_size},mode={mode:o}");
    debug!(options = %options, "Mounting tmpfs");

    mount(
        Some(TYPE_TMPFS),
        expanded.as_str(),
        Some(TYPE_TMPFS),
        MsFlags::MS_NOSUID,
        Some(options.as_str()),
    )
    .map_err(|e| syscall_err("tmpfs mount", &expanded, e))
}

/// Re-applies mount flags to an existing mount point without unmounting.
///
/// Used to tighten permissions after initial setup, e.g.
/// `remount(dest, MsFlags::MS_RDONLY | MsFlags::MS_NOSUID)`.
///
/// # Errors
///
/// `NotMounted` if `dest` is not currently a mount point, `Syscall` if the
/// kernel refuses the remount.
#[instrument]
pub fn remount(dest: &str, flags: MsFlags) -> Result<(), MountError> {
    let expanded = paths::expand(dest);
    if !table::get_mounts()?.contains_key(&expanded) {
        return Err(MountError::NotMounted { path: expanded });
    }

    debug!(?flags, "Remounting");
    mount(
        None::<&str>,
        expanded.as_str(),
        None::<&str>,
        MsFlags::MS_REMOUNT | flags,
        None::<&str>,
    )
    .map_err(|e| syscall_err("remount", &expanded, e))
}

/// Changes the mount propagation mode of `dest`.
///
/// Must be applied before namespace isolation so sandbox mount activity
/// cannot leak into the host table. `recursive` applies the change to the
/// whole subtree (`MS_REC`).
#[instrument]
pub fn set_propagation(
    dest: &str,
    mode: Propagation,
    recursive: bool,
) -> Result<(), MountError> {
    let mut flags = mode.flags();
    if recursive {
        flags |= MsFlags::MS_REC;
    }

    debug!(?mode, recursive, "Changing mount propagation");
    mount(None::<&str>, dest, None::<&str>, flags, None::<&str>)
        .map_err(|e| syscall_err("propagation change", dest, e))
}

/// Detaches the mount at `dest`.
///
/// Lazy (`MNT_DETACH`) unmounting detaches the mount point immediately and
/// defers teardown until no process references it, so cleanup is not blocked
/// by stragglers. Callers that need deterministic state pass
/// `lazy = false` and handle `EBUSY` themselves; nothing here retries.
///
/// # Errors
///
/// `NotMounted` if `dest` was not a mount point, `Syscall` otherwise.
#[instrument]
pub fn umount(dest: &str, lazy: bool) -> Result<(), MountError> {
    let flags = if lazy {
        MntFlags::MNT_DETACH
    } else {
        MntFlags::empty()
    };

    debug!(lazy, "Unmounting");
    umount2(dest, flags).map_err(|e| match e {
        Errno::EINVAL | Errno::ENOENT => MountError::NotMounted {
            path: dest.to_string(),
        },
        errno => syscall_err("umount", dest, errno),
    })
}

/// Lazily unmounts everything at or below `root`, deepest mount first.
///
/// Discovery uses the live mount table, so mounts created by other actors
/// under `root` are swept up too. Continues past individual failures to
/// detach as much as possible and reports the first error encountered.
#[instrument]
pub fn umount_all_under(root: &str) -> Result<(), MountError> {
    let entries = table::mounts_under(root)?;
    debug!(count = entries.len(), "Tearing down mounts");

    let mut first_error: Option<MountError> = None;
    for entry in &entries {
        if let Err(e) = umount(&entry.dir, true) {
            warn!(dir = %entry.dir, error = %e, "Failed to unmount during teardown");
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
