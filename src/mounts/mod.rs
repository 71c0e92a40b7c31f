//! Mount namespace orchestration.
//!
//! Two halves: [`table`] parses the live mount table and answers
//! "which mount point governs this path", [`ops`] performs the privileged
//! mount/umount/propagation syscalls that build and dismantle the isolated
//! filesystem view.

pub mod ops;
pub mod table;

pub use ops::{
    bind, bind_readonly, remount, set_propagation, tmpfs, umount, umount_all_under, Propagation,
};
pub use table::{get_mount_point, get_mounts, mounts_under, MountEntry};
