//! Host capability probing.

mod caps;

pub use caps::{MountCapabilities, MIN_KERNEL_LAZY_UMOUNT, MIN_KERNEL_SHARED_SUBTREES};
