//! fsjail - Filesystem-isolation core for a judging sandbox.
//!
//! This crate confines what portions of the filesystem a supervised process
//! can see and mutate. It provides the primitives a sandbox supervisor
//! composes into a private mount namespace:
//!
//! - [`mounts`] — privileged mount operations (bind, tmpfs, propagation,
//!   remount, lazy unmount) and live mount-table queries
//! - [`policy`] — a path trie answering "what access does this path have"
//!   in time proportional to path length
//! - [`lock`] — a scoped file lock serializing setup/teardown across
//!   concurrent supervisor processes
//! - [`paths`] — path joining, lexical expansion, and symlink resolution
//! - [`system`] — one-shot detection of the kernel's mount capabilities
//!
//! Policy (which paths to allow) is the caller's responsibility; this crate
//! only implements the mechanism.
//!
//! # Example
//!
//! ```no_run
//! use fsjail::mounts::{self, Propagation};
//! use fsjail::policy::{Access, AccessTrie};
//! use fsjail::lock::ScopedFileLock;
//! use fsjail::Result;
//!
//! fn setup(root: &str) -> Result<()> {
//!     let _guard = ScopedFileLock::acquire("/run/judge/setup.lock")?;
//!
//!     mounts::set_propagation("/", Propagation::Slave, true)?;
//!     mounts::tmpfs(root, 64 << 20, 0o755)?;
//!     mounts::bind_readonly("/usr", &format!("{root}/usr"))?;
//!
//!     let mut policy = AccessTrie::new();
//!     policy.set(&format!("{root}/usr"), Access::ReadOnly, false);
//!
//!     Ok(())
//! }
//!
//! fn teardown(root: &str) -> Result<()> {
//!     let _guard = ScopedFileLock::acquire("/run/judge/setup.lock")?;
//!     mounts::umount_all_under(root)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod lock;
pub mod mounts;
pub mod paths;
pub mod policy;
pub mod system;

// Re-export commonly used types
pub use error::{Error, LockError, MountError, Result};
pub use lock::ScopedFileLock;
pub use mounts::{MountEntry, Propagation};
pub use policy::{Access, AccessTrie};
pub use system::MountCapabilities;
