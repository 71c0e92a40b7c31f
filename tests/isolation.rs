//! End-to-end mount isolation flow.
//!
//! These tests perform real mount syscalls and therefore need CAP_SYS_ADMIN;
//! they skip themselves when not running as root so the rest of the suite
//! stays runnable in an unprivileged checkout.

use nix::unistd::Uid;
use tempfile::TempDir;

use fsjail::mounts::{self, Propagation};
use fsjail::policy::{Access, AccessTrie};

fn require_root(test: &str) -> bool {
    if Uid::effective().is_root() {
        true
    } else {
        eprintln!("skipping {test}: requires root");
        false
    }
}

/// Full setup/teardown cycle: tmpfs, bind mount into it, access policy
/// registration, then reverse-order unmount verified against the live table.
#[test]
fn test_tmpfs_bind_policy_teardown_cycle() {
    if !require_root("test_tmpfs_bind_policy_teardown_cycle") {
        return;
    }

    let dir = TempDir::new().expect("tempdir");
    let root = dir.path().to_str().expect("utf8").to_string();

    // Keep our mount activity out of the host namespace's peers
    mounts::set_propagation("/", Propagation::Slave, true).expect("propagation");

    mounts::tmpfs(&root, 1 << 20, 0o755).expect("tmpfs mount");
    let mounted = mounts::get_mounts().expect("mount table");
    assert_eq!(
        mounted.get(&root).map(|e| e.fstype.as_str()),
        Some("tmpfs"),
        "tmpfs should appear in the table at {root}"
    );

    // Double-mount guard
    assert!(matches!(
        mounts::tmpfs(&root, 1 << 20, 0o755),
        Err(fsjail::MountError::AlreadyMounted { .. })
    ));

    // Bind a host file into the tmpfs
    let inner = format!("{root}/passwd");
    std::fs::write(&inner, "").expect("create bind target");
    mounts::bind_readonly("/etc/passwd", &inner).expect("bind mount");
    assert!(
        mounts::get_mounts().expect("mount table").contains_key(&inner),
        "bind mount should appear at {inner}"
    );
    assert!(
        !std::fs::read_to_string(&inner)
            .expect("read through bind")
            .is_empty(),
        "bind target should show host file content"
    );

    // Register and query the access decision
    let mut policy = AccessTrie::new();
    policy.set(&inner, Access::ReadOnly, false);
    assert_eq!(policy.get(&inner), Some(Access::ReadOnly));

    // Teardown: inner bind before outer tmpfs
    mounts::umount_all_under(&root).expect("teardown");
    let after = mounts::get_mounts().expect("mount table");
    assert!(!after.contains_key(&inner), "bind mount still present");
    assert!(!after.contains_key(&root), "tmpfs still present");
}

/// Bind mounts are nosuid and do not replicate submounts of the source.
///
/// A submount under the bind source must not become visible at the
/// destination: it would arrive with its original flags, bypassing the
/// unconditional nosuid applied to the bind itself.
#[test]
fn test_bind_is_nosuid_and_non_recursive() {
    if !require_root("test_bind_is_nosuid_and_non_recursive") {
        return;
    }

    use nix::mount::{mount, MsFlags};

    let src_dir = TempDir::new().expect("tempdir");
    let dest_dir = TempDir::new().expect("tempdir");
    let src = src_dir.path().to_str().expect("utf8").to_string();
    let dest = dest_dir.path().to_str().expect("utf8").to_string();

    mounts::set_propagation("/", Propagation::Slave, true).expect("propagation");

    // A suid-capable mount below the bind source (tmpfs without nosuid)
    let sub = format!("{src}/sub");
    std::fs::create_dir(&sub).expect("mkdir sub");
    mount(
        Some("tmpfs"),
        sub.as_str(),
        Some("tmpfs"),
        MsFlags::empty(),
        Some("size=65536"),
    )
    .expect("tmpfs at sub");

    mounts::bind(&src, &dest).expect("bind mount");

    let table = mounts::get_mounts().expect("mount table");
    let bind_opts = &table.get(&dest).expect("bind entry").opts;
    assert!(
        bind_opts.contains("nosuid"),
        "bind mount lacks nosuid: opts={bind_opts}"
    );
    assert!(
        !table.contains_key(&format!("{dest}/sub")),
        "submount was replicated into the bind destination"
    );

    mounts::umount(&dest, true).expect("umount dest");
    mounts::umount(&sub, true).expect("umount sub");
}

/// get_mount_point resolves to the most specific mount governing a path.
#[test]
fn test_mount_point_nesting() {
    if !require_root("test_mount_point_nesting") {
        return;
    }

    let dir = TempDir::new().expect("tempdir");
    let root = dir.path().to_str().expect("utf8").to_string();

    mounts::set_propagation("/", Propagation::Slave, true).expect("propagation");
    mounts::tmpfs(&root, 1 << 20, 0o755).expect("tmpfs mount");

    let file = format!("{root}/some/file");
    let governing = mounts::get_mount_point(&file)
        .expect("mount table")
        .expect("something governs the path");
    assert_eq!(governing, root);

    mounts::umount(&root, true).expect("umount");
}

/// Remount tightens an existing mount to read-only.
#[test]
fn test_remount_readonly_tightens() {
    if !require_root("test_remount_readonly_tightens") {
        return;
    }

    use nix::mount::MsFlags;

    let dir = TempDir::new().expect("tempdir");
    let root = dir.path().to_str().expect("utf8").to_string();

    mounts::set_propagation("/", Propagation::Slave, true).expect("propagation");
    mounts::tmpfs(&root, 1 << 20, 0o777).expect("tmpfs mount");

    let probe = format!("{root}/probe");
    std::fs::write(&probe, "x").expect("write before remount");

    mounts::remount(&root, MsFlags::MS_RDONLY | MsFlags::MS_NOSUID).expect("remount");
    assert!(
        std::fs::write(&probe, "y").is_err(),
        "write should fail after read-only remount"
    );

    mounts::umount(&root, true).expect("umount");
}
