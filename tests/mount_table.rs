mod common;

use anyhow::Result;
use std::path::Path;

use common::{mount_dir, FakeLvm};
use lvsnap::mounts::{mount, umount};
use lvsnap::{find_mount_source, find_mount_target, ErrorKind, MountLookup};

#[test]
fn lookups_in_both_directions() -> Result<()> {
    let fake = FakeLvm::new("vg");
    fake.add_mount("/dev/mapper/vg-data", Path::new("/srv/data"));
    let lvm = fake.lvm();

    assert_eq!(
        find_mount_target(&lvm, "/dev/mapper/vg-data")?,
        MountLookup::Found("/srv/data".to_string())
    );
    assert_eq!(
        find_mount_source(&lvm, Path::new("/srv/data"))?,
        MountLookup::Found("/dev/mapper/vg-data".to_string())
    );
    assert_eq!(find_mount_target(&lvm, "/dev/mapper/vg-other")?, MountLookup::NotFound);
    assert_eq!(find_mount_source(&lvm, Path::new("/srv"))?, MountLookup::NotFound);

    // source lookup asks for an exact mount point
    let calls = fake.calls_to("findmnt");
    assert!(calls.iter().any(|c| c.contains(&"--mountpoint=/srv".to_string())));
    Ok(())
}

#[test]
fn lookup_failure_is_an_error_in_both_directions() {
    let fake = FakeLvm::new("vg");
    let lvm = fake.lvm();

    fake.fail_next("findmnt", 2, "findmnt: cannot read /proc/self/mountinfo");
    let err = find_mount_target(&lvm, "/dev/mapper/vg-data").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalTool);

    fake.fail_next("findmnt", 2, "findmnt: cannot read /proc/self/mountinfo");
    let err = find_mount_source(&lvm, Path::new("/srv/data")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalTool);
}

#[test]
fn mount_then_umount() -> Result<()> {
    let fake = FakeLvm::new("vg");
    fake.add_lv("data", 1 << 30);
    let lvm = fake.lvm();
    let dir = mount_dir("mt");
    let dev = fake.dm_path("data");

    mount(&lvm, &dev, &dir)?;
    assert!(fake.is_mounted(&dev));
    assert_eq!(
        fake.calls_to("mount"),
        vec![vec![format!("--source={dev}"), format!("--target={}", dir.display())]]
    );

    umount(&lvm, &dev)?;
    assert!(!fake.is_mounted(&dev));
    assert_eq!(fake.calls_to("umount"), vec![vec![dev.clone()]]);
    Ok(())
}

#[test]
fn umount_of_unmounted_device_fails() {
    let fake = FakeLvm::new("vg");
    fake.add_lv("data", 1 << 30);
    let err = umount(&fake.lvm(), &fake.dm_path("data")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalTool);
}

#[test]
fn mount_of_unknown_device_fails() {
    let fake = FakeLvm::new("vg");
    let dir = mount_dir("mt-bad");
    let err = mount(&fake.lvm(), "/dev/mapper/vg-ghost", &dir).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalTool);
    assert!(err.to_string().contains("does not exist"), "{err}");
}
