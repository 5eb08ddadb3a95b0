mod common;

use anyhow::{anyhow, Result};

use common::{mount_dir, FakeLvm};
use lvsnap::{metrics, with_snapshot, SizeSpec, SnapshotMode};

// единственный тест в этом бинаре — глобальные счётчики никто не трогает параллельно
#[test]
fn session_counters() -> Result<()> {
    metrics::reset();
    let fake = FakeLvm::new("vg");
    fake.add_lv("base", 10 << 30);
    let lvm = fake.lvm();
    let dir = mount_dir("metrics");

    with_snapshot(&lvm, "base", "ok", SnapshotMode::ReadOnly, SizeSpec::AllFree, |snap| {
        snap.set_mount_directory(&dir)?;
        snap.mount()?;
        Ok(())
    })?;

    let _ = with_snapshot(&lvm, "base", "bad", SnapshotMode::ReadOnly, SizeSpec::AllFree, |_snap| {
        fake.fail_always("lvremove", 5, "device busy");
        Err::<(), _>(anyhow!("work failed"))
    });
    fake.heal("lvremove");

    let m = metrics::snapshot();
    assert_eq!(m.sessions_started, 2);
    assert_eq!(m.snapshots_created, 2);
    assert_eq!(m.volumes_removed, 1);
    assert_eq!(m.mounts, 1);
    assert_eq!(m.umounts, 1);
    assert_eq!(m.session_cleanup_failures, 1);
    assert_eq!(m.snapshots_outstanding(), 1);
    Ok(())
}
