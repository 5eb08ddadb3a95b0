use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::exec::Lvm;
use crate::lvs::{list_lvs, VolumeRecord};
use crate::snapshot::{remove_snapshot, CowSnapshot, SizeSpec, SnapshotMode};
use crate::volume::LogicalVolume;

pub fn exec_list(lvm: &Lvm, json: bool) -> Result<()> {
    let lvs = list_lvs(lvm).context("query volume catalog")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&lvs)?);
        return Ok(());
    }
    if lvs.is_empty() {
        println!("(no logical volumes)");
        return Ok(());
    }
    for lv in &lvs {
        println!(
            "{:30} {:>16} B  {:28} {}",
            lv.full_name,
            lv.size,
            lv.roles.join(","),
            lv.snap_percent
                .map(|p| format!("{:.2}%", p))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn print_record(rec: &VolumeRecord, mounted_at: Option<&PathBuf>) {
    println!("Logical volume {}", rec.full_name);
    println!("  vg          = {}", rec.vg_name);
    println!("  name        = {}", rec.lv_name);
    println!("  size        = {} B", rec.size);
    println!("  dm_path     = {}", rec.dm_path);
    println!("  role        = {}", rec.roles.join(","));
    println!("  host        = {}", rec.host.as_deref().unwrap_or("(unknown)"));
    if let Some(o) = rec.origin.as_deref() {
        println!("  origin      = {}", o);
    }
    if let Some(p) = rec.snap_percent {
        println!("  snap_percent= {:.2}", p);
    }
    println!(
        "  mounted_at  = {}",
        mounted_at
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not mounted)".to_string())
    );
}

pub fn exec_show(lvm: &Lvm, name: &str, json: bool) -> Result<()> {
    let lv = LogicalVolume::new(lvm, name)?;
    let rec = lv.record()?;
    let mounted_at = lv.mounted_directory()?;
    if json {
        let v = serde_json::json!({
            "volume": rec,
            "mounted_at": mounted_at.as_ref().map(|p| p.display().to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
        return Ok(());
    }
    print_record(&rec, mounted_at.as_ref());
    Ok(())
}

pub fn exec_snapshot_create(
    lvm: &Lvm,
    origin: &str,
    name: &str,
    mode: &str,
    size: Option<&str>,
) -> Result<()> {
    let mode: SnapshotMode = mode.parse()?;
    let size = SizeSpec::parse(size)?;
    let snap = CowSnapshot::create_new(lvm, name, origin, mode, size)
        .with_context(|| format!("create snapshot {} of {}", name, origin))?;
    println!(
        "snapshot: {} (origin={}, mode={})",
        snap.full_name()?,
        snap.origin().full_name()?,
        snap.mode()
    );
    Ok(())
}

pub fn exec_snapshot_remove(lvm: &Lvm, name: &str, umount: bool, any: bool) -> Result<()> {
    let full = remove_snapshot(lvm, name, umount, any).with_context(|| {
        if any {
            format!("remove {}", name)
        } else {
            format!("remove snapshot {} (use --any for other volumes)", name)
        }
    })?;
    println!("removed: {}", full);
    Ok(())
}

pub fn exec_mount(lvm: &Lvm, name: &str, dir: PathBuf) -> Result<()> {
    let mut lv = LogicalVolume::new(lvm, name)?;
    lv.set_mount_directory(&dir)?;
    lv.mount()?;
    println!(
        "mounted: {} -> {}",
        lv.dm_path()?,
        lv.mount_directory().unwrap_or(dir.as_path()).display()
    );
    Ok(())
}

pub fn exec_umount(lvm: &Lvm, name: &str) -> Result<()> {
    let lv = LogicalVolume::new(lvm, name)?;
    let dir = lv.mounted_directory()?;
    lv.umount()?;
    println!(
        "unmounted: {}{}",
        lv.dm_path()?,
        dir.map(|d| format!(" (was {})", d.display()))
            .unwrap_or_default()
    );
    Ok(())
}
