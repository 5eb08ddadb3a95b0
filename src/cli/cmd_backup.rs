use anyhow::{Context, Result};
use log::warn;
use std::path::PathBuf;

use crate::backup::{run_backup, BackupPlan, CommandBackup};
use crate::exec::Lvm;
use crate::interrupt::Interrupt;
use crate::lock::try_lock_session;
use crate::snapshot::{SizeSpec, SnapshotMode};

pub struct BackupArgs {
    pub volume: String,
    pub mount: PathBuf,
    pub size: String,
    pub snap: Option<String>,
    pub mode: String,
    pub backup_cmd: PathBuf,
    pub backup_args: Vec<String>,
    pub json: bool,
    pub configs: Vec<String>,
}

pub fn default_snapshot_name() -> String {
    format!("mysql_{}_snapshot", chrono::Local::now().format("%Y%m%d"))
}

pub fn exec(lvm: &Lvm, args: BackupArgs) -> Result<()> {
    let snapshot = args.snap.unwrap_or_else(default_snapshot_name);
    let plan = BackupPlan {
        origin: args.volume,
        snapshot,
        mode: args.mode.parse::<SnapshotMode>()?,
        size: args.size.parse::<SizeSpec>()?,
        mount_dir: args.mount,
        configs: args.configs,
    };

    // держим lock до конца сессии
    let _lock = match lvm.config().lock_dir.as_deref() {
        Some(dir) => Some(try_lock_session(dir, &plan.snapshot)?),
        None => None,
    };

    let interrupt = Interrupt::new();
    interrupt.install_signal_handlers()?;

    let mut procedure = CommandBackup::new(args.backup_cmd, args.backup_args);
    let report = run_backup(lvm, &plan, &mut procedure, &interrupt)
        .with_context(|| format!("backup of {} via snapshot {}", plan.origin, plan.snapshot))?;

    let metrics = crate::metrics::snapshot();
    if metrics.snapshots_outstanding() > 0 {
        warn!(
            "backup: {} snapshot(s) created by this run were not removed",
            metrics.snapshots_outstanding()
        );
    }

    if args.json {
        let v = serde_json::json!({
            "report": report,
            "metrics": metrics,
            "snapshots_outstanding": metrics.snapshots_outstanding(),
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
        return Ok(());
    }

    println!("backup: OK");
    println!("  snapshot     = {}", report.snapshot);
    println!("  mount_point  = {}", report.mount_point.display());
    println!("  configs      = {}", report.configs_done.join(", "));
    println!(
        "  snap_percent = {}",
        report
            .snap_percent
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "(inactive)".to_string())
    );
    Ok(())
}
