//! Backup run against a mounted snapshot.
//!
//! Flow (one session):
//! 1. create the COW snapshot of `plan.origin`;
//! 2. set the mount directory and mount it;
//! 3. run the backup procedure once per config, in order, stopping at the
//!    first failure or at an interrupt request;
//! 4. log the COW fill level (100% means lvm dropped the snapshot and the
//!    copy is not trustworthy);
//! 5. unmount + remove, whatever happened above.
//!
//! What a backup actually copies is up to the `BackupProcedure`.

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::exec::Lvm;
use crate::interrupt::Interrupt;
use crate::session::{with_snapshot, SessionError};
use crate::snapshot::{SizeSpec, SnapshotMode};

/// Consumer of a mounted snapshot.
pub trait BackupProcedure {
    fn run(&mut self, mount_point: &Path, config: &str) -> Result<()>;
}

/// Runs an external program per config. `{mount}` and `{config}` in `args`
/// are substituted; without a `{config}` placeholder the config is appended.
/// The mount point is also exported as `LVSNAP_MOUNT_POINT`.
#[derive(Debug, Clone)]
pub struct CommandBackup {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandBackup {
    pub fn new<P: Into<PathBuf>>(program: P, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Final argument list for one run.
    pub fn render_args(&self, mount_point: &Path, config: &str) -> Vec<String> {
        let mount = mount_point.display().to_string();
        let mut has_config = false;
        let mut out: Vec<String> = self
            .args
            .iter()
            .map(|a| {
                if a.contains("{config}") {
                    has_config = true;
                }
                a.replace("{mount}", &mount).replace("{config}", config)
            })
            .collect();
        if !has_config {
            out.push(config.to_string());
        }
        out
    }
}

impl BackupProcedure for CommandBackup {
    fn run(&mut self, mount_point: &Path, config: &str) -> Result<()> {
        let args = self.render_args(mount_point, config);
        info!("backup: {} {}", self.program.display(), args.join(" "));
        let status = Command::new(&self.program)
            .args(&args)
            .env("LVSNAP_MOUNT_POINT", mount_point)
            .stdin(Stdio::null())
            .status()
            .with_context(|| format!("spawn {}", self.program.display()))?;
        if !status.success() {
            return Err(anyhow!(
                "backup command {} failed for config {}: {}",
                self.program.display(),
                config,
                status
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BackupPlan {
    pub origin: String,
    pub snapshot: String,
    pub mode: SnapshotMode,
    pub size: SizeSpec,
    pub mount_dir: PathBuf,
    pub configs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub snapshot: String,
    pub mount_point: PathBuf,
    pub configs_done: Vec<String>,
    /// COW fill level right before teardown (None if inactive).
    pub snap_percent: Option<f64>,
}

/// Execute `plan` with `procedure`. The snapshot is gone when this returns,
/// on success and on failure alike. `interrupt` is checked before every
/// config; once set, the session fails with `Interrupted` and tears down.
pub fn run_backup(
    lvm: &Lvm,
    plan: &BackupPlan,
    procedure: &mut dyn BackupProcedure,
    interrupt: &Interrupt,
) -> std::result::Result<BackupReport, SessionError> {
    info!(
        "backup: start, origin={}, snapshot={}, mount={}, configs={}",
        plan.origin,
        plan.snapshot,
        plan.mount_dir.display(),
        plan.configs.len()
    );

    let report = with_snapshot(
        lvm,
        plan.origin.as_str(),
        &plan.snapshot,
        plan.mode,
        plan.size.clone(),
        |snap| {
            snap.set_mount_directory(&plan.mount_dir)?;
            snap.mount()?;
            let mount_point = snap
                .mount_directory()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| plan.mount_dir.clone());

            let mut done = Vec::with_capacity(plan.configs.len());
            for cfg in &plan.configs {
                interrupt.check()?;
                info!("backup: config {}", cfg);
                procedure
                    .run(&mount_point, cfg)
                    .with_context(|| format!("backup with config {}", cfg))?;
                done.push(cfg.clone());
            }
            interrupt.check()?;

            snap.refresh()?;
            let snap_percent = snap.percent()?;
            if let Some(p) = snap_percent {
                if p >= 100.0 {
                    warn!(
                        "backup: snapshot {} is full ({:.2}%), lvm has invalidated it",
                        snap.name(),
                        p
                    );
                }
            }

            Ok(BackupReport {
                snapshot: snap.full_name()?,
                mount_point,
                configs_done: done,
                snap_percent,
            })
        },
    )?;

    info!(
        "backup: done snapshot={}, configs={}, snap_percent={}",
        report.snapshot,
        report.configs_done.len(),
        report
            .snap_percent
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "null".to_string())
    );
    Ok(report)
}
