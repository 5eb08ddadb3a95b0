use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::LvsnapConfig;
use crate::exec::Lvm;

mod cmd_backup;
mod cmd_volume;

/// CLI для lvsnap: снапшоты LVM и бэкап из примонтированного снапшота
#[derive(Parser, Debug)]
#[command(
    name = "lvsnap",
    version,
    about = "LVM COW snapshot lifecycle and snapshot-based backups",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// List all logical volumes
    List {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show one logical volume with its live mount point
    Show {
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Create a COW snapshot of an existing volume
    ///
    /// Size: absent = all free extents, "20%" = share of free extents,
    /// anything else is passed as --size (e.g. 1073741824, 50G).
    SnapshotCreate {
        #[arg(long)]
        origin: String,
        #[arg(long)]
        name: String,
        /// r | rw
        #[arg(long, default_value = "r")]
        mode: String,
        #[arg(long)]
        size: Option<String>,
    },
    /// Remove a snapshot. Refused while mounted unless --umount,
    /// refused for non-snapshot volumes unless --any.
    SnapshotRemove {
        #[arg(long)]
        name: String,
        /// Unmount first if mounted
        #[arg(long, default_value_t = false)]
        umount: bool,
        /// Allow removing a volume that is not a snapshot (e.g. an origin)
        #[arg(long, default_value_t = false)]
        any: bool,
    },
    /// Mount a volume at an existing, unused directory
    Mount {
        #[arg(long)]
        name: String,
        #[arg(long)]
        dir: PathBuf,
    },
    /// Unmount a volume
    Umount {
        #[arg(long)]
        name: String,
    },
    /// Snapshot a volume, mount it and run a backup command per config
    ///
    /// Пример:
    ///   lvsnap backup --volume mysql --mount /mnt/mysql-snap \
    ///     --backup-cmd /usr/local/bin/mysqlbackup --backup-arg --datadir={mount} \
    ///     /etc/backup/daily.cnf /etc/backup/offsite.cnf
    Backup {
        /// Origin logical volume
        #[arg(long)]
        volume: String,
        /// Mount point for the snapshot (must exist)
        #[arg(long)]
        mount: PathBuf,
        #[arg(long, default_value = "50G")]
        size: String,
        /// Snapshot name (default mysql_<YYYYMMDD>_snapshot)
        #[arg(long)]
        snap: Option<String>,
        #[arg(long, default_value = "r")]
        mode: String,
        /// Program run once per config
        #[arg(long)]
        backup_cmd: PathBuf,
        /// Argument for the backup program; {mount} and {config} are substituted
        #[arg(long = "backup-arg", allow_hyphen_values = true)]
        backup_args: Vec<String>,
        /// JSON report
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Backup configurations, processed in order
        #[arg(required = true)]
        configs: Vec<String>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = LvsnapConfig::from_env();
    log::debug!("config: {}", cfg);
    let lvm = Lvm::new(cfg);

    match cli.cmd {
        Cmd::List { json } => cmd_volume::exec_list(&lvm, json),
        Cmd::Show { name, json } => cmd_volume::exec_show(&lvm, &name, json),
        Cmd::SnapshotCreate {
            origin,
            name,
            mode,
            size,
        } => cmd_volume::exec_snapshot_create(&lvm, &origin, &name, &mode, size.as_deref()),
        Cmd::SnapshotRemove { name, umount, any } => {
            cmd_volume::exec_snapshot_remove(&lvm, &name, umount, any)
        }
        Cmd::Mount { name, dir } => cmd_volume::exec_mount(&lvm, &name, dir),
        Cmd::Umount { name } => cmd_volume::exec_umount(&lvm, &name),
        Cmd::Backup {
            volume,
            mount,
            size,
            snap,
            mode,
            backup_cmd,
            backup_args,
            json,
            configs,
        } => cmd_backup::exec(
            &lvm,
            cmd_backup::BackupArgs {
                volume,
                mount,
                size,
                snap,
                mode,
                backup_cmd,
                backup_args,
                json,
                configs,
            },
        ),
    }
}
