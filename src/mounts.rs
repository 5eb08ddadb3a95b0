//! Mount table service: live lookups via `findmnt`, plus mount/umount.
//!
//! Both lookup directions return a three-way outcome:
//! `Ok(Found)`, `Ok(NotFound)`, or `Err(..)` when the lookup itself failed.
//! `findmnt` exits with status 1 and prints nothing when there is no match;
//! only that case is treated as NotFound.

use log::info;
use std::path::Path;

use crate::error::Result;
use crate::exec::{tool_error, Lvm};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountLookup {
    Found(String),
    NotFound,
}

impl MountLookup {
    pub fn is_found(&self) -> bool {
        matches!(self, MountLookup::Found(_))
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            MountLookup::Found(s) => Some(s),
            MountLookup::NotFound => None,
        }
    }
}

/// First non-empty line after the column header.
pub fn parse_findmnt_output(stdout: &str) -> MountLookup {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| MountLookup::Found(l.to_string()))
        .unwrap_or(MountLookup::NotFound)
}

fn findmnt(lvm: &Lvm, args: Vec<String>) -> Result<MountLookup> {
    let program = &lvm.config().findmnt;
    let out = lvm.run(program, &args)?;
    if out.success() {
        return Ok(parse_findmnt_output(&out.stdout));
    }
    if out.code == Some(1) && out.stdout.trim().is_empty() {
        return Ok(MountLookup::NotFound);
    }
    Err(tool_error(program, &args, &out))
}

/// Where is `source` (a device path) mounted?
pub fn find_mount_target(lvm: &Lvm, source: &str) -> Result<MountLookup> {
    findmnt(
        lvm,
        vec!["--output=target".to_string(), format!("--source={}", source)],
    )
}

/// What is mounted at `target`? Exact mount point match only: `--target`
/// would report the filesystem containing any path.
pub fn find_mount_source(lvm: &Lvm, target: &Path) -> Result<MountLookup> {
    findmnt(
        lvm,
        vec![
            "--output=source".to_string(),
            format!("--mountpoint={}", target.display()),
        ],
    )
}

pub fn mount(lvm: &Lvm, source: &str, target: &Path) -> Result<()> {
    info!("mount: {} -> {}", source, target.display());
    lvm.check_call(
        &lvm.config().mount,
        &[
            format!("--source={}", source),
            format!("--target={}", target.display()),
        ],
    )
}

/// Unmount by source device; umount itself fails when it is not mounted.
pub fn umount(lvm: &Lvm, source: &str) -> Result<()> {
    info!("umount: {}", source);
    lvm.check_call(&lvm.config().umount, &[source.to_string()])
}
