//! Volume catalog queries (`lvs --reportformat=json`).
//!
//! Pure reads. Records are fetched fresh on every call and filtered by name
//! on our side; nothing is cached here.

use serde::{Deserialize, Serialize};

use crate::error::{LvmError, Result};
use crate::exec::Lvm;

pub const LVS_FIELDS: &str =
    "vg_name,lv_name,lv_full_name,lv_size,lv_dm_path,lv_role,lv_host,origin,snap_percent";

/// One logical volume as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeRecord {
    pub vg_name: String,
    pub lv_name: String,
    /// `vg/lv`, the identity key.
    pub full_name: String,
    /// Bytes.
    pub size: u64,
    pub dm_path: String,
    /// Role tags in catalog order, e.g. `["public", "snapshot", "thicksnapshot"]`.
    pub roles: Vec<String>,
    pub host: Option<String>,
    /// Parent volume name for snapshots.
    pub origin: Option<String>,
    /// Snapshot fill percentage, only while the snapshot is active.
    pub snap_percent: Option<f64>,
}

impl VolumeRecord {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

// ---------- raw report ----------

#[derive(Deserialize)]
struct LvsReport {
    report: Vec<LvsSection>,
}

#[derive(Deserialize)]
struct LvsSection {
    #[serde(default)]
    lv: Vec<RawLv>,
}

#[derive(Deserialize)]
struct RawLv {
    vg_name: String,
    lv_name: String,
    lv_full_name: String,
    lv_size: String,
    #[serde(default)]
    lv_dm_path: String,
    #[serde(default)]
    lv_role: String,
    #[serde(default)]
    lv_host: String,
    #[serde(default)]
    origin: String,
    #[serde(default)]
    snap_percent: String,
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

impl RawLv {
    fn into_record(self, program: &str) -> Result<VolumeRecord> {
        let malformed = |reason: String| LvmError::Malformed {
            program: program.to_string(),
            reason,
        };

        // --nosuffix обычно убирает "B", но старые lvm2 его оставляют
        let size_str = self.lv_size.trim();
        let size_str = size_str.strip_suffix('B').unwrap_or(size_str);
        let size = size_str
            .parse::<u64>()
            .map_err(|_| malformed(format!("lv_size \"{}\" of {}", self.lv_size, self.lv_full_name)))?;

        let snap_percent = match non_empty(self.snap_percent) {
            None => None,
            Some(s) => Some(s.trim().parse::<f64>().map_err(|_| {
                malformed(format!("snap_percent \"{}\" of {}", s, self.lv_full_name))
            })?),
        };

        let roles = self
            .lv_role
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();

        Ok(VolumeRecord {
            vg_name: self.vg_name,
            lv_name: self.lv_name,
            full_name: self.lv_full_name,
            size,
            dm_path: self.lv_dm_path,
            roles,
            host: non_empty(self.lv_host),
            origin: non_empty(self.origin),
            snap_percent,
        })
    }
}

/// Parse the JSON report printed by `lvs --reportformat=json`.
pub fn parse_lvs_report(program: &str, json: &str) -> Result<Vec<VolumeRecord>> {
    let report: LvsReport = serde_json::from_str(json).map_err(|e| LvmError::Malformed {
        program: program.to_string(),
        reason: e.to_string(),
    })?;
    let section = report.report.into_iter().next().ok_or_else(|| LvmError::Malformed {
        program: program.to_string(),
        reason: "empty report".to_string(),
    })?;
    section
        .lv
        .into_iter()
        .map(|raw| raw.into_record(program))
        .collect()
}

fn lvs_args() -> Vec<String> {
    vec![
        "--reportformat=json".to_string(),
        "--units=b".to_string(),
        "--nosuffix".to_string(),
        format!("--options={}", LVS_FIELDS),
    ]
}

/// All volumes, catalog order.
pub fn list_lvs(lvm: &Lvm) -> Result<Vec<VolumeRecord>> {
    let program = &lvm.config().lvs;
    let out = lvm.check_output(program, &lvs_args())?;
    parse_lvs_report(&program.display().to_string(), &out)
}

/// Find a volume by its short name. Ok(None) when absent; catalog failures
/// are errors. With duplicate names across groups the first one wins.
pub fn find_lv(lvm: &Lvm, name: &str) -> Result<Option<VolumeRecord>> {
    Ok(list_lvs(lvm)?.into_iter().find(|lv| lv.lv_name == name))
}
