//! Copy-on-write snapshot volumes (`lvcreate --snapshot`).

use log::info;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use crate::error::{LvmError, Result};
use crate::exec::Lvm;
use crate::lvs::find_lv;
use crate::metrics::record_snapshot_created;
use crate::volume::LogicalVolume;

/// Permission of the new snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotMode {
    #[default]
    ReadOnly,
    ReadWrite,
}

impl SnapshotMode {
    /// Value for `lvcreate --permission=`.
    pub fn as_permission(&self) -> &'static str {
        match self {
            SnapshotMode::ReadOnly => "r",
            SnapshotMode::ReadWrite => "rw",
        }
    }
}

impl FromStr for SnapshotMode {
    type Err = LvmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "ro" | "read-only" => Ok(SnapshotMode::ReadOnly),
            "rw" | "read-write" => Ok(SnapshotMode::ReadWrite),
            _ => Err(LvmError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for SnapshotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_permission())
    }
}

/// How much COW space to allocate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SizeSpec {
    /// All free extents of the volume group.
    #[default]
    AllFree,
    /// Percentage (1..=100) of the group's free extents.
    PercentFree(u32),
    /// Size string in lvm grammar: bytes (`1073741824`) or with a unit (`50G`).
    Absolute(String),
}

impl SizeSpec {
    /// `None` means all free space.
    pub fn parse(size: Option<&str>) -> Result<Self> {
        match size {
            None => Ok(SizeSpec::AllFree),
            Some(s) => s.parse(),
        }
    }

    /// Command-line option for lvcreate.
    pub fn to_option(&self) -> String {
        match self {
            SizeSpec::AllFree => "--extents=100%FREE".to_string(),
            SizeSpec::PercentFree(p) => format!("--extents={}%FREE", p),
            SizeSpec::Absolute(s) => format!("--size={}", s),
        }
    }
}

impl FromStr for SizeSpec {
    type Err = LvmError;

    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim();
        if t.is_empty() {
            return Err(LvmError::InvalidSize(s.to_string()));
        }
        if let Some(p) = t.strip_suffix('%') {
            return match p.trim().parse::<u32>() {
                Ok(n) if (1..=100).contains(&n) => Ok(SizeSpec::PercentFree(n)),
                _ => Err(LvmError::InvalidSize(s.to_string())),
            };
        }
        // число, опционально с единицей lvm (k/m/g/t/p/e, с B/iB)
        let digits_end = t
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(t.len());
        let (num, unit) = t.split_at(digits_end);
        if num.is_empty() || num.parse::<f64>().is_err() {
            return Err(LvmError::InvalidSize(s.to_string()));
        }
        let unit_ok = unit.is_empty()
            || matches!(
                unit.to_ascii_lowercase().as_str(),
                "b" | "s" | "k" | "m" | "g" | "t" | "p" | "e"
                    | "kb" | "mb" | "gb" | "tb" | "pb" | "eb"
                    | "kib" | "mib" | "gib" | "tib" | "pib" | "eib"
            );
        if !unit_ok {
            return Err(LvmError::InvalidSize(s.to_string()));
        }
        Ok(SizeSpec::Absolute(t.to_string()))
    }
}

/// Origin given either by name or as an already constructed handle.
pub enum OriginRef {
    ByName(String),
    ByHandle(LogicalVolume),
}

impl From<&str> for OriginRef {
    fn from(s: &str) -> Self {
        OriginRef::ByName(s.to_string())
    }
}

impl From<String> for OriginRef {
    fn from(s: String) -> Self {
        OriginRef::ByName(s)
    }
}

impl From<LogicalVolume> for OriginRef {
    fn from(lv: LogicalVolume) -> Self {
        OriginRef::ByHandle(lv)
    }
}

impl OriginRef {
    /// Resolve to a handle of an existing volume.
    fn resolve(self, lvm: &Lvm) -> Result<LogicalVolume> {
        match self {
            OriginRef::ByName(name) => match find_lv(lvm, &name)? {
                Some(rec) => LogicalVolume::new(lvm, &rec.lv_name),
                None => Err(LvmError::NonExistentOrigin(name)),
            },
            OriginRef::ByHandle(lv) => {
                if lv.exists()? {
                    Ok(lv)
                } else {
                    Err(LvmError::NonExistentOrigin(lv.name().to_string()))
                }
            }
        }
    }
}

/// A snapshot volume plus the origin it was (or will be) taken from.
/// Dropping a `CowSnapshot` never touches the origin volume.
pub struct CowSnapshot {
    volume: LogicalVolume,
    origin: LogicalVolume,
    mode: SnapshotMode,
    size: SizeSpec,
}

impl CowSnapshot {
    /// Handle for snapshot `name` of `origin`. Fails with
    /// `NonExistentOrigin` before anything else when the origin is absent.
    pub fn new(lvm: &Lvm, name: &str, origin: impl Into<OriginRef>) -> Result<Self> {
        let origin = origin.into().resolve(lvm)?;
        let volume = LogicalVolume::new(lvm, name)?;
        Ok(Self {
            volume,
            origin,
            mode: SnapshotMode::default(),
            size: SizeSpec::default(),
        })
    }

    /// Construct and `create()` in one step.
    pub fn create_new(
        lvm: &Lvm,
        name: &str,
        origin: impl Into<OriginRef>,
        mode: SnapshotMode,
        size: SizeSpec,
    ) -> Result<Self> {
        let mut snap = Self::new(lvm, name, origin)?;
        snap.create(mode, size)?;
        Ok(snap)
    }

    pub fn origin(&self) -> &LogicalVolume {
        &self.origin
    }

    /// Mode and size used by the last `create()`.
    pub fn mode(&self) -> SnapshotMode {
        self.mode
    }

    pub fn size_spec(&self) -> &SizeSpec {
        &self.size
    }

    /// `lvcreate --snapshot` against the origin's full name.
    pub fn create(&mut self, mode: SnapshotMode, size: SizeSpec) -> Result<()> {
        let origin_full = self.origin.full_name()?;
        let args = vec![
            "--snapshot".to_string(),
            format!("--name={}", self.volume.name()),
            format!("--permission={}", mode.as_permission()),
            size.to_option(),
            origin_full.clone(),
        ];
        info!(
            "lvcreate: snapshot {} of {} (mode={}, {})",
            self.volume.name(),
            origin_full,
            mode,
            args[3]
        );
        let lvm = self.volume.lvm().clone();
        lvm.check_call(&lvm.config().lvcreate, &args)?;
        record_snapshot_created();

        self.mode = mode;
        self.size = size;
        // следующий доступ к атрибутам перечитает каталог
        self.volume.invalidate();
        Ok(())
    }

    /// How full the COW area is (0..=100); None while the snapshot is
    /// inactive. At 100% lvm considers the snapshot invalid.
    pub fn percent(&self) -> Result<Option<f64>> {
        self.volume.record().map(|r| r.snap_percent)
    }
}

/// Remove snapshot `name`, unmounting it first when `umount` is set.
/// Volumes without the `snapshot` role are refused unless `allow_any`.
/// Returns the full name of the removed volume.
pub fn remove_snapshot(lvm: &Lvm, name: &str, umount: bool, allow_any: bool) -> Result<String> {
    let lv = LogicalVolume::new(lvm, name)?;
    let rec = lv.record()?;
    if !allow_any && !rec.has_role("snapshot") {
        return Err(LvmError::NotSnapshot(rec.full_name));
    }
    if umount && lv.mounted()? {
        lv.umount()?;
    }
    lv.remove()?;
    Ok(rec.full_name)
}

impl Deref for CowSnapshot {
    type Target = LogicalVolume;

    fn deref(&self) -> &LogicalVolume {
        &self.volume
    }
}

impl DerefMut for CowSnapshot {
    fn deref_mut(&mut self) -> &mut LogicalVolume {
        &mut self.volume
    }
}

impl fmt::Debug for CowSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CowSnapshot")
            .field("volume", &self.volume)
            .field("origin", &self.origin.name())
            .field("mode", &self.mode)
            .field("size", &self.size)
            .finish()
    }
}
