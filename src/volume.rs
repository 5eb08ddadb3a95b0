//! Logical volume handle.
//!
//! States (always derived live, never stored):
//! - Unbound — name only, the catalog does not (yet) know it;
//! - Bound   — catalog record present;
//! - Mounted — Bound and the mount table has an entry for its device.
//!
//! The catalog record is cached lazily. Attribute accessors do one lookup
//! when nothing is cached and fail with `LvmError::NotFound` if the volume
//! is still absent. Call `refresh()` when external state may have changed.
//! Mount state is never cached.

use log::info;
use std::cell::RefCell;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{LvmError, Result};
use crate::exec::Lvm;
use crate::lvs::{find_lv, VolumeRecord};
use crate::metrics::{record_mount, record_umount, record_volume_removed};
use crate::mounts::{self, MountLookup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeState {
    Unbound,
    Bound,
    Mounted,
}

pub struct LogicalVolume {
    lvm: Lvm,
    name: String,
    record: RefCell<Option<VolumeRecord>>,
    // desired mount point; the actual one always comes from findmnt
    mount_dir: Option<PathBuf>,
}

/// Lexical normalization: drops `.` and trailing separators, folds `..`.
pub fn normalize_path(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in p.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

impl LogicalVolume {
    /// Bind a handle to `name` and look it up. An existing volume that is
    /// already mounted pre-populates the mount directory.
    pub fn new(lvm: &Lvm, name: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(LvmError::InvalidName(name.to_string()));
        }
        let record = find_lv(lvm, name)?;
        let mount_dir = match &record {
            Some(r) => mounts::find_mount_target(lvm, &r.dm_path)?
                .into_option()
                .map(PathBuf::from),
            None => None,
        };
        Ok(Self {
            lvm: lvm.clone(),
            name: name.to_string(),
            record: RefCell::new(record),
            mount_dir,
        })
    }

    pub(crate) fn lvm(&self) -> &Lvm {
        &self.lvm
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Re-read the catalog record.
    pub fn refresh(&self) -> Result<()> {
        *self.record.borrow_mut() = find_lv(&self.lvm, &self.name)?;
        Ok(())
    }

    /// Drop the cached record; the next accessor looks it up again.
    pub fn invalidate(&self) {
        self.record.borrow_mut().take();
    }

    fn lookup_if_missing(&self) -> Result<()> {
        if self.record.borrow().is_none() {
            self.refresh()?;
        }
        Ok(())
    }

    pub fn exists(&self) -> Result<bool> {
        self.lookup_if_missing()?;
        Ok(self.record.borrow().is_some())
    }

    fn with_record<T>(&self, f: impl FnOnce(&VolumeRecord) -> T) -> Result<T> {
        self.lookup_if_missing()?;
        match self.record.borrow().as_ref() {
            Some(r) => Ok(f(r)),
            None => Err(LvmError::NotFound(self.name.clone())),
        }
    }

    /// Cached record (after one lazy lookup).
    pub fn record(&self) -> Result<VolumeRecord> {
        self.with_record(|r| r.clone())
    }

    pub fn vg(&self) -> Result<String> {
        self.with_record(|r| r.vg_name.clone())
    }

    /// `vg/lv`
    pub fn full_name(&self) -> Result<String> {
        self.with_record(|r| r.full_name.clone())
    }

    /// Size in bytes.
    pub fn size(&self) -> Result<u64> {
        self.with_record(|r| r.size)
    }

    /// Device-mapper path, e.g. /dev/mapper/vg-lv.
    pub fn dm_path(&self) -> Result<String> {
        self.with_record(|r| r.dm_path.clone())
    }

    pub fn role(&self) -> Result<Vec<String>> {
        self.with_record(|r| r.roles.clone())
    }

    /// Creation host, if the catalog knows it.
    pub fn host(&self) -> Result<Option<String>> {
        self.with_record(|r| r.host.clone())
    }

    /// Parent volume name when this is a snapshot.
    pub fn origin_name(&self) -> Result<Option<String>> {
        self.with_record(|r| r.origin.clone())
    }

    /// Live mount point of this volume's device.
    pub fn mounted_directory(&self) -> Result<Option<PathBuf>> {
        let dev = self.dm_path()?;
        Ok(mounts::find_mount_target(&self.lvm, &dev)?
            .into_option()
            .map(PathBuf::from))
    }

    pub fn mounted(&self) -> Result<bool> {
        Ok(self.mounted_directory()?.is_some())
    }

    pub fn state(&self) -> Result<VolumeState> {
        if !self.exists()? {
            return Ok(VolumeState::Unbound);
        }
        if self.mounted()? {
            Ok(VolumeState::Mounted)
        } else {
            Ok(VolumeState::Bound)
        }
    }

    /// Desired mount directory (not necessarily mounted yet).
    pub fn mount_directory(&self) -> Option<&Path> {
        self.mount_dir.as_deref()
    }

    /// Set the directory `mount()` will use. Only while this volume is not
    /// mounted; the directory must exist and must not be a mount point
    /// already. Stored normalized.
    pub fn set_mount_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        if let Some(dev) = self.existing_dm_path()? {
            if mounts::find_mount_target(&self.lvm, &dev)?.is_found() {
                return Err(LvmError::AlreadyMounted(self.name.clone()));
            }
        }
        let dir = normalize_path(dir.as_ref());
        if !dir.is_dir() {
            return Err(LvmError::DirectoryMissing(dir));
        }
        if let MountLookup::Found(source_dev) = mounts::find_mount_source(&self.lvm, &dir)? {
            return Err(LvmError::DirectoryBound { dir, source_dev });
        }
        self.mount_dir = Some(dir);
        Ok(())
    }

    /// Mount the device at the desired mount directory.
    pub fn mount(&self) -> Result<()> {
        let dev = match self.existing_dm_path()? {
            Some(d) => d,
            None => {
                return Err(LvmError::NotCreated {
                    op: "mount",
                    name: self.name.clone(),
                })
            }
        };
        let dir = self
            .mount_dir
            .as_deref()
            .ok_or_else(|| LvmError::NoMountDirectory(self.name.clone()))?;
        if !dir.is_dir() {
            return Err(LvmError::DirectoryMissing(dir.to_path_buf()));
        }
        if mounts::find_mount_target(&self.lvm, &dev)?.is_found() {
            return Err(LvmError::AlreadyMounted(self.name.clone()));
        }
        mounts::mount(&self.lvm, &dev, dir)?;
        record_mount();
        Ok(())
    }

    pub fn umount(&self) -> Result<()> {
        let dev = match self.existing_dm_path()? {
            Some(d) => d,
            None => {
                return Err(LvmError::NotCreated {
                    op: "umount",
                    name: self.name.clone(),
                })
            }
        };
        if !mounts::find_mount_target(&self.lvm, &dev)?.is_found() {
            return Err(LvmError::NotMounted(self.name.clone()));
        }
        mounts::umount(&self.lvm, &dev)?;
        record_umount();
        Ok(())
    }

    /// `lvremove --force`. Refused while mounted (checked live).
    pub fn remove(&self) -> Result<()> {
        let (full_name, dev) = self.with_record(|r| (r.full_name.clone(), r.dm_path.clone()))?;
        if mounts::find_mount_target(&self.lvm, &dev)?.is_found() {
            return Err(LvmError::Mounted(self.name.clone()));
        }
        info!("lvremove: {}", full_name);
        self.lvm.check_call(
            &self.lvm.config().lvremove,
            &["--force".to_string(), full_name],
        )?;
        self.invalidate();
        record_volume_removed();
        Ok(())
    }

    fn existing_dm_path(&self) -> Result<Option<String>> {
        self.lookup_if_missing()?;
        Ok(self.record.borrow().as_ref().map(|r| r.dm_path.clone()))
    }

    /// Fresh catalog record as JSON (`null` when the volume is absent).
    pub fn to_json(&self) -> Result<String> {
        self.refresh()?;
        serde_json::to_string(&*self.record.borrow()).map_err(|e| LvmError::Malformed {
            program: "lvs".to_string(),
            reason: format!("record of {} not serializable: {}", self.name, e),
        })
    }
}

impl fmt::Debug for LogicalVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalVolume")
            .field("name", &self.name)
            .field("record", &self.record.borrow())
            .field("mount_dir", &self.mount_dir)
            .finish()
    }
}

/// JSON of the fresh catalog record, `null` when absent. A failed lookup is
/// rendered as `{"name":..,"error":..}`, use `to_json()` to get the error.
impl fmt::Display for LogicalVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Ok(s) => f.write_str(&s),
            Err(e) => {
                let v = serde_json::json!({ "name": self.name, "error": e.to_string() });
                write!(f, "{}", v)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_trailing_separators() {
        assert_eq!(normalize_path(Path::new("/mnt/x/")), PathBuf::from("/mnt/x"));
        assert_eq!(normalize_path(Path::new("/mnt/x")), PathBuf::from("/mnt/x"));
        assert_eq!(normalize_path(Path::new("/mnt//x/./")), PathBuf::from("/mnt/x"));
        assert_eq!(normalize_path(Path::new("/mnt/a/../x")), PathBuf::from("/mnt/x"));
        assert_eq!(normalize_path(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize_path(Path::new("../../x")), PathBuf::from("../../x"));
        assert_eq!(normalize_path(Path::new("")), PathBuf::from("."));
    }
}
