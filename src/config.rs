//! Centralized configuration for lvsnap.
//!
//! Goals:
//! - Single place for the tool paths instead of compiled-in constants.
//! - LvsnapConfig::from_env() lets packagers and tests point at other binaries.
//! - Fluent builder (with_*) for programmatic overrides.
//!
//! Env:
//! - LVSNAP_CMD_LVS / LVSNAP_CMD_LVCREATE / LVSNAP_CMD_LVREMOVE
//! - LVSNAP_CMD_MOUNT / LVSNAP_CMD_UMOUNT / LVSNAP_CMD_FINDMNT
//! - LVSNAP_LOCK_DIR — directory for per-snapshot session locks (unset = no lock)

use std::path::PathBuf;

/// Process-wide configuration, fixed at startup.
#[derive(Clone, Debug)]
pub struct LvsnapConfig {
    /// Volume catalog query. Env: LVSNAP_CMD_LVS (default /usr/sbin/lvs)
    pub lvs: PathBuf,
    /// Snapshot create. Env: LVSNAP_CMD_LVCREATE (default /sbin/lvcreate)
    pub lvcreate: PathBuf,
    /// Volume remove. Env: LVSNAP_CMD_LVREMOVE (default /sbin/lvremove)
    pub lvremove: PathBuf,
    pub mount: PathBuf,
    pub umount: PathBuf,
    /// Mount table query. Env: LVSNAP_CMD_FINDMNT (default /usr/bin/findmnt)
    pub findmnt: PathBuf,

    /// Optional directory for `<snapshot>.lock` files.
    /// Env: LVSNAP_LOCK_DIR (default None — sessions are not locked)
    pub lock_dir: Option<PathBuf>,
}

impl Default for LvsnapConfig {
    fn default() -> Self {
        Self {
            lvs: PathBuf::from("/usr/sbin/lvs"),
            lvcreate: PathBuf::from("/sbin/lvcreate"),
            lvremove: PathBuf::from("/sbin/lvremove"),
            mount: PathBuf::from("/usr/bin/mount"),
            umount: PathBuf::from("/usr/bin/umount"),
            findmnt: PathBuf::from("/usr/bin/findmnt"),
            lock_dir: None,
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    match std::env::var(key) {
        Ok(v) => {
            let s = v.trim();
            if s.is_empty() {
                None
            } else {
                Some(PathBuf::from(s))
            }
        }
        Err(_) => None,
    }
}

impl LvsnapConfig {
    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(p) = env_path("LVSNAP_CMD_LVS") {
            cfg.lvs = p;
        }
        if let Some(p) = env_path("LVSNAP_CMD_LVCREATE") {
            cfg.lvcreate = p;
        }
        if let Some(p) = env_path("LVSNAP_CMD_LVREMOVE") {
            cfg.lvremove = p;
        }
        if let Some(p) = env_path("LVSNAP_CMD_MOUNT") {
            cfg.mount = p;
        }
        if let Some(p) = env_path("LVSNAP_CMD_UMOUNT") {
            cfg.umount = p;
        }
        if let Some(p) = env_path("LVSNAP_CMD_FINDMNT") {
            cfg.findmnt = p;
        }
        if let Some(p) = env_path("LVSNAP_LOCK_DIR") {
            cfg.lock_dir = Some(p);
        }

        cfg
    }

    pub fn with_lvs<P: Into<PathBuf>>(mut self, p: P) -> Self {
        self.lvs = p.into();
        self
    }

    pub fn with_lvcreate<P: Into<PathBuf>>(mut self, p: P) -> Self {
        self.lvcreate = p.into();
        self
    }

    pub fn with_lvremove<P: Into<PathBuf>>(mut self, p: P) -> Self {
        self.lvremove = p.into();
        self
    }

    pub fn with_mount<P: Into<PathBuf>>(mut self, p: P) -> Self {
        self.mount = p.into();
        self
    }

    pub fn with_umount<P: Into<PathBuf>>(mut self, p: P) -> Self {
        self.umount = p.into();
        self
    }

    pub fn with_findmnt<P: Into<PathBuf>>(mut self, p: P) -> Self {
        self.findmnt = p.into();
        self
    }

    /// Enable per-snapshot session locks under `dir` (None disables).
    pub fn with_lock_dir<P: Into<PathBuf>>(mut self, dir: Option<P>) -> Self {
        self.lock_dir = dir.map(Into::into);
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> Self {
        self
    }
}

impl std::fmt::Display for LvsnapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "lvs={} lvcreate={} lvremove={} mount={} umount={} findmnt={} lock_dir={}",
            self.lvs.display(),
            self.lvcreate.display(),
            self.lvremove.display(),
            self.mount.display(),
            self.umount.display(),
            self.findmnt.display(),
            self.lock_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        )
    }
}
