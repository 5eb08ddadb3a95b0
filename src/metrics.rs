//! Lightweight global metrics for lvsnap.
//!
//! Атомарные счётчики процесса:
//! - snapshots (create/remove)
//! - mounts (mount/umount)
//! - sessions (started, cleanup failures)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// ----- Snapshots -----
static SNAPSHOTS_CREATED: AtomicU64 = AtomicU64::new(0);
static VOLUMES_REMOVED: AtomicU64 = AtomicU64::new(0);

// ----- Mounts -----
static MOUNTS: AtomicU64 = AtomicU64::new(0);
static UMOUNTS: AtomicU64 = AtomicU64::new(0);

// ----- Sessions -----
static SESSIONS_STARTED: AtomicU64 = AtomicU64::new(0);
static SESSION_CLEANUP_FAILURES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub snapshots_created: u64,
    pub volumes_removed: u64,
    pub mounts: u64,
    pub umounts: u64,
    pub sessions_started: u64,
    pub session_cleanup_failures: u64,
}

impl MetricsSnapshot {
    /// Snapshots created but not (yet) removed by this process.
    pub fn snapshots_outstanding(&self) -> u64 {
        self.snapshots_created.saturating_sub(self.volumes_removed)
    }
}

pub fn record_snapshot_created() {
    SNAPSHOTS_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_volume_removed() {
    VOLUMES_REMOVED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_mount() {
    MOUNTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_umount() {
    UMOUNTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_session_started() {
    SESSIONS_STARTED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_session_cleanup_failure() {
    SESSION_CLEANUP_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        snapshots_created: SNAPSHOTS_CREATED.load(Ordering::Relaxed),
        volumes_removed: VOLUMES_REMOVED.load(Ordering::Relaxed),
        mounts: MOUNTS.load(Ordering::Relaxed),
        umounts: UMOUNTS.load(Ordering::Relaxed),
        sessions_started: SESSIONS_STARTED.load(Ordering::Relaxed),
        session_cleanup_failures: SESSION_CLEANUP_FAILURES.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    SNAPSHOTS_CREATED.store(0, Ordering::Relaxed);
    VOLUMES_REMOVED.store(0, Ordering::Relaxed);
    MOUNTS.store(0, Ordering::Relaxed);
    UMOUNTS.store(0, Ordering::Relaxed);
    SESSIONS_STARTED.store(0, Ordering::Relaxed);
    SESSION_CLEANUP_FAILURES.store(0, Ordering::Relaxed);
}
