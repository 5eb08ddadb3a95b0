//! Snapshot-scoped session: create → use → always clean up.
//!
//! RAII-гард по образцу DirtyGuard:
//! - `begin()` creates the snapshot;
//! - `finish()` unmounts (if mounted) then removes it and reports errors;
//! - `Drop` does the same best-effort when `finish()` was never reached
//!   (early return, panic unwinding).
//!
//! `with_snapshot()` wraps a unit of work: the work's own error always
//! reaches the caller; a teardown failure is reported next to it, never
//! instead of it.

use log::{info, warn};
use std::fmt;

use crate::error::LvmError;
use crate::exec::Lvm;
use crate::metrics::{record_session_cleanup_failure, record_session_started};
use crate::snapshot::{CowSnapshot, OriginRef, SizeSpec, SnapshotMode};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Snapshot could not be created; nothing to clean up.
    #[error("snapshot session setup failed: {0}")]
    Create(#[source] LvmError),

    /// The unit of work failed; teardown succeeded.
    #[error(transparent)]
    Work(anyhow::Error),

    /// The unit of work succeeded; teardown failed.
    #[error("snapshot cleanup failed: {0}")]
    Cleanup(#[source] LvmError),

    /// Both failed.
    #[error("{work:#}; snapshot cleanup also failed: {cleanup}")]
    WorkAndCleanup {
        work: anyhow::Error,
        cleanup: LvmError,
    },
}

impl SessionError {
    /// Error raised by the unit of work, if any.
    pub fn work_error(&self) -> Option<&anyhow::Error> {
        match self {
            SessionError::Work(e) | SessionError::WorkAndCleanup { work: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Error raised by teardown, if any.
    pub fn cleanup_error(&self) -> Option<&LvmError> {
        match self {
            SessionError::Cleanup(e) | SessionError::WorkAndCleanup { cleanup: e, .. } => Some(e),
            _ => None,
        }
    }
}

/// Unmount if mounted, then remove. A snapshot that is already gone is not
/// an error.
pub fn teardown(snap: &CowSnapshot) -> Result<(), LvmError> {
    snap.refresh()?;
    if !snap.exists()? {
        info!("session: snapshot {} already gone", snap.name());
        return Ok(());
    }
    if snap.mounted()? {
        info!("session: unmounting snapshot {}", snap.name());
        snap.umount()?;
    }
    info!("session: removing snapshot {}", snap.name());
    snap.remove()
}

pub struct SnapshotSession {
    snap: CowSnapshot,
    armed: bool,
}

impl SnapshotSession {
    /// Create snapshot `name` of `origin` and guard it.
    pub fn begin(
        lvm: &Lvm,
        origin: impl Into<OriginRef>,
        name: &str,
        mode: SnapshotMode,
        size: SizeSpec,
    ) -> Result<Self, LvmError> {
        let snap = CowSnapshot::create_new(lvm, name, origin, mode, size)?;
        record_session_started();
        info!(
            "session: begin, snapshot={} origin={}",
            snap.name(),
            snap.origin().name()
        );
        Ok(Self { snap, armed: true })
    }

    pub fn snapshot(&self) -> &CowSnapshot {
        &self.snap
    }

    pub fn snapshot_mut(&mut self) -> &mut CowSnapshot {
        &mut self.snap
    }

    /// Tear down now and report the result. Runs at most once.
    pub fn finish(mut self) -> Result<(), LvmError> {
        self.armed = false;
        let res = teardown(&self.snap);
        if res.is_err() {
            record_session_cleanup_failure();
        }
        res
    }
}

impl Drop for SnapshotSession {
    fn drop(&mut self) {
        if self.armed {
            self.armed = false;
            if let Err(e) = teardown(&self.snap) {
                record_session_cleanup_failure();
                warn!(
                    "session: cleanup of snapshot {} failed: {}",
                    self.snap.name(),
                    e
                );
            }
        }
    }
}

impl fmt::Debug for SnapshotSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotSession")
            .field("snapshot", &self.snap.name())
            .field("armed", &self.armed)
            .finish()
    }
}

/// Create the snapshot, run `work` on it, then always tear it down.
pub fn with_snapshot<T, F>(
    lvm: &Lvm,
    origin: impl Into<OriginRef>,
    name: &str,
    mode: SnapshotMode,
    size: SizeSpec,
    work: F,
) -> Result<T, SessionError>
where
    F: FnOnce(&mut CowSnapshot) -> anyhow::Result<T>,
{
    let mut session =
        SnapshotSession::begin(lvm, origin, name, mode, size).map_err(SessionError::Create)?;

    let outcome = work(session.snapshot_mut());
    let cleanup = session.finish();

    match (outcome, cleanup) {
        (Ok(v), Ok(())) => Ok(v),
        (Err(work), Ok(())) => Err(SessionError::Work(work)),
        (Ok(_), Err(cleanup)) => Err(SessionError::Cleanup(cleanup)),
        (Err(work), Err(cleanup)) => {
            warn!("session: work failed ({work:#}) and cleanup failed ({cleanup})");
            Err(SessionError::WorkAndCleanup { work, cleanup })
        }
    }
}
