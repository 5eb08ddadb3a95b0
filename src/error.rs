//! Error types for the snapshot lifecycle.
//!
//! Every `LvmError` belongs to one of three kinds:
//! - `NotFound`     — volume absent; expected in control flow;
//! - `Precondition` — requested operation is illegal in the current state;
//! - `ExternalTool` — lvs/lvcreate/lvremove/mount/umount/findmnt failed or
//!   printed something we could not parse. Never retried.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`LvmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Precondition,
    ExternalTool,
}

#[derive(Debug, Error)]
pub enum LvmError {
    /// Empty or otherwise unusable volume name
    #[error("can't create logical volume with name \"{0}\"")]
    InvalidName(String),

    /// Attributes requested from a volume the catalog does not know
    #[error("logical volume \"{0}\" does not exist")]
    NotFound(String),

    #[error("can't remove mounted volume \"{0}\"")]
    Mounted(String),

    #[error("can't {op}, logical volume \"{name}\" is not created")]
    NotCreated { op: &'static str, name: String },

    #[error("directory \"{}\" does not exist", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("no mount directory set for logical volume \"{0}\"")]
    NoMountDirectory(String),

    #[error("can't mount, logical volume \"{0}\" already mounted")]
    AlreadyMounted(String),

    #[error("can't umount, logical volume \"{0}\" not mounted")]
    NotMounted(String),

    /// Directory is already the mount point of some other source
    #[error("can't set mount directory \"{}\", already mounted from {source_dev}", .dir.display())]
    DirectoryBound { dir: PathBuf, source_dev: String },

    /// Snapshot-only operation on a plain volume
    #[error("logical volume \"{0}\" is not a snapshot")]
    NotSnapshot(String),

    #[error("can't create snapshot from non existent origin \"{0}\"")]
    NonExistentOrigin(String),

    #[error("invalid snapshot size \"{0}\"")]
    InvalidSize(String),

    #[error("invalid snapshot mode \"{0}\" (expected r or rw)")]
    InvalidMode(String),

    /// The tool could not be started at all
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Non-zero exit status
    #[error("{program} {args:?} failed (exit {}): {stderr}", exit_code(.code))]
    Tool {
        program: String,
        args: Vec<String>,
        code: Option<i32>,
        stderr: String,
    },

    /// Output did not match the expected report format
    #[error("malformed output from {program}: {reason}")]
    Malformed { program: String, reason: String },
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "signal".to_string(),
    }
}

impl LvmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LvmError::NotFound(_) => ErrorKind::NotFound,
            LvmError::Spawn { .. } | LvmError::Tool { .. } | LvmError::Malformed { .. } => {
                ErrorKind::ExternalTool
            }
            _ => ErrorKind::Precondition,
        }
    }

    pub fn is_precondition(&self) -> bool {
        self.kind() == ErrorKind::Precondition
    }
}

pub type Result<T> = std::result::Result<T, LvmError>;
