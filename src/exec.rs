//! External command execution.
//!
//! All storage-layer and mount-table interaction goes through a
//! [`CommandRunner`]. The system runner spawns real processes; tests plug in
//! a scripted fake through [`Lvm::with_runner`].

use log::debug;
use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::rc::Rc;

use crate::config::LvsnapConfig;
use crate::error::{LvmError, Result};

/// Captured result of one finished process.
#[derive(Debug, Clone, Default)]
pub struct CmdOutput {
    /// Exit code; None when killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner {
    /// Run `program args...` to completion. Only spawn failures are errors
    /// here; exit status is left to the caller.
    fn run(&self, program: &Path, args: &[String]) -> Result<CmdOutput>;
}

/// Runs commands with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<CmdOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| LvmError::Spawn {
                program: program.display().to_string(),
                source: e,
            })?;

        Ok(CmdOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Handle to the storage layer: configuration plus the runner used to reach
/// the tools. Cheap to clone; every volume object holds one.
#[derive(Clone)]
pub struct Lvm {
    cfg: LvsnapConfig,
    runner: Rc<dyn CommandRunner>,
}

impl Lvm {
    /// Real tools, paths from `cfg`.
    pub fn new(cfg: LvsnapConfig) -> Self {
        Self::with_runner(cfg, Rc::new(SystemRunner))
    }

    pub fn with_runner(cfg: LvsnapConfig, runner: Rc<dyn CommandRunner>) -> Self {
        Self { cfg, runner }
    }

    pub fn config(&self) -> &LvsnapConfig {
        &self.cfg
    }

    /// Run and return the raw output regardless of exit status.
    pub fn run(&self, program: &Path, args: &[String]) -> Result<CmdOutput> {
        debug!("exec: {} {}", program.display(), args.join(" "));
        self.runner.run(program, args)
    }

    /// Run and return stdout; non-zero exit is `LvmError::Tool`.
    pub fn check_output(&self, program: &Path, args: &[String]) -> Result<String> {
        let out = self.run(program, args)?;
        if !out.success() {
            return Err(tool_error(program, args, &out));
        }
        Ok(out.stdout)
    }

    /// Run for side effects only; non-zero exit is `LvmError::Tool`.
    pub fn check_call(&self, program: &Path, args: &[String]) -> Result<()> {
        self.check_output(program, args).map(|_| ())
    }
}

impl fmt::Debug for Lvm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lvm").field("cfg", &self.cfg).finish_non_exhaustive()
    }
}

pub(crate) fn tool_error(program: &Path, args: &[String], out: &CmdOutput) -> LvmError {
    LvmError::Tool {
        program: program.display().to_string(),
        args: args.to_vec(),
        code: out.code,
        stderr: out.stderr.trim().to_string(),
    }
}
