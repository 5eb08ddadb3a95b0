//! SIGINT/SIGTERM → flag.
//!
//! A signal does not kill the process: it sets the flag, and the backup loop
//! checks it between configs, so the running session unwinds through its
//! teardown (umount + lvremove). A second signal while the flag is already
//! set exits at once with code 1.

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Work stopped because an interrupt was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("interrupted by signal")]
pub struct Interrupted;

#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install_signal_handlers(&self) -> Result<()> {
        for sig in [SIGINT, SIGTERM] {
            // порядок важен: сначала conditional_shutdown, потом флаг
            signal_hook::flag::register_conditional_shutdown(sig, 1, Arc::clone(&self.0))
                .with_context(|| format!("register shutdown for signal {}", sig))?;
            signal_hook::flag::register(sig, Arc::clone(&self.0))
                .with_context(|| format!("register handler for signal {}", sig))?;
        }
        Ok(())
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> std::result::Result<(), Interrupted> {
        if self.is_set() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}
