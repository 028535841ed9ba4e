// Cancellation of long-running coordinator work via signal trapping
//
// Merge execution checks the flag before starting each branch; a branch
// already in progress always runs to completion.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag
#[derive(Clone)]
pub struct CancellationState {
    cancel_requested: Arc<AtomicBool>,
}

impl CancellationState {
    pub fn new() -> Self {
        Self {
            cancel_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
        log::info!("[Shutdown] Cancellation requested");
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Reset cancellation state (for testing)
    pub fn reset(&self) {
        self.cancel_requested.store(false, Ordering::SeqCst);
    }
}

impl Default for CancellationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Register signal handlers that request cancellation.
/// Handles SIGINT (Ctrl+C), SIGTERM, and SIGHUP.
#[cfg(unix)]
pub fn register_signal_handlers(state: CancellationState) -> Result<()> {
    use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::thread;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])
        .map_err(|e| anyhow::anyhow!("Failed to register signal handlers: {}", e))?;

    thread::spawn(move || {
        for signal in signals.forever() {
            let name = match signal {
                SIGINT => "SIGINT (Ctrl+C)",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => continue,
            };
            log::info!("[Shutdown] Received {}", name);
            state.cancel();
        }
    });

    log::debug!("[Shutdown] Signal handlers registered (SIGINT, SIGTERM, SIGHUP)");
    Ok(())
}

/// Register signal handlers for Windows
#[cfg(windows)]
pub fn register_signal_handlers(state: CancellationState) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("[Shutdown] Received Ctrl+C");
        state.cancel();
    })
    .map_err(|e| anyhow::anyhow!("Failed to register Ctrl+C handler: {}", e))?;

    log::debug!("[Shutdown] Signal handler registered (Ctrl+C)");
    Ok(())
}
