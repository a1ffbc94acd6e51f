//! Ctrl+C handling for serve mode.
//!
//! The first Ctrl+C asks the serve loop to shut down gracefully. A second
//! one exits immediately.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tokio::sync::mpsc;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Receives one message per shutdown request.
pub type ShutdownRx = mpsc::UnboundedReceiver<()>;

/// Install the process-wide Ctrl+C handler. Call once, before any other
/// work, so nothing else can claim the signal first.
pub fn install_handler() -> Result<ShutdownRx> {
    let (tx, rx) = mpsc::unbounded_channel();

    ctrlc::set_handler(move || {
        if SHUTDOWN.swap(true, Ordering::SeqCst) {
            crate::log!("serve"; "forced exit");
            std::process::exit(0);
        }
        let _ = tx.send(());
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;

    Ok(rx)
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
