use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Host-side progress and cancellation hooks.
pub trait TaskMonitor: Sync {
    fn set_status(&self, status: &str);

    /// `None` means the completion percentage cannot be determined.
    fn set_percent(&self, percent: Option<u8>);

    fn is_canceled(&self) -> bool;

    /// Show a diagnostic to the user.
    fn show_message(&self, message: &str);
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The shared flag, for handing to a signal handler.
    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// Monitor that reports through `tracing` and prints diagnostics to stderr.
#[derive(Debug, Clone, Default)]
pub struct LogMonitor {
    cancel: CancelFlag,
}

impl LogMonitor {
    pub fn new(cancel: CancelFlag) -> Self {
        Self { cancel }
    }
}

impl TaskMonitor for LogMonitor {
    fn set_status(&self, status: &str) {
        tracing::info!("{status}");
    }

    fn set_percent(&self, percent: Option<u8>) {
        match percent {
            Some(p) => tracing::debug!(percent = p, "progress"),
            None => tracing::trace!("progress indeterminate"),
        }
    }

    fn is_canceled(&self) -> bool {
        self.cancel.is_set()
    }

    fn show_message(&self, message: &str) {
        tracing::error!("{message}");
        eprintln!("{message}");
    }
}
