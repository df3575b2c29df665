//! Outgoing half of the actuator link

use crate::error::CnsError;
use crate::readiness::ReadinessFlag;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Destination for encoded commands
pub trait CommandSink: Send + Sync {
    /// Write one encoded command. Must not block for long.
    fn write_command(&self, payload: &[u8]) -> Result<(), CnsError>;

    /// Close the sink. Returns `true` only for the call that actually closed it.
    fn close(&self) -> bool;

    fn is_open(&self) -> bool;
}

impl<S: CommandSink + ?Sized> CommandSink for Box<S> {
    fn write_command(&self, payload: &[u8]) -> Result<(), CnsError> {
        (**self).write_command(payload)
    }

    fn close(&self) -> bool {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

impl<S: CommandSink + ?Sized> CommandSink for Arc<S> {
    fn write_command(&self, payload: &[u8]) -> Result<(), CnsError> {
        (**self).write_command(payload)
    }

    fn close(&self) -> bool {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// Sink that logs commands instead of writing them to a port.
///
/// With auto-ready it also plays the controller's part: it raises the
/// readiness flag up front and again after every command, so the whole
/// decision path runs without hardware.
pub struct DryRunSink {
    auto_ready: Option<ReadinessFlag>,
    written: AtomicU64,
    closed: AtomicBool,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self {
            auto_ready: None,
            written: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_auto_ready(flag: ReadinessFlag) -> Self {
        flag.signal();
        Self {
            auto_ready: Some(flag),
            ..Self::new()
        }
    }

    /// Number of commands accepted so far
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}

impl Default for DryRunSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSink for DryRunSink {
    fn write_command(&self, payload: &[u8]) -> Result<(), CnsError> {
        if !self.is_open() {
            return Err(CnsError::SerialWrite("dry-run sink is closed".to_string()));
        }
        self.written.fetch_add(1, Ordering::Relaxed);
        info!("[dry-run] command {:?}", String::from_utf8_lossy(payload));
        if let Some(flag) = &self.auto_ready {
            flag.signal();
        }
        Ok(())
    }

    fn close(&self) -> bool {
        let closed_now = !self.closed.swap(true, Ordering::AcqRel);
        if closed_now {
            info!("[dry-run] sink closed after {} commands", self.written());
        }
        closed_now
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_counts_commands() {
        let sink = DryRunSink::new();
        sink.write_command(b"1\n").unwrap();
        sink.write_command(b"3").unwrap();
        assert_eq!(sink.written(), 2);
    }

    #[test]
    fn test_dry_run_closes_once() {
        let sink = DryRunSink::new();
        assert!(sink.is_open());
        assert!(sink.close());
        assert!(!sink.close());
        assert!(!sink.is_open());
        assert!(sink.write_command(b"1\n").is_err());
    }

    #[test]
    fn test_dry_run_auto_ready() {
        let flag = ReadinessFlag::new();
        let sink = DryRunSink::with_auto_ready(flag.clone());
        assert!(flag.take());

        sink.write_command(b"0\n").unwrap();
        assert!(flag.is_ready());
    }

    #[test]
    fn test_boxed_sink_delegates() {
        let sink: Box<dyn CommandSink> = Box::new(DryRunSink::new());
        assert!(sink.write_command(b"2\n").is_ok());
        assert!(sink.close());
        assert!(!sink.is_open());
    }
}
