//! Readiness flag shared between the serial reader and the control loop
//!
//! The controller announces with a ready line that it can take exactly one
//! command. The reader thread raises the flag; the coordinator consumes it
//! with [`ReadinessFlag::take`], which observes and clears it in a single
//! atomic step. A ready line arriving while a command is being written is
//! therefore either consumed by that command or left for the next one,
//! never both.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ReadinessFlag {
    ready: Arc<AtomicBool>,
}

impl ReadinessFlag {
    /// New flag, initially not ready
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the peer as ready. Returns whether it already was.
    ///
    /// Only the reader side calls this.
    pub fn signal(&self) -> bool {
        self.ready.swap(true, Ordering::AcqRel)
    }

    /// Consume readiness: returns `true` and clears the flag if it was set.
    ///
    /// Only the coordinator calls this.
    pub fn take(&self) -> bool {
        self.ready.swap(false, Ordering::AcqRel)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
