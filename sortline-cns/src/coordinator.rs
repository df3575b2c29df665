//! Handshake coordinator
//!
//! Gates every outgoing command on the readiness flag. Each ready signal
//! from the controller buys exactly one command; a confirmation that finds
//! the controller not ready is dropped, never queued, because the
//! controller expects a fresh command after each ready line.

use crate::config::ProtocolConfig;
use crate::protocol::Command;
use crate::readiness::ReadinessFlag;
use crate::transport::CommandSink;
use sortline_core::Verdict;
use tracing::{debug, info, warn};

/// Result of a gated send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The command was written and consumed one readiness signal
    Sent,
    /// The controller was not ready, the command was refused, or the write
    /// failed. Nothing is retried.
    Dropped,
    /// The verdict carried nothing to send
    NotConfirmed,
}

pub struct HandshakeCoordinator<S: CommandSink> {
    flag: ReadinessFlag,
    sink: S,
    protocol: ProtocolConfig,
    write_failures: u64,
}

impl<S: CommandSink> HandshakeCoordinator<S> {
    pub fn new(flag: ReadinessFlag, sink: S, protocol: ProtocolConfig) -> Self {
        Self {
            flag,
            sink,
            protocol,
            write_failures: 0,
        }
    }

    /// Send the class of a confirmed verdict if the controller is ready
    pub fn try_send(&mut self, verdict: &Verdict) -> SendOutcome {
        let confirmation = match verdict {
            Verdict::Confirmed(confirmation) => confirmation,
            _ => return SendOutcome::NotConfirmed,
        };

        match Command::for_class(confirmation.class_id, &self.protocol) {
            Ok(command) => self.send_command(command),
            Err(e) => {
                warn!("Refusing confirmed verdict: {}", e);
                SendOutcome::Dropped
            }
        }
    }

    /// Send the no-match code if the controller is ready
    pub fn try_signal_no_match(&mut self) -> SendOutcome {
        self.send_command(Command::NoIdentification)
    }

    /// Route a verdict to the matching gated send.
    ///
    /// A window that is not full yet leaves readiness untouched; a full
    /// window either sends its class or the no-match code.
    pub fn dispatch(&mut self, verdict: &Verdict) -> SendOutcome {
        match verdict {
            Verdict::Unconfirmed => SendOutcome::NotConfirmed,
            Verdict::NoMatch { .. } => self.try_signal_no_match(),
            Verdict::Confirmed(_) => self.try_send(verdict),
        }
    }

    /// Gated send of an arbitrary command
    pub fn send_command(&mut self, command: Command) -> SendOutcome {
        if !self.flag.take() {
            debug!("Controller not ready, dropping {:?}", command);
            return SendOutcome::Dropped;
        }

        match self.sink.write_command(&command.encode(&self.protocol)) {
            Ok(()) => {
                info!("Sent {:?} to controller", command);
                SendOutcome::Sent
            }
            Err(e) => {
                self.write_failures += 1;
                warn!("Failed to send {:?}: {}", command, e);
                SendOutcome::Dropped
            }
        }
    }

    /// Close the underlying link. Returns `true` only on the closing call.
    pub fn close(&self) -> bool {
        self.sink.close()
    }

    pub fn readiness(&self) -> &ReadinessFlag {
        &self.flag
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    /// Writes that failed after readiness was consumed
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }
}
