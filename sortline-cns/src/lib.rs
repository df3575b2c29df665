//! sortline-cns: actuation side of the SortLine sorter
//!
//! Provides:
//! - The readiness flag shared with the serial reader thread
//! - The line protocol spoken with the actuator controller
//! - A serial link with a background reader
//! - The handshake coordinator that gates commands on readiness
//! - The control loop tying camera, model, window and link together

pub mod error;
pub mod config;
pub mod readiness;
pub mod protocol;
pub mod transport;
pub mod serial;
pub mod coordinator;
pub mod control;

pub use error::CnsError;
pub use config::{LinkConfig, ProtocolConfig};
pub use readiness::ReadinessFlag;
pub use protocol::Command;
pub use transport::{CommandSink, DryRunSink};
pub use serial::SerialLink;
pub use coordinator::{HandshakeCoordinator, SendOutcome};
pub use control::{ControlLoop, LoopReport, LoopStats, StopReason, StopSignal, TickOutcome};
