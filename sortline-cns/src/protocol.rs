//! Line protocol with the actuator controller
//!
//! Host to controller: the confirmed class id in decimal followed by a
//! newline, or the reserved no-match code. Controller to host: newline
//! terminated text lines, of which only the ready token carries meaning.

use crate::config::ProtocolConfig;
use crate::error::CnsError;
use sortline_core::ClassId;

/// Command written to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Actuate for a confirmed class
    Class(ClassId),
    /// A full window confirmed nothing
    NoIdentification,
}

impl Command {
    /// Command for a confirmed class, refusing the reserved code
    pub fn for_class(class_id: ClassId, protocol: &ProtocolConfig) -> Result<Self, CnsError> {
        if class_id.0 == protocol.no_match_code {
            return Err(CnsError::Protocol(format!(
                "class {} collides with the reserved no-match code",
                class_id
            )));
        }
        Ok(Command::Class(class_id))
    }

    /// Bytes put on the wire
    pub fn encode(&self, protocol: &ProtocolConfig) -> Vec<u8> {
        match self {
            Command::Class(id) => format!("{}\n", id).into_bytes(),
            Command::NoIdentification if protocol.terminate_no_match => {
                format!("{}\n", protocol.no_match_code).into_bytes()
            }
            Command::NoIdentification => protocol.no_match_code.to_string().into_bytes(),
        }
    }
}

/// Decode one raw line from the controller.
///
/// Invalid UTF-8 sequences are dropped, so line noise from a controller
/// reset does not hide the text around it. Surrounding whitespace and the
/// line terminator are stripped.
pub fn decode_line(raw: &[u8]) -> String {
    let text: String = raw.utf8_chunks().map(|chunk| chunk.valid()).collect();
    text.trim().to_string()
}

/// Whether a decoded line is the readiness signal
pub fn is_ready_line(line: &str, protocol: &ProtocolConfig) -> bool {
    line == protocol.ready_token
}
