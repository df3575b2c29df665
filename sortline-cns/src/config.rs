//! Configuration for the actuator link and its line protocol

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serial connection to the actuator controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Port identifier (`/dev/ttyACM0`, `COM6`, ...)
    pub port: String,
    /// Baud rate expected by the controller firmware
    pub baud_rate: u32,
    /// Pause after opening the port; the controller resets on connect
    pub settle_delay_ms: u64,
    /// Upper bound on a single blocking read in the reader thread
    pub read_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 9600,
            settle_delay_ms: 2000,
            read_timeout_ms: 100,
        }
    }
}

#[cfg(windows)]
fn default_port() -> &'static str {
    "COM6"
}

#[cfg(not(windows))]
fn default_port() -> &'static str {
    "/dev/ttyACM0"
}

impl LinkConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.port.trim().is_empty() {
            return Err("Serial port must not be empty".to_string());
        }

        if self.baud_rate == 0 {
            return Err("Baud rate must be greater than 0".to_string());
        }

        if self.read_timeout_ms == 0 {
            return Err("Read timeout must be greater than 0".to_string());
        }

        // The reader checks for shutdown between reads.
        if self.read_timeout_ms > 5000 {
            return Err("Read timeout too large (max 5000 ms)".to_string());
        }

        if self.settle_delay_ms > 60_000 {
            return Err("Settle delay too large (max 60000 ms)".to_string());
        }

        Ok(())
    }
}

/// Line protocol spoken with the actuator controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Line the controller sends when it can take one command
    pub ready_token: String,
    /// Code sent when a full window confirms nothing
    pub no_match_code: u8,
    /// Append a newline to the no-match code. The reference firmware
    /// expects the bare code.
    pub terminate_no_match: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            ready_token: "ok".to_string(),
            no_match_code: 3,
            terminate_no_match: false,
        }
    }
}

impl ProtocolConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let token = self.ready_token.trim();
        if token.is_empty() {
            return Err("Ready token must not be empty".to_string());
        }

        if token != self.ready_token {
            return Err("Ready token must not carry surrounding whitespace".to_string());
        }

        Ok(())
    }

    /// Ensure the reserved code cannot be mistaken for a real class
    pub fn validate_against(&self, num_classes: u8) -> Result<(), String> {
        self.validate()?;
        if self.no_match_code < num_classes {
            return Err(format!(
                "No-match code {} collides with class ids 0..{}",
                self.no_match_code, num_classes
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_config_default() {
        let config = LinkConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.settle_delay(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_link_config_validation() {
        let mut config = LinkConfig::default();
        config.port = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = LinkConfig::default();
        config.baud_rate = 0;
        assert!(config.validate().is_err());

        let mut config = LinkConfig::default();
        config.read_timeout_ms = 0;
        assert!(config.validate().is_err());

        config.read_timeout_ms = 5001;
        assert!(config.validate().is_err());

        config.read_timeout_ms = 5000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_protocol_config_default() {
        let config = ProtocolConfig::default();
        assert_eq!(config.ready_token, "ok");
        assert_eq!(config.no_match_code, 3);
        assert!(!config.terminate_no_match);
        assert!(config.validate_against(3).is_ok());
    }

    #[test]
    fn test_protocol_config_rejects_colliding_code() {
        let config = ProtocolConfig { no_match_code: 2, ..ProtocolConfig::default() };
        assert!(config.validate_against(3).is_err());
        assert!(config.validate_against(2).is_ok());
    }

    #[test]
    fn test_protocol_config_rejects_bad_token() {
        let config = ProtocolConfig { ready_token: "".to_string(), ..ProtocolConfig::default() };
        assert!(config.validate().is_err());

        let config = ProtocolConfig { ready_token: " ok".to_string(), ..ProtocolConfig::default() };
        assert!(config.validate().is_err());
    }
}
