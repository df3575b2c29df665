//! Configuration for the confirmation window

use serde::{Deserialize, Serialize};

/// Largest window the vote will hold
pub const MAX_WINDOW_CAPACITY: usize = 1024;

/// Voting policy of the confirmation window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Number of most recent samples kept
    pub capacity: usize,
    /// Votes a class needs inside a full window to be confirmed
    pub min_agreement: usize,
    /// Size of the label set; valid class ids are `0..num_classes`
    pub num_classes: u8,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            min_agreement: 4,
            num_classes: 3,
        }
    }
}

impl WindowConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("Window capacity must be greater than 0".to_string());
        }

        if self.capacity > MAX_WINDOW_CAPACITY {
            return Err(format!(
                "Window capacity ({}) cannot exceed {}",
                self.capacity, MAX_WINDOW_CAPACITY
            ));
        }

        if self.min_agreement == 0 {
            return Err("Minimum agreement must be greater than 0".to_string());
        }

        if self.min_agreement > self.capacity {
            return Err(format!(
                "Minimum agreement ({}) cannot exceed window capacity ({})",
                self.min_agreement, self.capacity
            ));
        }

        if self.num_classes == 0 {
            return Err("Label set must contain at least one class".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = WindowConfig::default();
        assert_eq!(config.capacity, 5);
        assert_eq!(config.min_agreement, 4);
        assert_eq!(config.num_classes, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_capacity() {
        let config = WindowConfig { capacity: 0, min_agreement: 0, num_classes: 3 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_capacity_upper_bound() {
        let mut config = WindowConfig { capacity: MAX_WINDOW_CAPACITY, min_agreement: 1, num_classes: 3 };
        assert!(config.validate().is_ok());

        config.capacity = MAX_WINDOW_CAPACITY + 1;
        assert!(config.validate().is_err());

        config.capacity = usize::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_agreement_exceeds_capacity() {
        let config = WindowConfig { capacity: 5, min_agreement: 6, num_classes: 3 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_edge_cases() {
        let mut config = WindowConfig::default();

        config.min_agreement = config.capacity;
        assert!(config.validate().is_ok());

        config.min_agreement = 1;
        assert!(config.validate().is_ok());

        config.min_agreement = 0;
        assert!(config.validate().is_err());

        config.min_agreement = 1;
        config.num_classes = 0;
        assert!(config.validate().is_err());
    }
}
