//! Store configuration

/// Retained samples per channel when nothing else is configured
pub const DEFAULT_CAPACITY: usize = 500;

/// Configuration rejected by the store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("capacity must be a positive number of samples, got {requested}")]
    InvalidCapacity { requested: i64 },

    #[error("capacity is fixed at {current} when the store is built (requested {requested})")]
    CapacityLocked { current: usize, requested: usize },
}

/// Validated store configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    capacity: usize,
}

impl StoreConfig {
    /// Create a configuration retaining `capacity` samples per channel
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity { requested: 0 });
        }
        Ok(Self { capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl TryFrom<i64> for StoreConfig {
    type Error = ConfigError;

    fn try_from(capacity: i64) -> Result<Self, Self::Error> {
        match usize::try_from(capacity) {
            Ok(capacity) if capacity > 0 => Ok(Self { capacity }),
            _ => Err(ConfigError::InvalidCapacity {
                requested: capacity,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            StoreConfig::new(0),
            Err(ConfigError::InvalidCapacity { requested: 0 })
        );
    }

    #[test]
    fn test_negative_capacity_rejected() {
        assert_eq!(
            StoreConfig::try_from(-5),
            Err(ConfigError::InvalidCapacity { requested: -5 })
        );
        assert!(StoreConfig::try_from(0).is_err());
    }

    #[test]
    fn test_valid_capacity() {
        assert_eq!(StoreConfig::new(3).unwrap().capacity(), 3);
        assert_eq!(StoreConfig::try_from(1000).unwrap().capacity(), 1000);
        assert_eq!(StoreConfig::default().capacity(), DEFAULT_CAPACITY);
    }
}
