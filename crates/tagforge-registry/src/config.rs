//! Registry configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for the session registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Capacity of each session task's command channel. When it fills
    /// up, callers wait (backpressure) rather than fail.
    pub channel_size: usize,

    /// How many updates a slow subscriber may fall behind before it
    /// starts missing them.
    pub update_buffer: usize,

    /// Seed for session ids, player ids, and spawn angles. `None` seeds
    /// from the OS. Set it to make a whole run reproducible.
    pub rng_seed: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            update_buffer: 64,
            rng_seed: None,
        }
    }
}

impl RegistryConfig {
    /// Replaces zero capacities with the defaults. Tokio channels cannot
    /// be created with capacity 0.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.channel_size == 0 {
            warn!("channel_size is 0, using default");
            self.channel_size = defaults.channel_size;
        }
        if self.update_buffer == 0 {
            warn!("update_buffer is 0, using default");
            self.update_buffer = defaults.update_buffer;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_config_default() {
        let config = RegistryConfig::default();
        assert_eq!(config.channel_size, 64);
        assert_eq!(config.update_buffer, 64);
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn test_registry_config_validated_replaces_zero() {
        let config = RegistryConfig {
            channel_size: 0,
            update_buffer: 0,
            rng_seed: Some(7),
        }
        .validated();
        assert_eq!(config.channel_size, 64);
        assert_eq!(config.update_buffer, 64);
        assert_eq!(config.rng_seed, Some(7));
    }

    #[test]
    fn test_registry_config_from_partial_json() {
        let config: RegistryConfig = serde_json::from_str(r#"{"rng_seed": 42}"#).unwrap();
        assert_eq!(config.rng_seed, Some(42));
        assert_eq!(config.channel_size, 64);
    }
}
