//! Viewer configuration.

use crate::snap::{DEFAULT_MAGNET_RADIUS, Magnet, SnapStrategy};
use crate::view::{DEFAULT_DEBOUNCE, MAX_SCALE, MIN_SCALE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default number of rendered tiles kept in the tile cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid scale range: {min}..={max}")]
    ScaleRange { min: f64, max: f64 },
    #[error("Invalid magnet radius: {0}")]
    MagnetRadius(f64),
    #[error("Cache capacity must be at least 1")]
    CacheCapacity,
    #[error("Tile size must be at least 1 pixel")]
    TileSize,
}

/// Tunables shared by the annotation canvas and the tile viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Debounce delay for page, scale and pan inputs, in milliseconds.
    pub debounce_ms: u64,
    /// Snap radius for new segment endpoints.
    pub magnet_radius: f64,
    /// Endpoint selection rule within the magnet radius.
    pub snap_strategy: SnapStrategy,
    /// Lower scale bound.
    pub min_scale: f64,
    /// Upper scale bound.
    pub max_scale: f64,
    /// Maximum number of rendered tiles kept in memory.
    pub cache_capacity: usize,
    /// Fixed tile edge in pixels; derived from the screen size when unset.
    pub tile_size: Option<u32>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            magnet_radius: DEFAULT_MAGNET_RADIUS,
            snap_strategy: SnapStrategy::default(),
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            tile_size: None,
        }
    }
}

impl ViewerConfig {
    /// Debounce delay as a duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Snap settings for the annotation canvas.
    pub fn magnet(&self) -> Magnet {
        Magnet {
            radius: self.magnet_radius,
            strategy: self.snap_strategy,
        }
    }

    /// Check the configuration for values that cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scales_ok = self.min_scale.is_finite()
            && self.max_scale.is_finite()
            && self.min_scale > 0.0
            && self.min_scale <= self.max_scale;
        if !scales_ok {
            return Err(ConfigError::ScaleRange {
                min: self.min_scale,
                max: self.max_scale,
            });
        }
        if !self.magnet_radius.is_finite() || self.magnet_radius < 0.0 {
            return Err(ConfigError::MagnetRadius(self.magnet_radius));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::CacheCapacity);
        }
        if self.tile_size == Some(0) {
            return Err(ConfigError::TileSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ViewerConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert_eq!(config.magnet(), Magnet::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "cache_capacity": 16, "snap_strategy": "Nearest" }"#;
        let config: ViewerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.snap_strategy, SnapStrategy::Nearest);
        assert_eq!(config.debounce_ms, 100);
        assert!(config.tile_size.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let config = ViewerConfig {
            min_scale: 2.0,
            max_scale: 1.0,
            ..ViewerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ScaleRange { .. })));

        let config = ViewerConfig {
            cache_capacity: 0,
            ..ViewerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::CacheCapacity));

        let config = ViewerConfig {
            tile_size: Some(0),
            ..ViewerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TileSize));

        let config = ViewerConfig {
            magnet_radius: -1.0,
            ..ViewerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MagnetRadius(-1.0)));
    }
}
