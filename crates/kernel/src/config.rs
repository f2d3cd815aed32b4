use serde::{Deserialize, Serialize};
use std::path::Path;
use tileworld_common::DEFAULT_CHUNK_SIZE;
use tileworld_worldgen::TerrainTiles;

/// Errors from loading or validating a [`WorldConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// World settings. Every field has a default, so a config file only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Terrain noise seed.
    pub seed: u32,
    /// Chunk edge length in tiles.
    pub chunk_size: i32,
    /// Cached raster pixels per tile.
    pub tile_resolution: u32,
    /// Camera pixels per world unit at zoom 1.
    pub pixels_per_unit: f32,
    pub lighting_enabled: bool,
    /// Brightness of tiles no light reaches, in `[0, 1]`.
    pub ambient_light: f32,
    /// Maximum chunk bakes per frame; `None` drains the queue every frame.
    pub bake_budget: Option<usize>,
    pub terrain: TerrainTiles,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            tile_resolution: 16,
            pixels_per_unit: 16.0,
            lighting_enabled: true,
            ambient_light: 0.15,
            bake_budget: None,
            terrain: TerrainTiles::default(),
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };
        if self.chunk_size <= 0 {
            return invalid("chunk_size", "must be positive");
        }
        if self.tile_resolution == 0 {
            return invalid("tile_resolution", "must be positive");
        }
        if !(self.pixels_per_unit > 0.0) {
            return invalid("pixels_per_unit", "must be positive");
        }
        if !(0.0..=1.0).contains(&self.ambient_light) {
            return invalid("ambient_light", "must be within [0, 1]");
        }
        if self.bake_budget == Some(0) {
            return invalid("bake_budget", "must be at least 1 when set");
        }
        Ok(())
    }

    /// Parse and validate YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&data)?;
        tracing::debug!(path = %path.as_ref().display(), seed = config.seed, "loaded world config");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = WorldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 32);
        assert_eq!(config.terrain.stone, 3);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = WorldConfig::from_yaml("seed: 42\nbake_budget: 4\nterrain:\n  grass: 7\n").unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.bake_budget, Some(4));
        assert_eq!(config.terrain.grass, 7);
        assert_eq!(config.terrain.dirt, 1);
        assert!(config.lighting_enabled);
    }

    #[test]
    fn rejects_bad_values() {
        for yaml in [
            "chunk_size: 0",
            "tile_resolution: 0",
            "pixels_per_unit: -1",
            "ambient_light: 1.5",
            "bake_budget: 0",
        ] {
            let err = WorldConfig::from_yaml(yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{yaml}: {err}");
        }
    }

    #[test]
    fn malformed_yaml_is_reported() {
        assert!(matches!(WorldConfig::from_yaml("seed: [1"), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let config = WorldConfig {
            seed: 9,
            ambient_light: 0.3,
            ..WorldConfig::default()
        };
        config.save(tmp.path()).unwrap();
        assert_eq!(WorldConfig::load(tmp.path()).unwrap(), config);
    }
}
