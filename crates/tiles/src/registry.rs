use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tileworld_common::{Color, TileId};

/// Errors from loading or saving a tile registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Definition of one tile type.
///
/// A tile is a light source iff `light_intensity` is present and positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileEntry {
    pub tile_id: TileId,
    pub name: String,
    pub asset_path: String,
    #[serde(default)]
    pub solid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_intensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_color: Option<Color>,
}

impl TileEntry {
    /// A plain, non-emitting tile.
    pub fn new(tile_id: TileId, name: impl Into<String>, asset_path: impl Into<String>, solid: bool) -> Self {
        Self {
            tile_id,
            name: name.into(),
            asset_path: asset_path.into(),
            solid,
            light_intensity: None,
            light_radius: None,
            light_color: None,
        }
    }

    /// Builder: make this tile emit light.
    pub fn with_light(mut self, intensity: f32, radius: f32, color: Color) -> Self {
        self.light_intensity = Some(intensity);
        self.light_radius = Some(radius);
        self.light_color = Some(color);
        self
    }

    pub fn is_light_source(&self) -> bool {
        self.light_intensity.is_some_and(|i| i > 0.0)
    }

    /// Emitted intensity; absent means 0.
    pub fn light_intensity(&self) -> f32 {
        self.light_intensity.unwrap_or(0.0).max(0.0)
    }

    pub fn light_radius(&self) -> f32 {
        self.light_radius.unwrap_or(0.0).max(0.0)
    }

    pub fn light_color(&self) -> Color {
        self.light_color.unwrap_or(Color::WHITE)
    }
}

/// Lookup table of tile definitions keyed by tile id.
///
/// Upserts only: registering an id twice keeps the last entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileRegistry {
    entries: BTreeMap<TileId, TileEntry>,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock tile set: dirt, grass, stone and two lamps.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_tiles([
            TileEntry::new(1, "Dirt", "dirt.png", true),
            TileEntry::new(2, "Grass", "grass.png", true),
            TileEntry::new(3, "Stone", "stone.png", true),
            TileEntry::new(4, "Light", "light.png", false).with_light(0.5, 10.0, Color::WHITE),
            TileEntry::new(5, "Blue Light", "light.png", false).with_light(1.0, 10.0, Color::rgb(0, 0, 255)),
        ]);
        registry
    }

    pub fn register_tile(&mut self, entry: TileEntry) {
        tracing::trace!(tile_id = entry.tile_id, name = %entry.name, "register tile");
        self.entries.insert(entry.tile_id, entry);
    }

    pub fn register_tiles(&mut self, entries: impl IntoIterator<Item = TileEntry>) {
        for entry in entries {
            self.register_tile(entry);
        }
    }

    pub fn get_tile_entry(&self, tile_id: TileId) -> Option<&TileEntry> {
        self.entries.get(&tile_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TileEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a seed list: a JSON array of entries, applied in order.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let entries: Vec<TileEntry> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        registry.register_tiles(entries);
        Ok(registry)
    }

    /// Load a seed list from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let registry = Self::from_json(&data)?;
        tracing::debug!(path = %path.as_ref().display(), tiles = registry.len(), "loaded tile registry");
        Ok(registry)
    }

    /// Save the registry as a seed list ordered by tile id.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RegistryError> {
        let file = std::fs::File::create(path)?;
        let entries: Vec<&TileEntry> = self.entries.values().collect();
        serde_json::to_writer_pretty(file, &entries)?;
        Ok(())
    }
}
