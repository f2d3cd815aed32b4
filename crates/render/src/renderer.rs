use tileworld_common::{AIR, Bounds, TileCoord};
use tileworld_light::LightMap;
use tileworld_tiles::{TileMap, TileRegistry};

/// Read-only inputs for one rendered frame.
#[derive(Clone, Copy)]
pub struct TileView<'a> {
    pub tiles: &'a TileMap,
    pub lights: Option<&'a LightMap>,
    pub registry: &'a TileRegistry,
    /// World rectangle to draw; tiles from `floor(min)` up to `ceil(max)`.
    pub bounds: Bounds,
}

impl TileView<'_> {
    /// Inclusive-exclusive world tile range covered by `bounds`.
    pub fn tile_range(&self) -> (TileCoord, TileCoord) {
        let min = TileCoord::from_world(self.bounds.min);
        let max = TileCoord::new(self.bounds.max.x.ceil() as i32, self.bounds.max.y.ceil() as i32);
        (min, max)
    }
}

/// Renderer-agnostic interface.
///
/// A renderer reads tile and lighting state and produces output. It never
/// mutates the world.
pub trait Renderer {
    type Output;

    fn render(&self, view: &TileView<'_>) -> Self::Output;
}

/// What an [`AsciiRenderer`] prints per tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AsciiMode {
    /// One glyph per tile type.
    #[default]
    Tiles,
    /// Illumination level on a ten-step ramp.
    Lighting,
}

const LIGHT_RAMP: &[u8] = b" .:-=+*#%@";

/// Text renderer for terminals, logs and tests.
#[derive(Debug, Default)]
pub struct AsciiRenderer {
    mode: AsciiMode,
}

impl AsciiRenderer {
    pub fn new(mode: AsciiMode) -> Self {
        Self { mode }
    }

    fn tile_glyph(view: &TileView<'_>, world: TileCoord) -> char {
        let id = view.tiles.get_tile(world);
        if id == AIR {
            return '.';
        }
        match view.registry.get_tile_entry(id) {
            Some(entry) if entry.is_light_source() => '*',
            Some(entry) => entry
                .name
                .chars()
                .next()
                .map(|c| c.to_ascii_lowercase())
                .unwrap_or('?'),
            None => '?',
        }
    }

    fn light_glyph(view: &TileView<'_>, world: TileCoord) -> char {
        let intensity = view
            .lights
            .map(|l| l.illumination(view.tiles.world_to_local(world)))
            .unwrap_or(0.0);
        let step = (intensity.clamp(0.0, 1.0) * (LIGHT_RAMP.len() - 1) as f32).round() as usize;
        LIGHT_RAMP[step] as char
    }
}

impl Renderer for AsciiRenderer {
    type Output = String;

    fn render(&self, view: &TileView<'_>) -> String {
        let (min, max) = view.tile_range();
        let mut out = String::new();
        for y in min.y..max.y {
            for x in min.x..max.x {
                let world = TileCoord::new(x, y);
                out.push(match self.mode {
                    AsciiMode::Tiles => Self::tile_glyph(view, world),
                    AsciiMode::Lighting => Self::light_glyph(view, world),
                });
            }
            out.push('\n');
        }
        out
    }
}
