//! Rendering for the tile world.
//!
//! # Invariants
//! - Renderers read tile and lighting state; they never mutate it.
//! - A cached chunk raster is redrawn only after it was marked dirty. View
//!   changes (pan, zoom) only change how rasters are blitted.

mod cache;
mod raster;
mod renderer;
mod tileset;

pub use cache::{ChunkCache, DEFAULT_AMBIENT, RenderPass, View};
pub use raster::{FALLBACK_DARK, FALLBACK_LIGHT, Raster, RenderError, Rgba, TRANSPARENT};
pub use renderer::{AsciiMode, AsciiRenderer, Renderer, TileView};
pub use tileset::TileSet;

pub fn crate_info() -> &'static str {
    "tileworld-render v0.1.0"
}
