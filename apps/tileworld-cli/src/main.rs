use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use glam::Vec2;
use tileworld_common::{Bounds, TileCoord, TileId};
use tileworld_kernel::{World, WorldConfig};
use tileworld_render::{AsciiMode, AsciiRenderer, Raster, Renderer};
use tileworld_tiles::TileRegistry;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tileworld-cli", about = "CLI tool for tileworld operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// World config (YAML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Tile registry seed list (JSON); the built-in tiles when omitted
    #[arg(short, long, global = true)]
    registry: Option<PathBuf>,

    /// Override the config's terrain seed
    #[arg(short, long, global = true)]
    seed: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version, crate info and the loaded configuration
    Info,
    /// Generate terrain and print it as text
    Generate {
        /// Left column of the printed region
        #[arg(long, default_value = "-40", allow_hyphen_values = true)]
        x: i32,
        /// Top row of the printed region
        #[arg(long, default_value = "-4", allow_hyphen_values = true)]
        y: i32,
        #[arg(long, default_value = "80")]
        width: i32,
        #[arg(long, default_value = "40")]
        height: i32,
    },
    /// Place light sources on an empty world and print the baked lighting
    Light {
        /// Light sources as `x,y`; repeat for more
        #[arg(long = "at", value_parser = parse_tile, default_value = "0,0", allow_hyphen_values = true)]
        at: Vec<TileCoord>,
        /// Emitting tile id
        #[arg(long, default_value = "4")]
        tile: TileId,
        /// Half-extent of the printed square
        #[arg(long, default_value = "12")]
        extent: i32,
    },
    /// Run frames from a camera and write the final frame as PNG
    Render {
        /// Output file
        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,
        /// Directory holding the registry's tile images
        #[arg(long)]
        tiles: Option<PathBuf>,
        #[arg(long, default_value = "640")]
        width: u32,
        #[arg(long, default_value = "480")]
        height: u32,
        /// Camera center in world units, `x,y`
        #[arg(long, value_parser = parse_vec2, default_value = "0,8", allow_hyphen_values = true)]
        camera: Vec2,
        #[arg(long, default_value = "1")]
        frames: u32,
    },
}

fn parse_pair(s: &str) -> Result<(&str, &str), String> {
    s.split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))
}

fn parse_tile(s: &str) -> Result<TileCoord, String> {
    let (x, y) = parse_pair(s)?;
    let x = x.trim().parse().map_err(|e| format!("bad x in `{s}`: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in `{s}`: {e}"))?;
    Ok(TileCoord::new(x, y))
}

fn parse_vec2(s: &str) -> Result<Vec2, String> {
    let (x, y) = parse_pair(s)?;
    let x = x.trim().parse().map_err(|e| format!("bad x in `{s}`: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in `{s}`: {e}"))?;
    Ok(Vec2::new(x, y))
}

fn build_world(cli: &Cli) -> anyhow::Result<World> {
    let mut config = match &cli.config {
        Some(path) => WorldConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => WorldConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let registry = match &cli.registry {
        Some(path) => TileRegistry::load(path).with_context(|| format!("loading registry {}", path.display()))?,
        None => TileRegistry::builtin(),
    };
    Ok(World::new(config, registry)?)
}

fn region(x: i32, y: i32, width: i32, height: i32) -> Bounds {
    // Tile ranges are half-open; keep the max just inside the last column.
    let min = Vec2::new(x as f32, y as f32);
    Bounds::new(min, min + Vec2::new(width as f32, height as f32) - Vec2::splat(0.5))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match &cli.command {
        Commands::Info => {
            let world = build_world(&cli)?;
            println!("tileworld-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", tileworld_common::crate_info());
            println!("tiles: {}", tileworld_tiles::crate_info());
            println!("light: {}", tileworld_light::crate_info());
            println!("worldgen: {}", tileworld_worldgen::crate_info());
            println!("render: {}", tileworld_render::crate_info());
            println!("input: {}", tileworld_input::crate_info());
            println!("ecs: {}", tileworld_ecs::crate_info());
            println!("kernel: {}", tileworld_kernel::crate_info());
            println!();
            println!("{:#?}", world.config());
            for entry in world.registry().entries() {
                let light = if entry.is_light_source() {
                    format!(
                        " light={} radius={} color={}",
                        entry.light_intensity(),
                        entry.light_radius(),
                        entry.light_color()
                    )
                } else {
                    String::new()
                };
                println!("tile {:>3} {:<12} solid={}{light}", entry.tile_id, entry.name, entry.solid);
            }
        }
        Commands::Generate { x, y, width, height } => {
            let mut world = build_world(&cli)?;
            let bounds = region(*x, *y, *width, *height);
            let chunks = world.generate_region(bounds);
            world.bake_lighting()?;
            println!("{}", AsciiRenderer::new(AsciiMode::Tiles).render(&world.tile_view(bounds)));
            println!("generated {chunks} chunks, hash={:#018x}", world.state_hash());
        }
        Commands::Light { at, tile, extent } => {
            let mut world = build_world(&cli)?.without_generation();
            for coord in at {
                world.set_tile(*coord, *tile);
            }
            let baked = world.bake_lighting()?;
            world.verify_lighting()?;
            let bounds = region(-extent, -extent, extent * 2 + 1, extent * 2 + 1);
            println!("{}", AsciiRenderer::new(AsciiMode::Lighting).render(&world.tile_view(bounds)));
            println!("{}", world.summary());
            println!("baked {baked} chunks");
        }
        Commands::Render {
            output,
            tiles,
            width,
            height,
            camera,
            frames,
        } => {
            let mut world = build_world(&cli)?;
            if let Some(dir) = tiles {
                world.load_tileset(dir);
            }
            world.spawn_camera(*camera)?;

            let viewport = Vec2::new(*width as f32, *height as f32);
            let mut target = Raster::new(*width, *height);
            for _ in 0..(*frames).max(1) {
                let report = world.frame(1.0 / 60.0, viewport, Some(&mut target))?;
                tracing::debug!(?report, "frame");
            }
            target
                .save_png(output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("{}", world.summary());
            println!("wrote {}", output.display());
        }
    }

    Ok(())
}
