// TriCam: scripted meshes seen through three switchable cameras

// Module declarations
mod app;
mod camera;
mod config;
mod error;
mod input;
mod math;
mod mesh;
mod overlay;
mod renderer;
mod scene;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use winit::event_loop::EventLoop;

use crate::app::{App, AppOptions};
use crate::config::SceneConfig;

#[derive(Parser)]
#[command(name = "tricam", about = "Real-time 3D demo with switchable cameras")]
struct Cli {
    /// Scene description (.yaml/.yml or .json); the built-in scene when omitted
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Wait for vertical sync when presenting
    #[arg(long)]
    vsync: bool,

    /// Window width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG still overrides the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = match &cli.scene {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("failed to load scene {}", path.display()))?,
        None => SceneConfig::default(),
    };

    // Create event loop
    let event_loop = EventLoop::new().context("failed to create event loop")?;

    let options = AppOptions {
        title: "TriCam".to_string(),
        width: cli.width,
        height: cli.height,
        vsync: cli.vsync,
    };
    let app = App::new(&event_loop, &options, &config)
        .await
        .context("failed to start renderer")?;

    // Run the frame loop until quit
    app.run(event_loop)?;
    Ok(())
}
