//! # engine_host
//!
//! Runs the scene tick loop and, when `--http-port` is given, serves the
//! active scene over HTTP.
//!
//! ## Startup Sequence
//!
//! 1. Parse arguments and initialise structured logging.
//! 2. Create the `server` scene, optionally loading an XML scene file.
//! 3. Initialise the HTTP module and enter the fixed-rate tick loop.
//! 4. On Ctrl+C (or after `--max-ticks`), stop the HTTP server and exit.

mod module;
mod tick;

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use engine_http::ServerConfig;
use engine_http::apply::build_entity;
use engine_scene::{DEFAULT_SCENE_NAME, Scene, SceneManager};
use tracing::info;
use tracing_subscriber::EnvFilter;

use module::HttpServerModule;
use tick::{TickConfig, TickLoop};

#[derive(Parser, Debug)]
#[command(name = "engine_host", about = "Scene host with an HTTP resource server")]
struct Args {
    /// Port for the HTTP scene server; the server stays off without it
    #[arg(long)]
    http_port: Option<u16>,

    /// Interface the HTTP server binds to
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Target ticks per second
    #[arg(long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Stop after this many ticks (0 = run until Ctrl+C)
    #[arg(long, default_value_t = 0)]
    max_ticks: u64,

    /// HTTP requests answered per tick
    #[arg(long, default_value_t = 1)]
    requests_per_poll: usize,

    /// Requests allowed to wait for a tick before new ones are refused
    #[arg(long, default_value_t = 64)]
    queue_capacity: usize,

    /// How long a connection waits for its reply, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    reply_timeout_ms: u64,

    /// Largest request body accepted, in bytes
    #[arg(long, default_value_t = 1 << 20)]
    max_body_bytes: usize,

    /// XML scene file loaded into the server scene at startup
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&args.log_level))
                .context("invalid --log-level filter")?,
        )
        .init();

    info!("engine host starting");

    let mut scene = Scene::new(DEFAULT_SCENE_NAME);
    if let Some(path) = &args.scene {
        let loaded = load_scene(&mut scene, path)?;
        info!(file = %path.display(), entities = loaded, "scene loaded");
    }
    let mut scenes = SceneManager::new();
    scenes.add_scene(scene)?;

    let server_config = ServerConfig::default()
        .with_bind(args.bind)
        .with_queue_capacity(args.queue_capacity)
        .with_requests_per_poll(args.requests_per_poll)
        .with_reply_timeout(Duration::from_millis(args.reply_timeout_ms))
        .with_max_body_bytes(args.max_body_bytes);
    let mut http = HttpServerModule::new(args.http_port, server_config);
    http.initialize();

    let config = TickConfig {
        tick_rate: args.tick_rate,
        max_ticks: args.max_ticks,
    };
    let mut tick_loop = TickLoop::new(config, scenes, http);
    tick_loop.run_async().await;
    tick_loop.http_mut().uninitialize();

    info!("engine host shut down");
    Ok(())
}

/// Build the root entities of a scene document into `scene`. Returns the
/// number of root entities created.
fn load_scene(scene: &mut Scene, path: &Path) -> Result<usize> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let roots = engine_http::decode_scene(&bytes)
        .with_context(|| format!("failed to parse scene file {}", path.display()))?;
    for root in &roots {
        build_entity(scene, None, root)?;
    }
    Ok(roots.len())
}
