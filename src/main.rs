use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use snapmatch::state::AppState;
use snapmatch::{clip, config, server, Encoder};

#[derive(Parser)]
#[command(name = "snapmatch")]
#[command(
    version,
    about = "Visual item matching service backed by a CLIP image encoder"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP matching service
    Serve {
        /// Bind address (overrides the config file)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Compare two local images and print their similarity
    Compare {
        image_a: PathBuf,
        image_b: PathBuf,
    },
    /// Open config file in editor
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;

    match cli.command {
        Commands::Serve { bind } => serve(cfg, bind).await,
        Commands::Compare { image_a, image_b } => compare(&cfg, &image_a, &image_b),
        Commands::Config => open_config(),
    }
}

async fn serve(mut cfg: config::Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        cfg.bind = bind;
    }

    info!("Loading visual encoder: {}", cfg.model.display());
    let bind = cfg.bind.clone();
    let state = Arc::new(AppState::new(cfg).context("Failed to initialize matching service")?);

    server::start_server(state, &bind).await
}

fn compare(cfg: &config::Config, image_a: &Path, image_b: &Path) -> Result<()> {
    let mut encoder = Encoder::load(&cfg.model).context("Failed to load visual encoder")?;

    let img_a =
        image::open(image_a).with_context(|| format!("reading {}", image_a.display()))?;
    let img_b =
        image::open(image_b).with_context(|| format!("reading {}", image_b.display()))?;

    let emb_a = encoder.encode(&img_a)?;
    let emb_b = encoder.encode(&img_b)?;

    let score = clip::match_embedding(&emb_a, &emb_b);
    info!(
        "Similarity: {:.3} (match threshold: {:.3})",
        score, cfg.threshold
    );

    Ok(())
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
