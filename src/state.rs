use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use image::DynamicImage;
use snapmatch_vision::{Embedding, Encoder};

use crate::config::Config;

/// Image -> embedding provider shared across requests.
///
/// The seam the request handler is written against; the production
/// implementation is [`ClipProvider`].
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, img: &DynamicImage) -> Result<Embedding>;
}

/// CLIP encoder behind a lock: ort sessions need `&mut` to run, so the
/// shared provider serializes encode calls.
pub struct ClipProvider {
    inner: Mutex<Encoder>,
}

impl ClipProvider {
    pub fn load(model_path: &Path) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(Encoder::load(model_path)?),
        })
    }
}

impl ImageEncoder for ClipProvider {
    fn encode(&self, img: &DynamicImage) -> Result<Embedding> {
        let mut encoder = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("encoder lock poisoned"))?;
        encoder.encode(img)
    }
}

/// Shared application state, injected into the request handler
pub struct AppState {
    pub config: Config,
    pub encoder: Arc<dyn ImageEncoder>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Build production state: load the visual encoder once, up front
    pub fn new(config: Config) -> Result<Self> {
        let encoder = ClipProvider::load(&config.model).context("loading visual encoder")?;
        Ok(Self::with_encoder(config, Arc::new(encoder)))
    }

    /// Build state around an explicit provider instance
    pub fn with_encoder(config: Config, encoder: Arc<dyn ImageEncoder>) -> Self {
        Self {
            config,
            encoder,
            http: reqwest::Client::new(),
        }
    }
}
