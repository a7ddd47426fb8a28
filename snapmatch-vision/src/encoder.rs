use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;
use ort::session::Session;

use crate::clip::{self, Embedding};

/// CLIP visual encoder session, loaded once and reused for every image
pub struct Encoder {
    session: Session,
}

impl Encoder {
    pub fn load(model_path: &Path) -> Result<Self> {
        Ok(Self {
            session: crate::model::visual_session(model_path)?,
        })
    }

    /// Encode an image into a unit-norm embedding
    pub fn encode(&mut self, img: &DynamicImage) -> Result<Embedding> {
        clip::encode_image(&mut self.session, img).context("encoding image")
    }
}
