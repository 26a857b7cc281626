use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{RenderOptions, render};
use crate::error::Notice;
use crate::photo::Photo;
use crate::stamp::OverlaySpec;

/// A flattened, downloadable stamped image.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Write the artifact into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Saved {}", path.display());
        Ok(path)
    }
}

/// `snapstamp-<epoch-millis>.png`
pub fn artifact_name(epoch_millis: i64) -> String {
    format!("snapstamp-{epoch_millis}.png")
}

/// Render the current overlay onto `photo` and package it for download.
///
/// With no photo selected nothing is rendered and [`Notice::NoPhoto`] is
/// returned.
pub fn download(
    photo: Option<&Photo>,
    overlay: &OverlaySpec,
    options: &RenderOptions,
    epoch_millis: i64,
) -> Result<Artifact, Notice> {
    let photo = photo.ok_or(Notice::NoPhoto)?;
    let rendered = render(photo, overlay, options)?;
    Ok(Artifact {
        file_name: artifact_name(epoch_millis),
        bytes: rendered.to_png()?,
    })
}
