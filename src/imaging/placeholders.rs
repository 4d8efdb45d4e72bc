use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::cache::Picture;

pub const FULL_SIZE: u32 = 512;
/// Used on low density displays to save memory.
pub const HALF_SIZE: u32 = 256;

const LOW_DENSITY: f32 = 1.5;
const NEUTRAL: Rgba<u8> = Rgba([200, 200, 200, 255]);

/// Default images shown while a photo loads, or when there is none.
#[derive(Debug, Clone)]
pub struct Placeholders {
    images: Vec<Picture>,
}

pub fn size_for_density(density: f32) -> u32 {
    if density < LOW_DENSITY {
        HALF_SIZE
    } else {
        FULL_SIZE
    }
}

impl Placeholders {
    /// A single flat placeholder.
    pub fn generated(size: u32) -> Self {
        Self {
            images: vec![Arc::new(RgbaImage::from_pixel(size, size, NEUTRAL))],
        }
    }

    /// Load every readable image in `dir`, ordered by file name.
    /// Falls back to a generated placeholder when there is nothing to load.
    pub fn load(dir: Option<&Path>, density: f32) -> Result<Self> {
        let size = size_for_density(density);
        let Some(dir) = dir else {
            return Ok(Self::generated(size));
        };

        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read placeholders directory {:?}", dir))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        let mut images = Vec::with_capacity(paths.len());
        for path in paths {
            match image::open(&path) {
                Ok(img) => {
                    let img = img.resize_exact(size, size, FilterType::Triangle).to_rgba8();
                    images.push(Arc::new(img));
                }
                Err(e) => warn!(?path, error = %e, "Skipping unreadable placeholder"),
            }
        }

        if images.is_empty() {
            debug!(?dir, "No placeholders found, generating one");
            return Ok(Self::generated(size));
        }
        Ok(Self { images })
    }

    /// The placeholder for a fallback index; indices wrap around.
    pub fn get(&self, index: usize) -> Picture {
        self.images[index % self.images.len()].clone()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
