use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::db::GracePeriod;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub diary: DiaryConfig,

    #[serde(default)]
    pub photos: PhotosConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiaryConfig {
    /// Hours after creation during which an entry can still be edited (0-168).
    #[serde(default)]
    pub grace_period: GracePeriod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotosConfig {
    #[serde(default = "default_photos_dir")]
    pub directory: PathBuf,
}

fn default_photos_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wordiary")
        .join("photos")
}

impl Default for PhotosConfig {
    fn default() -> Self {
        Self {
            directory: default_photos_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Directory holding the default placeholder images.
    /// If not set, a single neutral placeholder is generated.
    #[serde(default)]
    pub placeholders_dir: Option<PathBuf>,

    /// Display density multiplier applied to target sizes.
    #[serde(default = "default_density")]
    pub density: f32,

    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Memory the process may use, in megabytes. There is no portable
    /// runtime heap limit to query, so this setting stands in for it and the
    /// image cache is sized from it.
    #[serde(default = "default_memory_budget_mb")]
    pub memory_budget_mb: u64,

    /// The image cache gets 1/cache_fraction of the memory budget.
    #[serde(default = "default_cache_fraction")]
    pub cache_fraction: u32,
}

fn default_density() -> f32 {
    1.0
}

fn default_worker_threads() -> usize {
    2
}

fn default_memory_budget_mb() -> u64 {
    512
}

fn default_cache_fraction() -> u32 {
    8
}

impl ImagesConfig {
    /// Density as used for scaling: never below 1.0, rounded to two decimals.
    pub fn effective_density(&self) -> f32 {
        if self.density < 1.0 || !self.density.is_finite() {
            1.0
        } else {
            (self.density * 100.0).round() / 100.0
        }
    }

    /// Cache capacity in KiB of decoded pixel memory.
    pub fn cache_capacity_kib(&self) -> u64 {
        (self.memory_budget_mb * 1024) / u64::from(self.cache_fraction.max(1))
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            placeholders_dir: None,
            density: default_density(),
            worker_threads: default_worker_threads(),
            memory_budget_mb: default_memory_budget_mb(),
            cache_fraction: default_cache_fraction(),
        }
    }
}

/// Presentation settings. Stored here so they survive a save, but the
/// diary core never reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_font")]
    pub font: String,

    #[serde(default = "default_font_size")]
    pub font_size: u8,
}

fn default_font() -> String {
    "default".to_string()
}

fn default_font_size() -> u8 {
    2
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            font: default_font(),
            font_size: default_font_size(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wordiary")
        .join("wordiary.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            diary: DiaryConfig::default(),
            photos: PhotosConfig::default(),
            images: ImagesConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Config {
    /// Load from `WORDIARY_CONFIG` if set, otherwise from the default location.
    pub fn load() -> Result<Self> {
        match std::env::var_os("WORDIARY_CONFIG") {
            Some(path) => Self::load_from(Path::new(&path)),
            None => Self::load_from(&Self::config_path()),
        }
    }

    /// Load the config at `path`, writing a default one there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid config file {:?}", path))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wordiary")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}
