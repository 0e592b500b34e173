//! Configuration for the video proxy cache.
//!
//! Values are layered with [`figment`], later layers winning:
//!
//! 1. built-in defaults,
//! 2. `vcache.toml`, `vcache.yaml` and `vcache.json` in the platform config
//!    directory,
//! 3. a file passed explicitly by the caller,
//! 4. `VCACHE_*` environment variables (e.g. `VCACHE_MAX_CACHE_SIZE`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vcache_keys::{DEFAULT_GARBLE_THRESHOLD, GarbleDetector};
use vcache_storage::{LockStrategy, MetadataStore};

/// Name of the hidden directory, inside the platform cache area, used as
/// the cache root when none is configured.
pub const CACHE_DIR_NAME: &str = ".local";
/// 2 GiB
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 2 * 1024 * 1024 * 1024;
const ENV_PREFIX: &str = "VCACHE_";
const FILE_STEM: &str = "vcache";

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one subdirectory per cached resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_root: Option<PathBuf>,
    /// Eviction budget, in bytes.
    pub max_cache_size: u64,
    /// Noise ratio above which decoded filenames are considered garbled.
    pub garble_threshold: f32,
    pub lock: LockStrategy,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            cache_root: None,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            garble_threshold: DEFAULT_GARBLE_THRESHOLD,
            lock: LockStrategy::default(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", FILE_STEM)
}

impl Config {
    /// Load configuration from every layer, optionally including `explicit`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(explicit)?.extract().map_err(|e| ErrorKind::Invalid(e.to_string()))?;
        config.validate()?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// The layered [`Figment`] that [`load`](Self::load) extracts from.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dirs) = project_dirs() {
            let dir = dirs.config_dir();
            tracing::trace!(dir = %dir.display(), "Searching for configuration files");
            figment = figment
                .merge(Toml::file(dir.join(format!("{FILE_STEM}.toml"))))
                .merge(Yaml::file(dir.join(format!("{FILE_STEM}.yaml"))))
                .merge(Json::file(dir.join(format!("{FILE_STEM}.json"))));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.garble_threshold > 0.0 && self.garble_threshold <= 1.0) {
            exn::bail!(ErrorKind::Invalid(format!(
                "garble_threshold must be within (0, 1], got {}",
                self.garble_threshold
            )));
        }
        if self.max_cache_size == 0 {
            exn::bail!(ErrorKind::Invalid("max_cache_size must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Resolve the cache root without creating it.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.cache_root {
            return Ok(root.clone());
        }
        match project_dirs() {
            Some(dirs) => Ok(dirs.cache_dir().join(CACHE_DIR_NAME)),
            None => exn::bail!(ErrorKind::NoCacheRoot),
        }
    }

    /// Resolve the cache root, creating it if needed.
    pub fn ensure_cache_dir(&self) -> Result<PathBuf> {
        let dir = self.cache_dir()?;
        std::fs::create_dir_all(&dir).or_raise(|| ErrorKind::CreateCacheDir(dir.clone()))?;
        Ok(dir)
    }

    pub fn garble_detector(&self) -> GarbleDetector {
        GarbleDetector::new(self.garble_threshold)
    }

    pub fn metadata_store(&self) -> MetadataStore {
        MetadataStore::new(self.lock)
    }
}
