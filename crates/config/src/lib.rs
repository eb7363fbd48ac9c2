//! Layered configuration for mipmap.
//!
//! Values are resolved in order, later layers overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A configuration file: TOML, YAML or JSON, chosen by extension. Defaults
//!    to `mipmap.toml` in the platform configuration directory, which may be
//!    absent.
//! 3. Environment variables prefixed with `MIPMAP_`, nested with `__`
//!    (`MIPMAP_GALLERY__COLUMNS=3`).

pub mod error;
mod layout;

pub use crate::layout::{COLUMN_CHOICES, GAP_CHOICES, GalleryLayout};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "MIPMAP_";
pub const DEFAULT_FILE_NAME: &str = "mipmap.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "mipmap")
}

/// How artifacts are produced by the external transcoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Transcoder program; searched for on `PATH` when not a path itself.
    /// When unset, `magick` and then `convert` are tried.
    pub program: Option<String>,
    /// Argument templates. `{{ input }}`, `{{ output }}` and `{{ width }}`
    /// are substituted per asset.
    pub args: Vec<String>,
    /// File extension of generated artifacts.
    pub extension: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: ["{{ input }}", "-auto-orient", "-thumbnail", "{{ width }}x", "{{ output }}"]
                .map(String::from)
                .to_vec(),
            extension: "jpg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding enumeration state and cache entries.
    pub database: PathBuf,
    /// Directory generated artifacts are written to.
    pub artifacts: PathBuf,
    pub page_size: u32,
    pub batch_size: usize,
    /// Stop enumerating after this many assets.
    pub max_assets: Option<u64>,
    /// Default log filter, used when `RUST_LOG` is not set.
    pub log_level: String,
    pub gallery: GalleryLayout,
    pub generator: GeneratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        let dirs = project_dirs();
        Self {
            database: dirs.as_ref().map_or_else(|| PathBuf::from("mipmap.db"), |d| d.data_dir().join("mipmap.db")),
            artifacts: dirs.as_ref().map_or_else(|| PathBuf::from("artifacts"), |d| d.cache_dir().join("artifacts")),
            page_size: 50,
            batch_size: 8,
            max_assets: None,
            log_level: "info".to_string(),
            gallery: GalleryLayout::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Config {
    /// Default location of the configuration file, if the platform has one.
    pub fn default_file() -> Option<PathBuf> {
        project_dirs().map(|d| d.config_dir().join(DEFAULT_FILE_NAME))
    }

    /// The layered configuration sources, without extracting them.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = match file.extension().and_then(|e| e.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => figment.merge(Toml::file(file)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate the configuration.
    ///
    /// An explicitly given `file` must exist; the default file is optional.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(file) if !file.exists() => exn::bail!(ErrorKind::NotFound(file.display().to_string())),
            Some(file) => Some(file.to_path_buf()),
            None => Self::default_file().filter(|f| f.exists()),
        };
        match &file {
            Some(file) => tracing::debug!(file = %file.display(), "Loading configuration"),
            None => tracing::debug!("No configuration file; using defaults and environment"),
        }
        let config: Config = Self::figment(file.as_deref()).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            exn::bail!(ErrorKind::Invalid("page size must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            exn::bail!(ErrorKind::Invalid("batch size must be at least 1".to_string()));
        }
        if self.generator.extension.is_empty() || self.generator.extension.contains(['.', '/']) {
            exn::bail!(ErrorKind::Invalid(format!("bad artifact extension {:?}", self.generator.extension)));
        }
        self.gallery.validate()
    }
}
