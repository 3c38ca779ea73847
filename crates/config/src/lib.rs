//! Layered configuration.
//!
//! Values are merged from, in increasing priority:
//!
//! 1. built-in defaults,
//! 2. an optional config file (format picked by extension),
//! 3. environment variables prefixed with [`ENV_PREFIX`].
//!
//! ```
//! use contree_config::Config;
//!
//! let config = Config::default();
//! config.validate().unwrap();
//! assert_eq!(config.partial_marker, ".part");
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use contree_storage::path::is_valid_name;
use contree_storage::{CaseSensitivity, Options, PartialMarker};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables starting with this override file values, e.g.
/// `CONTREE_PARTIAL_MARKER=.!qB`.
pub const ENV_PREFIX: &str = "CONTREE_";

/// Case rule as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseRule {
    Sensitive,
    Insensitive,
    /// Whatever the compilation target's default file system does
    #[default]
    Host,
}

impl CaseRule {
    pub fn resolve(self) -> CaseSensitivity {
        match self {
            Self::Sensitive => CaseSensitivity::Sensitive,
            Self::Insensitive => CaseSensitivity::Insensitive,
            Self::Host => CaseSensitivity::host(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How paths are compared for identity
    pub case_sensitivity: CaseRule,
    /// Suffix marking a file as partially downloaded
    pub partial_marker: String,
    /// Replacement for illegal characters when sanitizing names
    pub pad: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            case_sensitivity: CaseRule::default(),
            partial_marker: contree_storage::path::DEFAULT_MARKER.to_string(),
            pad: " ".to_string(),
        }
    }
}

impl Config {
    /// The platform's default config file location, if it exists.
    pub fn discover() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("", "", "contree")?;
        let path = dirs.config_dir().join("config.toml");
        path.is_file().then_some(path)
    }

    /// Build the layered [`Figment`] without extracting it.
    ///
    /// # Errors
    /// - [`NotFound`](ErrorKind::NotFound) if `file` is given but missing.
    /// - [`UnsupportedFormat`](ErrorKind::UnsupportedFormat) for an unknown
    ///   extension.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load, merge and [validate](Self::validate) the configuration.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(file)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?file, ?config, "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.marker()?;
        if !self.pad.is_empty() && !is_valid_name(&self.pad, false) {
            exn::bail!(ErrorKind::InvalidValue("pad"));
        }
        Ok(())
    }

    pub fn marker(&self) -> Result<PartialMarker> {
        PartialMarker::new(self.partial_marker.as_str()).or_raise(|| ErrorKind::InvalidValue("partial_marker"))
    }

    /// The storage settings this configuration describes.
    pub fn options(&self) -> Result<Options> {
        Ok(Options::new(self.case_sensitivity.resolve(), self.marker()?))
    }
}
