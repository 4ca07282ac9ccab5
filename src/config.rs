//! User configuration loaded from `<config_dir>/stream-scout/config.toml`.

use crate::catalog::{CatalogError, Endpoints, ProviderCatalog, ProviderSpec};
use crate::resolver::{DEFAULT_LOAD_TIMEOUT, DEFAULT_MAX_RETRIES_PER_PROVIDER, ResolverOptions};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable overriding `tmdb_api_key`
pub const TMDB_API_KEY_ENV: &str = "STREAM_SCOUT_TMDB_API_KEY";
/// Environment variable overriding `watchmode_api_key`
pub const WATCHMODE_API_KEY_ENV: &str = "STREAM_SCOUT_WATCHMODE_API_KEY";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine the platform config directory
    #[error("Failed to determine config directory")]
    NoConfigDir,

    /// Failed to read the config file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unexpected fields
    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A provider entry names both `domain` and `mirrors`, or neither
    #[error("Provider '{0}' needs exactly one of `domain` or `mirrors`")]
    AmbiguousEndpoints(String),

    /// `load_timeout_secs` is zero, which would fail every load at once
    #[error("load_timeout_secs must be at least 1")]
    ZeroLoadTimeout,

    /// The configured providers do not form a valid catalog
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// A `[[providers]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderEntry {
    pub id: String,
    /// Display name, defaults to the id
    pub name: Option<String>,
    /// Single domain
    pub domain: Option<String>,
    /// Ordered mirror domains
    pub mirrors: Option<Vec<String>>,
    /// Movie URL template
    pub movie: Option<String>,
    /// TV URL template
    pub tv: Option<String>,
    pub subtitle_param: Option<String>,
}

impl ProviderEntry {
    fn to_spec(&self) -> Result<ProviderSpec, ConfigError> {
        let endpoints = match (&self.domain, &self.mirrors) {
            (Some(domain), None) => Endpoints::Single(domain.clone()),
            (None, Some(mirrors)) => Endpoints::MultiMirror(mirrors.clone()),
            _ => return Err(ConfigError::AmbiguousEndpoints(self.id.clone())),
        };

        let mut spec = ProviderSpec::new(
            self.id.clone(),
            self.name.clone().unwrap_or_else(|| self.id.clone()),
            endpoints,
        );
        if let Some(movie) = &self.movie {
            spec = spec.with_movie(movie.clone());
        }
        if let Some(tv) = &self.tv {
            spec = spec.with_tv(tv.clone());
        }
        if let Some(param) = &self.subtitle_param {
            spec = spec.with_subtitle_param(param.clone());
        }
        Ok(spec)
    }
}

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub tmdb_api_key: Option<String>,
    pub watchmode_api_key: Option<String>,
    /// Metadata language, e.g. `en-US`
    pub language: Option<String>,
    /// Default subtitle language passed to providers that support it
    pub subtitle_language: Option<String>,
    pub max_retries_per_provider: Option<u32>,
    pub load_timeout_secs: Option<u64>,
    /// Base URL share links are built on
    pub share_base_url: Option<Url>,
    /// Replaces the built-in catalog when non-empty
    pub providers: Vec<ProviderEntry>,
}

impl Settings {
    /// Loads settings from `path`, or from the default location when `None`.
    ///
    /// A missing file yields defaults. Environment overrides are applied in
    /// both cases.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut settings = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Path of the default config file
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("", "", "stream-scout").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Parses a config file without applying environment overrides
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overrides API keys from the environment; empty values are ignored
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = lookup(TMDB_API_KEY_ENV) {
            self.tmdb_api_key = Some(key);
        }
        if let Some(key) = lookup(WATCHMODE_API_KEY_ENV) {
            self.watchmode_api_key = Some(key);
        }
    }

    /// Builds the provider catalog, falling back to the built-in one
    pub fn catalog(&self) -> Result<ProviderCatalog, ConfigError> {
        if self.providers.is_empty() {
            return Ok(ProviderCatalog::builtin());
        }

        let specs = self
            .providers
            .iter()
            .map(ProviderEntry::to_spec)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProviderCatalog::new(specs)?)
    }

    /// Resolver options from the config; a zero load timeout is rejected
    pub fn resolver_options(&self) -> Result<ResolverOptions, ConfigError> {
        let load_timeout = match self.load_timeout_secs {
            Some(0) => return Err(ConfigError::ZeroLoadTimeout),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_LOAD_TIMEOUT,
        };

        Ok(ResolverOptions {
            max_retries_per_provider: self
                .max_retries_per_provider
                .unwrap_or(DEFAULT_MAX_RETRIES_PER_PROVIDER),
            subtitle_language: self.subtitle_language.clone().filter(|l| !l.is_empty()),
            load_timeout,
        })
    }
}
