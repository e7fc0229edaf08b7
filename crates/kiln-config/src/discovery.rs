//! Locating and layering configuration sources.
//!
//! Lookup order inside a project root:
//! 1. `kiln.toml`
//! 2. the `"kiln"` field of `package.json`
//!
//! The chosen source sits between the built-in defaults and `KILN_*`
//! environment variables (`KILN_PATHS__OUTPUT=out` sets `paths.output`).

use std::fs;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml};
use serde_json::Value;
use tracing::debug;

use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};
use crate::validation::validate;

pub const CONFIG_FILE: &str = "kiln.toml";
pub const PACKAGE_FIELD: &str = "kiln";
pub const ENV_PREFIX: &str = "KILN_";

/// A configuration source that was found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Toml(PathBuf),
    PackageJson(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Toml(p) | ConfigSource::PackageJson(p) => p,
        }
    }

    /// Directory relative paths in the config are anchored at.
    pub fn base_dir(&self) -> PathBuf {
        self.path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub struct ConfigDiscovery {
    root: PathBuf,
    explicit: Option<PathBuf>,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            explicit: None,
        }
    }

    /// Use this file instead of searching the root.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.explicit = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn find(&self) -> Option<ConfigSource> {
        if let Some(path) = &self.explicit {
            return Some(classify(path));
        }

        let toml_path = self.root.join(CONFIG_FILE);
        if toml_path.is_file() {
            return Some(ConfigSource::Toml(toml_path));
        }

        let pkg_path = self.root.join("package.json");
        let has_field = fs::read_to_string(&pkg_path)
            .ok()
            .and_then(|content| serde_json::from_str::<Value>(&content).ok())
            .is_some_and(|pkg| pkg.get(PACKAGE_FIELD).is_some_and(|v| !v.is_null()));
        has_field.then_some(ConfigSource::PackageJson(pkg_path))
    }

    /// Defaults, then the discovered source, then the environment. Callers may
    /// merge further providers (CLI flags) before handing it to
    /// [`KilnConfig::from_figment`].
    pub fn figment(&self) -> Result<(Figment, ConfigSource)> {
        let source = self
            .find()
            .ok_or_else(|| ConfigError::NotFound(self.root.clone()))?;
        if !source.path().is_file() {
            return Err(ConfigError::NotFound(source.path().to_path_buf()));
        }
        debug!(path = %source.path().display(), "loading config");

        let figment = Figment::from(Serialized::defaults(KilnConfig::default()));
        let figment = match &source {
            ConfigSource::Toml(path) => figment.merge(Toml::file(path)),
            ConfigSource::PackageJson(path) => {
                figment.merge(Json::string(&package_field(path)?))
            }
        };
        let figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Ok((figment, source))
    }

    pub fn load(&self) -> Result<KilnConfig> {
        let (figment, source) = self.figment()?;
        KilnConfig::from_figment(&figment, &source.base_dir())
    }
}

impl KilnConfig {
    /// Extract, anchor relative paths at `base`, and validate.
    pub fn from_figment(figment: &Figment, base: &Path) -> Result<Self> {
        let config: KilnConfig = figment.extract()?;
        let config = config.resolve_paths(base);
        validate(&config)?;
        Ok(config)
    }
}

fn classify(path: &Path) -> ConfigSource {
    if path.file_name().is_some_and(|n| n == "package.json") {
        ConfigSource::PackageJson(path.to_path_buf())
    } else {
        ConfigSource::Toml(path.to_path_buf())
    }
}

fn package_field(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)?;
    let parsed: Value = serde_json::from_str(&content).map_err(|e| ConfigError::InvalidValue {
        field: "package.json".to_string(),
        hint: Some(format!("invalid JSON: {e}")),
    })?;

    match parsed.get(PACKAGE_FIELD) {
        Some(value) if value.is_object() => Ok(value.to_string()),
        Some(_) => Err(ConfigError::InvalidValue {
            field: PACKAGE_FIELD.to_string(),
            hint: Some("the 'kiln' field must be an object".to_string()),
        }),
        None => Err(ConfigError::InvalidValue {
            field: PACKAGE_FIELD.to_string(),
            hint: Some("add a 'kiln' field to package.json".to_string()),
        }),
    }
}
