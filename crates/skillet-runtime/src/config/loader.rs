//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config`: enables `skillet.toml` files
//! - `yaml-config`: enables `skillet.yaml` / `skillet.yml` files
//!
//! With both enabled, both formats are searched and merged.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic overrides passed to [`ConfigLoader::merge`]
//! 3. Profile-specific file (`skillet.{profile}.toml`)
//! 4. Main file (`skillet.toml`)
//! 5. Environment variables (`SKILLET_*`)
//!
//! # Environment Variable Mapping
//!
//! Variables use the `SKILLET_` prefix with `__` as the nesting separator:
//!
//! - `SKILLET_SKILL__SKILL_ID=amzn1.ask.skill.42` → `skill.skill_id`
//! - `SKILLET_LOGGING__LEVEL=debug` → `logging.level`
//!
//! `SKILLET_PROFILE` selects the profile and is not part of the document.
//!
//! # Example
//!
//! ```rust,ignore
//! use skillet_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/skillet.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::SkilletConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "SKILLET_";
const PROFILE_VAR: &str = "SKILLET_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Reads `SKILLET_PROFILE`, defaulting to [`Profile::Development`].
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }

    fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load, bypassing the search.
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to the search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds `<user config dir>/skillet` to the search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("skillet"))
        } else {
            self
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a configuration value over the built-in defaults.
    ///
    /// Files and environment variables still take precedence.
    pub fn merge(mut self, config: SkilletConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration without validating it.
    pub fn load(self) -> ConfigResult<SkilletConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: SkilletConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;

        debug!(
            profile = %profile,
            skill_id = ?config.skill.skill_id,
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(SkilletConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["profile"]).split("__"));
        }

        Ok(figment)
    }

    /// Merges one file, choosing the format from its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("skillet"));
        }
        paths
    }

    /// Walks `search_paths × base_names`, merging the profile variant and then
    /// the base file. Stops at the first base file found.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path =
                    search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    return (merge_fn(figment, &base_path), true);
                }
            }
        }
        (figment, false)
    }

    #[cfg_attr(
        not(any(feature = "toml-config", feature = "yaml-config")),
        allow(unused_mut)
    )]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) =
                self.load_format_files(figment, &search_paths, &["skillet.toml"], |fig, path| {
                    fig.merge(Toml::file(path))
                });
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["skillet.yaml", "skillet.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!(paths = ?search_paths, "No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads and validates the configuration from the default locations.
pub fn load_config() -> ConfigResult<SkilletConfig> {
    let config = ConfigLoader::new().load()?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads and validates the configuration from `path`, with environment
/// overrides applied.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<SkilletConfig> {
    let config = ConfigLoader::new().file(path).load()?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use tokio_test::assert_err;

    fn isolated() -> (tempfile::TempDir, ConfigLoader) {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new().without_env().search_path(dir.path());
        (dir, loader)
    }

    #[test]
    fn test_default_config() {
        let (_dir, loader) = isolated();
        let config = loader.load().unwrap();

        assert_eq!(config.logging.level.as_str(), "info");
        assert_eq!(config.skill.skill_id, None);
    }

    #[test]
    fn test_profile_from_env() {
        // SAFETY: no other test reads or writes SKILLET_PROFILE concurrently
        unsafe {
            std::env::set_var(PROFILE_VAR, "prod");
        }
        let profile = Profile::from_env();
        unsafe {
            std::env::remove_var(PROFILE_VAR);
        }
        assert_eq!(profile, Profile::Production);
        assert_eq!(Profile::parse("Staging"), Profile::Custom("staging".into()));
    }

    #[test]
    fn programmatic_merge_overrides_defaults() {
        let (_dir, loader) = isolated();
        let mut overrides = SkilletConfig::default();
        overrides.skill.skill_id = Some("amzn1.ask.skill.merged".into());
        overrides.logging.level = LogLevel::Warn;

        let config = loader.merge(overrides).load().unwrap();

        assert_eq!(config.skill.skill_id.as_deref(), Some("amzn1.ask.skill.merged"));
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn env_variables_override_nested_keys() {
        // SAFETY: the variable is unique to this test
        unsafe {
            std::env::set_var("SKILLET_LOGGING__FILE_LOCATION", "true");
        }
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::new().search_path(dir.path()).load();
        unsafe {
            std::env::remove_var("SKILLET_LOGGING__FILE_LOCATION");
        }

        assert!(config.unwrap().logging.file_location);
    }

    #[test]
    fn missing_explicit_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let error = assert_err!(ConfigLoader::new().without_env().file(&path).load());
        assert!(matches!(error, ConfigError::FileNotFound(p) if p == path));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skillet.ini");
        std::fs::write(&path, "level=debug").unwrap();

        let error = assert_err!(ConfigLoader::new().without_env().file(&path).load());
        assert!(matches!(error, ConfigError::ParseError(message) if message.contains(".ini")));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn searched_file_wins_over_profile_file() {
        let (dir, loader) = isolated();
        std::fs::write(
            dir.path().join("skillet.production.toml"),
            "[skill]\nskill_id = \"from-profile\"\n[logging]\nthread_ids = true\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("skillet.toml"),
            "[skill]\nskill_id = \"from-base\"\n",
        )
        .unwrap();

        let config = loader.profile("production").load().unwrap();

        assert_eq!(config.skill.skill_id.as_deref(), Some("from-base"));
        assert!(config.logging.thread_ids);
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn load_config_from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skillet.toml");
        std::fs::write(&path, "[skill]\nskill_id = \"   \"\n").unwrap();

        let error = assert_err!(load_config_from_file(&path));
        assert!(matches!(error, ConfigError::ValidationError { .. }));
    }
}
