//! Configuration management for the content store
//!
//! Values come from built-in defaults, an optional `config.toml`, and
//! environment overrides such as `CONTENTS__POLICY__ALLOW_HIDDEN=true`.
//! Root directories are read once; changing them needs a restart.

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::path::PathBuf;

use crate::notebook::DEFAULT_SIGNATURE_CACHE_SIZE;
use crate::policy::{DEFAULT_CHECKPOINT_DIR, DEFAULT_HIDE_GLOBS};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "CONTENTS";

/// Complete store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub roots: RootsConfig,
    pub backend: BackendConfig,
    pub policy: PolicyConfig,
}

/// Physical roots of the namespace
#[derive(Debug, Deserialize, Clone)]
pub struct RootsConfig {
    /// Private root; derived from `root_dir_template` when empty
    pub root_dir: String,

    /// Template for `root_dir`, `{username}` is substituted
    pub root_dir_template: String,

    /// Overrides the login name used by the template
    pub username: Option<String>,

    /// Root served under the `shared` prefix
    pub shared_dir: String,

    /// Create the private root at startup if missing
    pub create_root_dir_on_startup: bool,
}

/// Backend location
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Local directory holding the physical namespace
    pub base_dir: String,
}

/// Serving policy
#[derive(Debug, Deserialize, Clone)]
pub struct PolicyConfig {
    /// Serve and create hidden entries
    pub allow_hidden: bool,

    /// Child name reserved by checkpoint storage
    pub checkpoint_dir: String,

    /// Names left out of directory listings
    pub hide_globs: Vec<String>,

    /// Most notebook trust signatures remembered before the oldest are dropped
    pub signature_cache_size: usize,
}

impl StoreConfig {
    /// Load from `config.toml` (if present) with environment overrides.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::build(
            Self::defaults()?
                .add_source(File::with_name("config").required(false))
                .add_source(env_source()),
        )
    }

    /// Load from TOML text layered over the defaults. Environment is ignored.
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        Self::build(Self::defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        Config::builder()
            .set_default("roots.root_dir", "")?
            .set_default("roots.root_dir_template", "/user/{username}/notebooks")?
            .set_default("roots.shared_dir", "/user/jupyter/notebooks")?
            .set_default("roots.create_root_dir_on_startup", true)?
            .set_default("backend.base_dir", "./contents_data")?
            .set_default("policy.allow_hidden", false)?
            .set_default("policy.checkpoint_dir", DEFAULT_CHECKPOINT_DIR)?
            .set_default("policy.signature_cache_size", DEFAULT_SIGNATURE_CACHE_SIZE as u64)?
            .set_default(
                "policy.hide_globs",
                DEFAULT_HIDE_GLOBS.iter().map(|g| g.to_string()).collect::<Vec<_>>(),
            )
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, config::ConfigError> {
        let config: StoreConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), config::ConfigError> {
        let root_dir = self.roots.resolved_root_dir();
        let shared_dir = self.roots.shared_dir.trim_end_matches('/');
        let root_dir = root_dir.trim_end_matches('/');

        for (name, dir) in [("root_dir", root_dir), ("shared_dir", shared_dir)] {
            if dir.is_empty() {
                return Err(config::ConfigError::Message(format!(
                    "{} cannot be empty or the filesystem root",
                    name
                )));
            }
            if !dir.starts_with('/') {
                return Err(config::ConfigError::Message(format!(
                    "{} must be an absolute path: {}",
                    name, dir
                )));
            }
        }

        if root_dir == shared_dir {
            return Err(config::ConfigError::Message(
                "root_dir and shared_dir must differ".into(),
            ));
        }
        if is_nested(root_dir, shared_dir) || is_nested(shared_dir, root_dir) {
            return Err(config::ConfigError::Message(
                "root_dir and shared_dir must not be nested".into(),
            ));
        }

        if self.policy.checkpoint_dir.contains('/') {
            return Err(config::ConfigError::Message(
                "checkpoint_dir must be a single path segment".into(),
            ));
        }

        for raw in &self.policy.hide_globs {
            if let Err(e) = glob::Pattern::new(raw) {
                return Err(config::ConfigError::Message(format!(
                    "invalid hide_globs pattern {:?}: {}",
                    raw, e
                )));
            }
        }

        if self.policy.signature_cache_size == 0 {
            return Err(config::ConfigError::Message(
                "signature_cache_size must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

impl RootsConfig {
    /// Private root after template substitution
    pub fn resolved_root_dir(&self) -> String {
        if !self.root_dir.is_empty() {
            return self.root_dir.clone();
        }
        let username = self.username.clone().unwrap_or_else(current_username);
        self.root_dir_template.replace("{username}", &username)
    }
}

impl BackendConfig {
    pub fn base_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.base_dir)
    }
}

/// Login name from the environment, as a shell would report it.
pub fn current_username() -> String {
    ["LOGNAME", "USER", "LNAME", "USERNAME"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "user".to_string())
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("policy.hide_globs")
}

fn is_nested(outer: &str, inner: &str) -> bool {
    inner
        .strip_prefix(outer)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_toml_str("[roots]\nusername = \"alice\"\n").unwrap();
        assert_eq!(config.roots.resolved_root_dir(), "/user/alice/notebooks");
        assert_eq!(config.roots.shared_dir, "/user/jupyter/notebooks");
        assert!(config.roots.create_root_dir_on_startup);
        assert!(!config.policy.allow_hidden);
        assert_eq!(config.policy.checkpoint_dir, ".ipynb_checkpoints");
        assert_eq!(config.policy.hide_globs.len(), 7);
        assert_eq!(config.backend.base_dir, "./contents_data");
        assert_eq!(config.policy.signature_cache_size, DEFAULT_SIGNATURE_CACHE_SIZE);
    }

    #[test]
    fn test_explicit_values() {
        let config = StoreConfig::from_toml_str(
            r#"
            [roots]
            root_dir = "/data/private"
            shared_dir = "/data/shared"

            [policy]
            allow_hidden = true
            hide_globs = ["*.tmp"]
            "#,
        )
        .unwrap();
        assert_eq!(config.roots.resolved_root_dir(), "/data/private");
        assert!(config.policy.allow_hidden);
        assert_eq!(config.policy.hide_globs, vec!["*.tmp"]);
    }

    #[test]
    fn test_rejects_nested_or_equal_roots() {
        let nested = "[roots]\nroot_dir = \"/data\"\nshared_dir = \"/data/shared\"\n";
        assert!(StoreConfig::from_toml_str(nested).is_err());

        let equal = "[roots]\nroot_dir = \"/data/x/\"\nshared_dir = \"/data/x\"\n";
        assert!(StoreConfig::from_toml_str(equal).is_err());

        let siblings = "[roots]\nroot_dir = \"/data/x\"\nshared_dir = \"/data/xy\"\n";
        assert!(StoreConfig::from_toml_str(siblings).is_ok());
    }

    #[test]
    fn test_rejects_invalid_policy() {
        let bad_glob = "[policy]\nhide_globs = [\"[oops\"]\n";
        let err = StoreConfig::from_toml_str(bad_glob).unwrap_err();
        assert!(err.to_string().contains("hide_globs"));

        let no_cache = "[policy]\nsignature_cache_size = 0\n";
        assert!(StoreConfig::from_toml_str(no_cache).is_err());
    }

    #[test]
    fn test_rejects_relative_or_root_dirs() {
        let relative = "[roots]\nroot_dir = \"data/x\"\n";
        assert!(StoreConfig::from_toml_str(relative).is_err());

        let slash = "[roots]\nroot_dir = \"/\"\n";
        assert!(StoreConfig::from_toml_str(slash).is_err());
    }
}
