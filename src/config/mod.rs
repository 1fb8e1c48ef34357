//! Persisted configuration and credential resolution.
//!
//! Config file: `~/.iris/config.yaml` (or `--config` / `IRIS_CONFIG`).
//! Credentials: flag > environment (`IRIS_API_KEY`, `IRIS_USER_ID`) > config file.
//! Base URL:    flag > `IRIS_BASE_URL` > config file > built-in default.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::dispatch::Policy;

pub const DEFAULT_BASE_URL: &str = "https://api.heyiris.io";

pub const ENV_API_KEY: &str = "IRIS_API_KEY";
pub const ENV_USER_ID: &str = "IRIS_USER_ID";
pub const ENV_BASE_URL: &str = "IRIS_BASE_URL";
pub const ENV_CONFIG: &str = "IRIS_CONFIG";

/// `~/.iris/`
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".iris"))
}

/// `~/.iris/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.yaml"))
}

/// Contents of the config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub user_id: Option<i64>,
    pub base_url: Option<String>,
    /// Fail instead of opening sub-resources with missing arguments.
    pub strict_accessors: bool,
    /// Replacement API catalog.
    pub catalog: Option<PathBuf>,
    /// Extra `aliases` / `global_endpoints`, layered over the built-ins.
    #[serde(flatten)]
    pub policy: Policy,
}

impl Config {
    /// Load from an explicit path (must exist) or the default location
    /// (missing file -> defaults).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("invalid config: {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("failed to parse config YAML")
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CredentialFlags {
    pub api_key: Option<String>,
    pub user_id: Option<i64>,
    pub base_url: Option<String>,
}

/// Resolved identity and endpoint for this process.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    api_key: Option<String>,
    user_id: Option<i64>,
    pub base_url: Url,
}

impl Credentials {
    pub fn resolve(flags: &CredentialFlags, config: &Config) -> Result<Self> {
        Self::resolve_with(flags, config, |k| std::env::var(k).ok())
    }

    /// Resolution with an injectable environment lookup.
    pub fn resolve_with<F>(flags: &CredentialFlags, config: &Config, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |k: &str| env(k).filter(|v| !v.trim().is_empty());

        let api_key = flags
            .api_key
            .clone()
            .or_else(|| env(ENV_API_KEY))
            .or_else(|| config.api_key.clone());

        let user_id = match (flags.user_id, env(ENV_USER_ID)) {
            (Some(id), _) => Some(id),
            (None, Some(raw)) => Some(
                raw.trim()
                    .parse::<i64>()
                    .with_context(|| format!("{ENV_USER_ID} must be an integer, got '{raw}'"))?,
            ),
            (None, None) => config.user_id,
        };

        let base_raw = flags
            .base_url
            .clone()
            .or_else(|| env(ENV_BASE_URL))
            .or_else(|| config.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key,
            user_id,
            base_url: parse_base_url(&base_raw)?,
        })
    }

    pub fn current_user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn current_api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

/// Validate an API base URL: http(s) only, no query or fragment.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("base URL is empty");
    }
    let url = Url::parse(trimmed).with_context(|| format!("invalid base URL '{trimmed}'"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => bail!("unsupported base URL scheme '{other}' (expected http or https)"),
    }
    if url.query().is_some() || url.fragment().is_some() {
        bail!("base URL must not carry a query or fragment: '{trimmed}'");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn flag_beats_env_beats_config() {
        let config = Config {
            api_key: Some("from-config".into()),
            user_id: Some(3),
            ..Default::default()
        };
        let env = env_of(&[(ENV_API_KEY, "from-env"), (ENV_USER_ID, "5")]);

        let flags = CredentialFlags {
            api_key: Some("from-flag".into()),
            user_id: Some(9),
            base_url: None,
        };
        let c = Credentials::resolve_with(&flags, &config, &env).unwrap();
        assert_eq!(c.current_api_key(), Some("from-flag"));
        assert_eq!(c.current_user_id(), Some(9));

        let c = Credentials::resolve_with(&CredentialFlags::default(), &config, &env).unwrap();
        assert_eq!(c.current_api_key(), Some("from-env"));
        assert_eq!(c.current_user_id(), Some(5));

        let c = Credentials::resolve_with(&CredentialFlags::default(), &config, env_of(&[])).unwrap();
        assert_eq!(c.current_api_key(), Some("from-config"));
        assert_eq!(c.current_user_id(), Some(3));
        assert_eq!(c.base_url.as_str(), "https://api.heyiris.io/");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = Config {
            user_id: Some(3),
            ..Default::default()
        };
        let env = env_of(&[(ENV_USER_ID, "  ")]);
        let c = Credentials::resolve_with(&CredentialFlags::default(), &config, env).unwrap();
        assert_eq!(c.current_user_id(), Some(3));
    }

    #[test]
    fn bad_env_user_id_is_an_error() {
        let env = env_of(&[(ENV_USER_ID, "abc")]);
        let err = Credentials::resolve_with(&CredentialFlags::default(), &Config::default(), env)
            .unwrap_err();
        assert!(err.to_string().contains(ENV_USER_ID));
    }

    #[test]
    fn base_url_validation() {
        assert!(parse_base_url("https://api.example.test").is_ok());
        assert!(parse_base_url("http://localhost:8000").is_ok());
        assert!(parse_base_url("ftp://example.test").is_err());
        assert!(parse_base_url("https://x.test/?a=1").is_err());
        assert!(parse_base_url("   ").is_err());
    }

    #[test]
    fn config_yaml_with_policy_overrides() {
        let cfg = Config::from_yaml_str(
            r#"
api_key: sk_test
user_id: 42
strict_accessors: true
aliases:
  agents.chat:
    msg: message
global_endpoints: [agents.list]
"#,
        )
        .unwrap();
        assert_eq!(cfg.user_id, Some(42));
        assert!(cfg.strict_accessors);
        assert!(cfg.policy.is_global("agents.list"));
        assert_eq!(
            cfg.policy.aliases_for("agents.chat").and_then(|t| t.get("msg")),
            Some(&"message".to_string())
        );
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(Config::load(Some(missing.as_path())).is_err());
    }
}
