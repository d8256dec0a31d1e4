//! Configuration types.
//!
//! Loaded once at startup from the process environment and passed by value
//! into each component constructor.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Slack Web API base URL.
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// Default lifetime of an ephemeral asset.
pub const DEFAULT_ASSET_TTL: Duration = Duration::from_secs(60);

/// How the emoji image is handed to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryProtocol {
    /// Publish to the asset store and register the public URL.
    #[default]
    UrlReference,
    /// Upload the PNG bytes inline as multipart form data.
    Multipart,
}

impl FromStr for RegistryProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "url" | "url_reference" => Ok(Self::UrlReference),
            "multipart" | "upload" => Ok(Self::Multipart),
            other => Err(format!("expected 'url' or 'multipart', got '{other}'")),
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bot credential used for history, downloads and posting.
    pub slack_token: SecretString,
    /// App-level credential used to open Socket Mode connections.
    pub slack_app_token: SecretString,
    /// Credential used for emoji registration (admin-scoped).
    pub admin_token: SecretString,
    /// Channel that receives "emoji added" announcements.
    pub announce_channel: String,
    /// Workspace admin identity.
    pub admin_user_id: String,
    /// Externally reachable base URL of the asset server.
    pub base_url: String,
    pub registry_protocol: RegistryProtocol,
    pub asset_dir: PathBuf,
    pub asset_port: u16,
    pub asset_ttl: Duration,
    pub slack_api_base: String,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let slack_token = required("SLACK_TOKEN")?;
        let slack_app_token = required("SLACK_APP_TOKEN")?;
        let announce_channel = required("SLACK_CHANNEL")?;
        let admin_user_id = required("ADMIN_USER_ID")?;
        let base_url = required("BASE_URL")?.trim_end_matches('/').to_string();

        let admin_token = lookup("SLACK_ADMIN_TOKEN")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| slack_token.clone());

        let registry_protocol =
            parse_optional::<RegistryProtocol, _>(&lookup, "EMOJI_REGISTRY_PROTOCOL")?
                .unwrap_or_default();
        let asset_port = parse_optional::<u16, _>(&lookup, "ASSET_PORT")?.unwrap_or(1234);
        let asset_ttl = parse_optional::<u64, _>(&lookup, "ASSET_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_ASSET_TTL);
        if asset_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "ASSET_TTL_SECS".into(),
                message: "must be greater than zero".into(),
            });
        }

        let asset_dir = lookup("ASSET_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("tmp"));

        let slack_api_base = lookup("SLACK_API_BASE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            slack_token: SecretString::from(slack_token),
            slack_app_token: SecretString::from(slack_app_token),
            admin_token: SecretString::from(admin_token),
            announce_channel,
            admin_user_id,
            base_url,
            registry_protocol,
            asset_dir,
            asset_port,
            asset_ttl,
            slack_api_base,
        })
    }
}

fn parse_optional<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SLACK_TOKEN", "xoxb-bot"),
            ("SLACK_APP_TOKEN", "xapp-app"),
            ("SLACK_CHANNEL", "C123"),
            ("ADMIN_USER_ID", "U999"),
            ("BASE_URL", "https://emoji.example.com/"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn loads_required_values_with_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.slack_token.expose_secret(), "xoxb-bot");
        assert_eq!(config.slack_app_token.expose_secret(), "xapp-app");
        assert_eq!(config.admin_token.expose_secret(), "xoxb-bot");
        assert_eq!(config.announce_channel, "C123");
        assert_eq!(config.admin_user_id, "U999");
        assert_eq!(config.base_url, "https://emoji.example.com");
        assert_eq!(config.registry_protocol, RegistryProtocol::UrlReference);
        assert_eq!(config.asset_dir, PathBuf::from("tmp"));
        assert_eq!(config.asset_port, 1234);
        assert_eq!(config.asset_ttl, Duration::from_secs(60));
        assert_eq!(config.slack_api_base, DEFAULT_SLACK_API_BASE);
    }

    #[test]
    fn missing_required_value_is_fatal() {
        for key in ["SLACK_TOKEN", "SLACK_APP_TOKEN", "SLACK_CHANNEL", "ADMIN_USER_ID", "BASE_URL"] {
            let mut env = base_env();
            env.remove(key);
            match load(&env) {
                Err(ConfigError::MissingEnvVar(k)) => assert_eq!(k, key),
                other => panic!("expected MissingEnvVar({key}), got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_required_value_counts_as_missing() {
        let mut env = base_env();
        env.insert("ADMIN_USER_ID", "  ");
        assert!(matches!(load(&env), Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn optional_overrides() {
        let mut env = base_env();
        env.insert("SLACK_ADMIN_TOKEN", "xoxp-admin");
        env.insert("EMOJI_REGISTRY_PROTOCOL", "multipart");
        env.insert("ASSET_PORT", "8088");
        env.insert("ASSET_TTL_SECS", "120");
        env.insert("ASSET_DIR", "/var/tmp/emoji");
        env.insert("SLACK_API_BASE", "http://127.0.0.1:9000/api/");

        let config = load(&env).unwrap();
        assert_eq!(config.admin_token.expose_secret(), "xoxp-admin");
        assert_eq!(config.registry_protocol, RegistryProtocol::Multipart);
        assert_eq!(config.asset_port, 8088);
        assert_eq!(config.asset_ttl, Duration::from_secs(120));
        assert_eq!(config.asset_dir, PathBuf::from("/var/tmp/emoji"));
        assert_eq!(config.slack_api_base, "http://127.0.0.1:9000/api");
    }

    #[test]
    fn admin_token_is_trimmed_like_required_values() {
        let mut env = base_env();
        env.insert("SLACK_ADMIN_TOKEN", " xoxp-admin\n");
        let config = load(&env).unwrap();
        assert_eq!(config.admin_token.expose_secret(), "xoxp-admin");

        env.insert("SLACK_ADMIN_TOKEN", " \n");
        let config = load(&env).unwrap();
        assert_eq!(config.admin_token.expose_secret(), "xoxb-bot");
    }

    #[test]
    fn invalid_optional_value_is_reported() {
        let mut env = base_env();
        env.insert("ASSET_PORT", "not-a-port");
        match load(&env) {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "ASSET_PORT"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }

        let mut env = base_env();
        env.insert("EMOJI_REGISTRY_PROTOCOL", "carrier-pigeon");
        assert!(matches!(load(&env), Err(ConfigError::InvalidValue { .. })));

        let mut env = base_env();
        env.insert("ASSET_TTL_SECS", "0");
        assert!(matches!(load(&env), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn registry_protocol_parses_aliases() {
        assert_eq!("URL".parse::<RegistryProtocol>(), Ok(RegistryProtocol::UrlReference));
        assert_eq!("upload".parse::<RegistryProtocol>(), Ok(RegistryProtocol::Multipart));
        assert!("ftp".parse::<RegistryProtocol>().is_err());
    }
}
