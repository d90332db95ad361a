use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use url::Url;

pub const DEFAULT_API_BASE: &str = "http://localhost:3000/api/collab";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the document API, e.g. `http://localhost:3000/api/collab`
    pub api_base: Url,
    /// Origin prepended to share links
    pub origin: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    pub request_timeout: Duration,
    /// Directory receiving the rolling log files
    pub log_dir: PathBuf,
}

impl Config {
    /// Reads `COLLAB_*` variables, after loading a `.env` file when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_base = parse_http_url(
            "COLLAB_API_BASE",
            &env_str(&lookup, "COLLAB_API_BASE", DEFAULT_API_BASE),
        )?;

        let origin = match lookup("COLLAB_ORIGIN") {
            Some(origin) => {
                let parsed = parse_http_url("COLLAB_ORIGIN", &origin)?;
                parsed.as_str().trim_end_matches('/').to_string()
            }
            None => api_base.origin().ascii_serialization(),
        };

        let timeout_secs = env_parse(&lookup, "COLLAB_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(anyhow!("COLLAB_TIMEOUT_SECS must be at least 1"));
        }

        let log_dir = match lookup("COLLAB_LOG_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_log_dir(),
        };

        Ok(Self {
            api_base,
            origin,
            token: lookup("COLLAB_TOKEN").filter(|token| !token.trim().is_empty()),
            request_timeout: Duration::from_secs(timeout_secs),
            log_dir,
        })
    }
}

fn default_log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("collab-zone")
}

fn parse_http_url(key: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value.trim())
        .with_context(|| format!("{key} is not a valid URL: {value}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!("{key} must use http or https, got '{other}'")),
    }
}

fn env_str(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Failed to parse env var {key}={val}: {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_point_at_local_server() {
        let config = config(&[]).unwrap();
        assert_eq!(config.api_base.as_str(), DEFAULT_API_BASE);
        assert_eq!(config.origin, "http://localhost:3000");
        assert_eq!(config.token, None);
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert!(config.log_dir.ends_with("collab-zone"));
    }

    #[test]
    fn origin_follows_api_base_unless_overridden() {
        let derived =
            config(&[("COLLAB_API_BASE", "https://api.example.com:8443/api/collab")]).unwrap();
        assert_eq!(derived.origin, "https://api.example.com:8443");

        let explicit = config(&[
            ("COLLAB_API_BASE", "https://api.example.com/api/collab"),
            ("COLLAB_ORIGIN", "https://app.example.com/"),
            ("COLLAB_TOKEN", "secret"),
        ])
        .unwrap();
        assert_eq!(explicit.origin, "https://app.example.com");
        assert_eq!(explicit.token.as_deref(), Some("secret"));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(config(&[("COLLAB_API_BASE", "not a url")]).is_err());
        assert!(config(&[("COLLAB_API_BASE", "ftp://example.com/api")]).is_err());
        assert!(config(&[("COLLAB_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config(&[("COLLAB_TIMEOUT_SECS", "0")]).is_err());
    }
}
