use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use tracing::info;

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

const DEFAULT_REDIRECT_URL: &str = "http://localhost:5000/api/callback";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Provider base URL without a trailing slash.
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub environment: Environment,
    pub static_dir: Option<PathBuf>,
    pub oidc: Option<OidcConfig>,
    pub default_region: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let session_secret = var("DONGNE_SESSION_SECRET").unwrap_or_default();
        if session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("DONGNE_SESSION_SECRET is unset or still a placeholder");
        }

        let environment = match var("DONGNE_ENV").as_deref() {
            None | Some("production") => Environment::Production,
            Some("development") => Environment::Development,
            Some(other) => bail!("Invalid DONGNE_ENV value '{other}' (expected development or production)"),
        };

        let oidc = match var("OIDC_ISSUER_URL") {
            Some(issuer) => Some(OidcConfig {
                issuer_url: issuer.trim_end_matches('/').to_string(),
                client_id: var("OIDC_CLIENT_ID")
                    .context("OIDC_CLIENT_ID is required when OIDC_ISSUER_URL is set")?,
                client_secret: var("OIDC_CLIENT_SECRET"),
                redirect_url: var("OIDC_REDIRECT_URL")
                    .unwrap_or_else(|| DEFAULT_REDIRECT_URL.to_string()),
            }),
            None => {
                info!("OIDC_ISSUER_URL not set, provider login disabled");
                None
            }
        };

        let session_ttl_hours: i64 = parse(&var, "DONGNE_SESSION_TTL_HOURS", "168")?;
        if session_ttl_hours <= 0 {
            bail!("DONGNE_SESSION_TTL_HOURS must be positive");
        }

        Ok(Self {
            host: var("DONGNE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse(&var, "DONGNE_PORT", "5000")?,
            db_path: var("DONGNE_DB_PATH").unwrap_or_else(|| "dongne.db".into()).into(),
            session_secret,
            session_ttl_hours,
            environment,
            static_dir: var("DONGNE_STATIC_DIR").map(PathBuf::from),
            oidc,
            default_region: var("DONGNE_DEFAULT_REGION").unwrap_or_else(|| "성수동".into()),
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

fn parse<T, V>(var: &V, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    V: Fn(&str) -> Option<String>,
{
    let raw = var(key).unwrap_or_else(|| default.to_string());
    raw.parse()
        .map_err(|e| anyhow::anyhow!("Invalid {key} value '{raw}': {e}"))
}
