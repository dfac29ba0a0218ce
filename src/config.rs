use std::{path::PathBuf, time::Duration};

use anyhow::Context;

use crate::oauth::provider::{OAuthProvider, ProviderEndpoints, ProviderSettings};

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Origin of the single-page frontend; OAuth callbacks redirect here.
    pub frontend_url: String,
    /// Externally visible origin of this API, used to build OAuth redirect URIs.
    pub public_base_url: String,
    pub upload_dir: PathBuf,
    pub jwt: JwtConfig,
    pub google: Option<ProviderSettings>,
    pub github: Option<ProviderSettings>,
    pub oauth_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let secret = var("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET must be set")?;

        let jwt = JwtConfig {
            secret,
            issuer: match var("JWT_ISSUER") {
                Some(iss) if iss.is_empty() => None,
                Some(iss) => Some(iss),
                None => Some("dromane.ai".into()),
            },
            audience: var("JWT_AUDIENCE").unwrap_or_else(|| "dromane.ai".into()),
            ttl_seconds: token_ttl(parse_or(&var, "JWT_EXPIRY", 86_400)?)?,
        };

        let provider = |p: OAuthProvider, id_key: &str, secret_key: &str| {
            match (var(id_key), var(secret_key)) {
                (Some(client_id), Some(client_secret))
                    if !client_id.is_empty() && !client_secret.is_empty() =>
                {
                    Some(ProviderSettings {
                        provider: p,
                        client_id,
                        client_secret,
                        endpoints: ProviderEndpoints::for_provider(p),
                    })
                }
                _ => None,
            }
        };

        Ok(Self {
            database_url,
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&var, "APP_PORT", 8000)?,
            frontend_url: trimmed(var("FRONTEND_URL"), "http://localhost:5173"),
            public_base_url: trimmed(var("PUBLIC_BASE_URL"), "http://localhost:8000"),
            upload_dir: PathBuf::from(var("UPLOAD_DIR").unwrap_or_else(|| "public".into())),
            jwt,
            google: provider(OAuthProvider::Google, "GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            github: provider(OAuthProvider::Github, "GITHUB_CLIENT_ID", "GITHUB_CLIENT_SECRET"),
            oauth_timeout: Duration::from_secs(parse_or(&var, "OAUTH_TIMEOUT_SECS", 10)?),
        })
    }

    pub fn provider(&self, provider: OAuthProvider) -> Option<&ProviderSettings> {
        match provider {
            OAuthProvider::Google => self.google.as_ref(),
            OAuthProvider::Github => self.github.as_ref(),
        }
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

/// A lifetime must be positive and `now + ttl` must still fit an i64.
fn token_ttl(seconds: i64) -> anyhow::Result<i64> {
    anyhow::ensure!(seconds > 0, "JWT_EXPIRY must be a positive number of seconds, got {seconds}");
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    anyhow::ensure!(
        now.checked_add(seconds).is_some(),
        "JWT_EXPIRY is too large: {seconds}"
    );
    Ok(seconds)
}

fn trimmed(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}
