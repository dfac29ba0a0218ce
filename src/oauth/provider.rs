use std::{fmt, str::FromStr};

use reqwest::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    /// Path segment and `provider=` query value.
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
        }
    }

    pub fn default_display_name(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "Google User",
            OAuthProvider::Github => "GitHub User",
        }
    }
}

/// Human-readable provider name, used in user-facing messages.
impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OAuthProvider::Google => "Google",
            OAuthProvider::Github => "GitHub",
        })
    }
}

impl FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            other => Err(format!("Unknown OAuth provider: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    /// Secondary email listing, only GitHub has one.
    pub emails_url: Option<String>,
}

impl ProviderEndpoints {
    pub fn for_provider(provider: OAuthProvider) -> Self {
        match provider {
            OAuthProvider::Google => Self {
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
                token_url: "https://oauth2.googleapis.com/token".into(),
                userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".into(),
                emails_url: None,
            },
            OAuthProvider::Github => Self {
                authorize_url: "https://github.com/login/oauth/authorize".into(),
                token_url: "https://github.com/login/oauth/access_token".into(),
                userinfo_url: "https://api.github.com/user".into(),
                emails_url: Some("https://api.github.com/user/emails".into()),
            },
        }
    }
}

#[cfg(test)]
impl ProviderEndpoints {
    /// Same endpoint layout served from a local mock server.
    pub(crate) fn rooted_at(base: &str, provider: OAuthProvider) -> Self {
        Self {
            authorize_url: format!("{base}/authorize"),
            token_url: format!("{base}/token"),
            userinfo_url: format!("{base}/user"),
            emails_url: (provider == OAuthProvider::Github).then(|| format!("{base}/user/emails")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub provider: OAuthProvider,
    pub client_id: String,
    pub client_secret: String,
    pub endpoints: ProviderEndpoints,
}

impl ProviderSettings {
    /// Provider-facing URL the browser is sent to in order to grant consent.
    pub fn authorize_url(&self, redirect_uri: &str) -> anyhow::Result<Url> {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", redirect_uri),
        ];
        match self.provider {
            OAuthProvider::Google => params.extend([
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("prompt", "select_account"),
            ]),
            OAuthProvider::Github => {
                params.extend([("scope", "user:email"), ("allow_signup", "true")])
            }
        }
        Ok(Url::parse_with_params(&self.endpoints.authorize_url, &params)?)
    }
}

/// The one place the callback URI is derived, so the authorization request and the
/// code exchange always send identical values.
pub fn redirect_uri(public_base_url: &str, provider: OAuthProvider) -> String {
    format!(
        "{}/auth/{}/callback",
        public_base_url.trim_end_matches('/'),
        provider.as_str()
    )
}
