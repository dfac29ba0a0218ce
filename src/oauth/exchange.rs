use reqwest::{header, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::provider::{OAuthProvider, ProviderSettings};
use crate::auth::services::normalize_email;

const GITHUB_USER_AGENT: &str = "Dromane-AI";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Query string the provider appends when redirecting back to us.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Identity asserted by the provider. `email` is already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: OAuthProvider,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

/// Display text is shown to the user on the frontend login page.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("{0}")]
    AuthorizationDenied(String),

    #[error("{0}")]
    TokenExchange(String),

    #[error("{0}")]
    ProfileFetch(String),

    #[error("Could not get email from {0}. Make sure your {0} email is public or verified.")]
    NoEmailAvailable(OAuthProvider),

    #[error("{0} OAuth is not configured")]
    NotConfigured(OAuthProvider),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubProfile {
    email: Option<String>,
    name: Option<String>,
    login: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

/// Runs the server side of the authorization-code grant for one callback:
/// code -> access token -> profile (-> email list on GitHub).
pub struct OAuthExchanger<'a> {
    http: &'a Client,
    settings: &'a ProviderSettings,
    redirect_uri: &'a str,
}

impl<'a> OAuthExchanger<'a> {
    pub fn new(http: &'a Client, settings: &'a ProviderSettings, redirect_uri: &'a str) -> Self {
        Self {
            http,
            settings,
            redirect_uri,
        }
    }

    fn provider(&self) -> OAuthProvider {
        self.settings.provider
    }

    #[instrument(skip_all, fields(provider = self.provider().as_str()))]
    pub async fn complete(&self, params: CallbackParams) -> Result<ExternalIdentity, OAuthError> {
        let code = match (params.error, params.code) {
            (None, Some(code)) if !code.is_empty() => code,
            (error, _) => {
                let reason = params
                    .error_description
                    .or(error)
                    .unwrap_or_else(|| "No authorization code received".to_string());
                warn!(reason = %reason, "authorization not granted");
                return Err(OAuthError::AuthorizationDenied(reason));
            }
        };

        let access_token = self.exchange_code(&code).await?;
        let identity = match self.provider() {
            OAuthProvider::Google => self.google_identity(&access_token).await?,
            OAuthProvider::Github => self.github_identity(&access_token).await?,
        };

        info!(email = %identity.email, "provider identity resolved");
        Ok(identity)
    }

    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let failed = || {
            OAuthError::TokenExchange(format!(
                "Failed to get access token from {}",
                self.provider()
            ))
        };

        let form = [
            ("code", code),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .http
            .post(&self.settings.endpoints.token_url)
            .header(header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, timeout = e.is_timeout(), "token endpoint unreachable");
                failed()
            })?;

        let status = response.status();
        let body: Option<TokenResponse> = response.json().await.ok();
        match body {
            Some(TokenResponse {
                access_token: Some(token),
                ..
            }) if status.is_success() && !token.is_empty() => {
                debug!("authorization code exchanged");
                Ok(token)
            }
            Some(TokenResponse {
                error,
                error_description,
                ..
            }) => {
                warn!(%status, error = ?error, "token exchange rejected");
                Err(error_description.map_or_else(failed, OAuthError::TokenExchange))
            }
            None => {
                warn!(%status, "token endpoint returned no JSON body");
                Err(failed())
            }
        }
    }

    fn authorized_get(&self, url: &str, access_token: &str) -> RequestBuilder {
        let request = self.http.get(url).bearer_auth(access_token);
        match self.provider() {
            OAuthProvider::Github => request
                .header(header::USER_AGENT, GITHUB_USER_AGENT)
                .header(header::ACCEPT, GITHUB_ACCEPT),
            OAuthProvider::Google => request.header(header::ACCEPT, "application/json"),
        }
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, OAuthError> {
        let provider = self.provider();
        let response = self
            .authorized_get(url, access_token)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url, "profile request failed");
                // An unresponsive provider is reported like a failed exchange.
                if e.is_timeout() {
                    OAuthError::TokenExchange(format!("{provider} did not respond in time"))
                } else {
                    OAuthError::ProfileFetch(format!("Failed to get user profile from {provider}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, url, "profile request rejected");
            return Err(OAuthError::ProfileFetch(format!(
                "Failed to get user profile from {provider}"
            )));
        }

        response.json::<T>().await.map_err(|e| {
            warn!(error = %e, url, "profile response not understood");
            OAuthError::ProfileFetch(format!("Failed to get user profile from {provider}"))
        })
    }

    async fn google_identity(&self, access_token: &str) -> Result<ExternalIdentity, OAuthError> {
        let profile: GoogleProfile = self
            .fetch_json(&self.settings.endpoints.userinfo_url, access_token)
            .await?;

        let email = profile
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or(OAuthError::NoEmailAvailable(OAuthProvider::Google))?;

        Ok(ExternalIdentity {
            provider: OAuthProvider::Google,
            email,
            name: non_blank(profile.name)
                .unwrap_or_else(|| OAuthProvider::Google.default_display_name().to_string()),
            picture: profile.picture,
        })
    }

    async fn github_identity(&self, access_token: &str) -> Result<ExternalIdentity, OAuthError> {
        let profile: GithubProfile = self
            .fetch_json(&self.settings.endpoints.userinfo_url, access_token)
            .await?;

        let email = match profile.email.as_deref().map(normalize_email) {
            Some(email) if !email.is_empty() => email,
            // Private email: ask the emails endpoint instead.
            _ => self.github_listed_email(access_token).await?,
        };

        let name = non_blank(profile.name)
            .or_else(|| non_blank(profile.login))
            .unwrap_or_else(|| OAuthProvider::Github.default_display_name().to_string());

        Ok(ExternalIdentity {
            provider: OAuthProvider::Github,
            email,
            name,
            picture: profile.avatar_url,
        })
    }

    async fn github_listed_email(&self, access_token: &str) -> Result<String, OAuthError> {
        let no_email = OAuthError::NoEmailAvailable(OAuthProvider::Github);
        let Some(url) = self.settings.endpoints.emails_url.as_deref() else {
            return Err(no_email);
        };

        let emails: Vec<GithubEmail> = match self.fetch_json(url, access_token).await {
            Ok(emails) => emails,
            Err(OAuthError::TokenExchange(msg)) => return Err(OAuthError::TokenExchange(msg)),
            Err(e) => {
                warn!(error = %e, "email list unavailable");
                return Err(no_email);
            }
        };

        pick_email(&emails)
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or(no_email)
    }
}

/// Primary and verified wins; otherwise the first listed address.
fn pick_email(emails: &[GithubEmail]) -> Option<&str> {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.first())
        .map(|e| e.email.as_str())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
