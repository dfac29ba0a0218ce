use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::{
    exchange::{CallbackParams, OAuthError, OAuthExchanger},
    provider::{redirect_uri, OAuthProvider},
};
use crate::{
    auth::{claims::TokenSubject, jwt::TokenError},
    error::ApiError,
    state::AppState,
    users::resolver::IdentityResolver,
};

pub fn oauth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/:provider", get(start))
        .route("/auth/:provider/callback", get(callback))
}

/// Everything that can end a callback before a token is issued.
#[derive(Debug, Error)]
enum SignInError {
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error("account lookup failed: {0:#}")]
    Account(#[from] anyhow::Error),

    #[error("token issue failed: {0}")]
    Token(#[from] TokenError),
}

impl SignInError {
    fn user_message(&self) -> String {
        match self {
            SignInError::OAuth(e) => e.to_string(),
            SignInError::Account(_) | SignInError::Token(_) => {
                "Could not complete sign-in, please try again".to_string()
            }
        }
    }
}

fn parse_provider(raw: &str) -> Result<OAuthProvider, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("Unknown OAuth provider".into()))
}

fn login_error_url(frontend: &str, message: &str) -> String {
    format!("{frontend}/login?error={}", urlencoding::encode(message))
}

#[instrument(skip(state))]
pub async fn start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Redirect, ApiError> {
    let provider = parse_provider(&provider)?;
    let Some(settings) = state.config.provider(provider) else {
        warn!("provider not configured");
        let msg = OAuthError::NotConfigured(provider).to_string();
        return Ok(Redirect::to(&login_error_url(&state.config.frontend_url, &msg)));
    };

    let uri = redirect_uri(&state.config.public_base_url, provider);
    let url = settings.authorize_url(&uri)?;
    Ok(Redirect::to(url.as_str()))
}

#[instrument(skip(state, params))]
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ApiError> {
    let provider = parse_provider(&provider)?;
    let frontend = &state.config.frontend_url;

    match sign_in(&state, provider, params).await {
        Ok(token) => Ok(Redirect::to(&format!(
            "{frontend}/auth/callback?token={}&provider={}",
            urlencoding::encode(&token),
            provider.as_str()
        ))),
        Err(e) => {
            match &e {
                SignInError::OAuth(_) => warn!(error = %e, "oauth sign-in failed"),
                _ => error!(error = %e, "oauth sign-in failed"),
            }
            Ok(Redirect::to(&login_error_url(frontend, &e.user_message())))
        }
    }
}

async fn sign_in(
    state: &AppState,
    provider: OAuthProvider,
    params: CallbackParams,
) -> Result<String, SignInError> {
    let settings = state
        .config
        .provider(provider)
        .ok_or(OAuthError::NotConfigured(provider))?;
    let uri = redirect_uri(&state.config.public_base_url, provider);

    let identity = OAuthExchanger::new(&state.http, settings, &uri)
        .complete(params)
        .await?;
    // The provider's avatar is informational; stored pictures only come from uploads.
    debug!(has_picture = identity.picture.is_some(), "provider profile received");

    let user = IdentityResolver::new(state.users.as_ref())
        .resolve(&identity.email, &identity.name)
        .await?;

    let token = state.tokens.issue(&TokenSubject::from(&user))?;
    info!(user_id = user.id, provider = provider.as_str(), "oauth sign-in complete");
    Ok(token)
}
