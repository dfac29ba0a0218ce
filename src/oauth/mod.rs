use std::time::Duration;

use anyhow::Context;
use axum::Router;
use reqwest::{redirect, Client};

use crate::state::AppState;

pub mod exchange;
pub mod handlers;
pub mod provider;

pub fn router() -> Router<AppState> {
    handlers::oauth_routes()
}

/// Client shared by every provider call. Redirects are not followed so a provider
/// misconfiguration surfaces as a failed call.
pub fn build_http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .redirect(redirect::Policy::none())
        .build()
        .context("build outbound HTTP client")
}
