use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod repo;

pub use repo::{DocumentStore, PgDocumentStore};

pub fn router() -> Router<AppState> {
    handlers::document_routes()
}
