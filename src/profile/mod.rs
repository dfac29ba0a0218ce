use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod pictures;

pub use pictures::PictureStorage;

pub fn router() -> Router<AppState> {
    handlers::profile_routes()
}
