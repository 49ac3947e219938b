pub mod dto;
pub mod handlers;
pub mod permissions;
pub mod repo;
pub mod services;
pub mod store;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::recipe_routes())
}
