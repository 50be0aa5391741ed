use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/index.html", get(handlers::index))
        .route("/:file", get(handlers::content_file))
        .route("/dhikr/:id/increment", post(handlers::increment_form))
        .route("/dhikr/:id/reset", post(handlers::reset_form))
        .route("/settings", post(handlers::update_settings_form))
        .route("/api/state", get(handlers::get_state))
        .route("/api/adhkar/:time", get(handlers::adhkar_list))
        .route("/api/dhikr/:id/increment", post(handlers::increment))
        .route("/api/dhikr/:id/reset", post(handlers::reset))
        .route("/api/settings", post(handlers::update_settings))
        .with_state(state)
}
