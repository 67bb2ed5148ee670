pub mod auth;
pub mod comments;
pub mod convert;
pub mod error;
pub mod gate;
pub mod grams;
pub mod pictures;
pub mod session;
pub mod views;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tracing::error;

use grams_db::Database;

use crate::error::AppError;
use crate::pictures::{MAX_REQUEST_BODY, PictureStore};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub pictures: PictureStore,
    pub session_secret: String,
    pub session_days: i64,
}

/// Builds the application router. Logging and CORS layers are added by the
/// binary.
pub fn router(state: AppState) -> Router {
    let pictures = ServeDir::new(state.pictures.dir());

    Router::new()
        .route("/", get(grams::index))
        .route("/grams", post(grams::create))
        .route("/grams/new", get(grams::new))
        .route(
            "/grams/{id}",
            get(grams::show)
                .patch(grams::update)
                .post(grams::update)
                .delete(grams::destroy),
        )
        .route("/grams/{id}/edit", get(grams::edit))
        .route("/grams/{id}/delete", post(grams::destroy))
        .route("/grams/{id}/comments", post(comments::create))
        .route("/users", post(auth::sign_up))
        .route("/users/sign_up", get(auth::sign_up_form))
        .route("/users/sign_in", get(auth::sign_in_form).post(auth::sign_in))
        .route("/users/sign_out", post(auth::sign_out).delete(auth::sign_out))
        .route("/health", get(health))
        .nest_service("/pictures", pictures)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Runs a blocking database call off the async runtime.
pub(crate) async fn db_call<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Internal(anyhow::anyhow!("database task failed"))
        })?
        .map_err(AppError::Internal)
}
