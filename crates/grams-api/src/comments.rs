use axum::{
    Form,
    extract::{FromRequest, Path, Request, State},
    response::{IntoResponse, Redirect},
};
use tracing::info;

use grams_types::api::CommentForm;

use crate::error::AppError;
use crate::gate::require_account;
use crate::session::Session;
use crate::{AppState, db_call};

/// POST /grams/{id}/comments — any signed-in user may comment on an
/// existing gram.
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Path(gram_id): Path<String>,
    req: Request,
) -> Result<impl IntoResponse, AppError> {
    let actor = require_account(&state, session).await?;

    let gram_id: i64 = gram_id.parse().map_err(|_| AppError::NotFound)?;
    let exists = db_call(&state, move |db| Ok(db.get_gram(gram_id)?.is_some())).await?;
    if !exists {
        return Err(AppError::NotFound);
    }

    let Form(form) = Form::<CommentForm>::from_request(req, &state).await?;

    let user_id = actor.id.to_string();
    let comment_id =
        db_call(&state, move |db| db.insert_comment(gram_id, &user_id, &form.message)).await?;

    info!("Comment {} on gram {} by {}", comment_id, gram_id, actor.email);
    Ok(Redirect::to("/"))
}
