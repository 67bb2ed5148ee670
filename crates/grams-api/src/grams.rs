use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    response::{Html, IntoResponse, Redirect},
};
use bytes::BytesMut;
use tracing::{info, warn};

use grams_db::{GramChanges, NewGram, ValidationErrors, models::GramRow};
use grams_types::models::Gram;

use crate::error::AppError;
use crate::gate::{owned_by, require_account, require_actor};
use crate::pictures::{MAX_PICTURE_SIZE, Upload};
use crate::session::{Actor, Session};
use crate::views::{self, GramForm};
use crate::{AppState, convert, db_call};

/// Fields read from a gram form. Absent fields stay `None`.
#[derive(Debug, Default)]
struct Submission {
    message: Option<String>,
    picture: Option<Upload>,
}

impl Submission {
    async fn read(state: &AppState, req: Request) -> Result<Self, AppError> {
        let mut multipart = Multipart::from_request(req, state).await?;
        let mut submission = Submission::default();

        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("message") => submission.message = Some(field.text().await?),
                Some("picture") => {
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);

                    // Past the limit the rest of the part is drained, not kept.
                    let mut buf = BytesMut::new();
                    let mut oversized = false;
                    while let Some(chunk) = field.chunk().await? {
                        if oversized || buf.len() + chunk.len() > MAX_PICTURE_SIZE {
                            oversized = true;
                            buf.clear();
                        } else {
                            buf.extend_from_slice(&chunk);
                        }
                    }

                    let upload = Upload {
                        file_name,
                        content_type,
                        bytes: buf.freeze(),
                        oversized,
                    };
                    submission.picture = Some(upload).filter(|u| !u.is_blank());
                }
                _ => {}
            }
        }

        Ok(submission)
    }
}

/// Gram ids in URLs that are not integers name no record.
fn parse_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

async fn find_gram(state: &AppState, raw_id: &str) -> Result<Option<GramRow>, AppError> {
    let Some(id) = parse_id(raw_id) else {
        return Ok(None);
    };
    db_call(state, move |db| db.get_gram(id)).await
}

async fn load_with_comments(state: &AppState, rows: Vec<GramRow>) -> Result<Vec<Gram>, AppError> {
    let ids: Vec<i64> = rows.iter().map(|g| g.id).collect();
    let comments = db_call(state, move |db| db.get_comments_for_grams(&ids)).await?;
    Ok(convert::grams(rows, comments))
}

/// Checks the uploaded picture, if any, and picks the name it will be
/// stored under.
fn stage_picture(
    state: &AppState,
    upload: Option<&Upload>,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match upload?.check() {
        Ok(ext) => Some(state.pictures.allocate_name(&ext)),
        Err(e) => {
            warn!("Rejected picture upload: {}", e);
            errors.extend(e);
            None
        }
    }
}

fn unprocessable(actor: &Actor, form: GramForm, message: &str, errors: &ValidationErrors) -> AppError {
    AppError::Unprocessable(views::gram_form(Some(actor), form, message, errors))
}

/// GET / — every gram, newest first, with its comments.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let rows = db_call(&state, |db| db.list_grams()).await?;
    let grams = load_with_comments(&state, rows).await?;
    Ok(Html(views::index(session.actor(), &grams)))
}

/// GET /grams/new
pub async fn new(session: Session) -> Result<impl IntoResponse, AppError> {
    let actor = require_actor(session)?;
    Ok(Html(views::gram_form(
        Some(&actor),
        GramForm::New,
        "",
        &ValidationErrors::new(),
    )))
}

/// POST /grams — multipart form with `message` and `picture`.
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    req: Request,
) -> Result<impl IntoResponse, AppError> {
    let actor = require_account(&state, session).await?;
    let submission = Submission::read(&state, req).await?;
    let message = submission.message.unwrap_or_default();

    let mut errors = ValidationErrors::new();
    let picture = stage_picture(&state, submission.picture.as_ref(), &mut errors);
    let gram = match NewGram::new(actor.id.to_string(), &message, picture.as_deref()) {
        Ok(gram) if errors.is_empty() => gram,
        Ok(_) => return Err(unprocessable(&actor, GramForm::New, &message, &errors)),
        Err(e) => {
            errors.extend(e);
            return Err(unprocessable(&actor, GramForm::New, &message, &errors));
        }
    };

    // A valid NewGram always carries a staged picture.
    let bytes = submission.picture.map(|u| u.bytes).unwrap_or_default();
    state.pictures.save(gram.picture(), &bytes).await?;

    let picture_name = gram.picture().to_string();
    let inserted = db_call(&state, move |db| db.insert_gram(&gram)).await;
    let id = match inserted {
        Ok(id) => id,
        Err(e) => {
            state.pictures.discard(&picture_name).await;
            return Err(e);
        }
    };

    info!("Gram {} created by {}", id, actor.email);
    Ok(Redirect::to("/"))
}

/// GET /grams/{id}
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let row = find_gram(&state, &id).await?.ok_or(AppError::NotFound)?;
    let gram = load_with_comments(&state, vec![row])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    Ok(Html(views::show(session.actor(), &gram)))
}

/// GET /grams/{id}/edit
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let actor = require_actor(session)?;
    let gram = owned_by(&actor, find_gram(&state, &id).await?)?;
    Ok(Html(views::gram_form(
        Some(&actor),
        GramForm::Edit(gram.id),
        &gram.message,
        &ValidationErrors::new(),
    )))
}

/// PATCH /grams/{id} (or POST from the edit form). Fields left out of the
/// submission keep their stored values.
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    req: Request,
) -> Result<impl IntoResponse, AppError> {
    let actor = require_actor(session)?;
    let gram = owned_by(&actor, find_gram(&state, &id).await?)?;
    let submission = Submission::read(&state, req).await?;
    let form = GramForm::Edit(gram.id);
    let shown_message = submission.message.as_deref().unwrap_or(&gram.message);

    let mut errors = ValidationErrors::new();
    let picture = stage_picture(&state, submission.picture.as_ref(), &mut errors);
    let changes = match GramChanges::new(submission.message.as_deref(), picture.as_deref()) {
        Ok(changes) if errors.is_empty() => changes,
        Ok(_) => return Err(unprocessable(&actor, form, shown_message, &errors)),
        Err(e) => {
            errors.extend(e);
            return Err(unprocessable(&actor, form, shown_message, &errors));
        }
    };

    if let (Some(name), Some(upload)) = (changes.picture(), submission.picture.as_ref()) {
        state.pictures.save(name, &upload.bytes).await?;
    }

    let gram_id = gram.id;
    let new_picture = changes.picture().map(str::to_string);
    let updated = db_call(&state, move |db| db.update_gram(gram_id, &changes)).await;

    match (updated, new_picture) {
        (Ok(true), Some(_)) => state.pictures.discard(&gram.picture).await,
        (Ok(true), None) => {}
        (Ok(false), new_picture) => {
            if let Some(name) = new_picture {
                state.pictures.discard(&name).await;
            }
            return Err(AppError::NotFound);
        }
        (Err(e), new_picture) => {
            if let Some(name) = new_picture {
                state.pictures.discard(&name).await;
            }
            return Err(e);
        }
    }

    info!("Gram {} updated by {}", gram_id, actor.email);
    Ok(Redirect::to("/"))
}

/// DELETE /grams/{id} (or POST /grams/{id}/delete). Removes the gram, its
/// comments and its picture.
pub async fn destroy(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let actor = require_actor(session)?;
    let gram = owned_by(&actor, find_gram(&state, &id).await?)?;

    let gram_id = gram.id;
    let removed = db_call(&state, move |db| db.delete_gram(gram_id)).await?;
    if let Some(picture) = removed {
        state.pictures.discard(&picture).await;
    }

    info!("Gram {} destroyed by {}", gram_id, actor.email);
    Ok(Redirect::to("/"))
}
