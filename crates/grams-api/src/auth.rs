use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};
use uuid::Uuid;

use grams_db::ValidationErrors;
use grams_types::api::{SignInForm, SignUpForm};

use crate::error::AppError;
use crate::session::{self, Actor, Session};
use crate::views;
use crate::{AppState, db_call};

const MIN_PASSWORD_LEN: usize = 8;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_sign_up(email: &str, form: &SignUpForm) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if email.is_empty() {
        errors.push("email", "Email can't be blank");
    } else if !email.contains('@') {
        errors.push("email", "Email is invalid");
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        errors.push(
            "password",
            format!("Password is too short (minimum is {MIN_PASSWORD_LEN} characters)"),
        );
    }
    if form
        .password_confirmation
        .as_deref()
        .is_some_and(|c| c != form.password)
    {
        errors.push("password_confirmation", "Password confirmation doesn't match Password");
    }
    errors
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn signed_in(state: &AppState, jar: CookieJar, actor: &Actor) -> Result<(CookieJar, Redirect), AppError> {
    let token = session::create_token(&state.session_secret, actor, state.session_days)?;
    Ok((jar.add(session::session_cookie(token)), Redirect::to("/")))
}

/// GET /users/sign_in
pub async fn sign_in_form() -> impl IntoResponse {
    Html(views::sign_in("", None))
}

/// POST /users/sign_in
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignInForm>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&form.email);

    let lookup = email.clone();
    let password = form.password;
    let actor = db_call(&state, move |db| {
        let Some(user) = db.get_user_by_email(&lookup)? else {
            return Ok(None);
        };

        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored hash unreadable: {}", e))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Ok(None);
        }

        Ok(Some(Actor {
            id: user.id.parse()?,
            email: user.email,
        }))
    })
    .await?;

    let Some(actor) = actor else {
        warn!("Failed sign-in for {}", email);
        return Err(AppError::InvalidCredentials(views::sign_in(
            &email,
            Some("Invalid email or password."),
        )));
    };

    info!("{} signed in", actor.email);
    signed_in(&state, jar, &actor)
}

/// GET /users/sign_up
pub async fn sign_up_form() -> impl IntoResponse {
    Html(views::sign_up("", &ValidationErrors::new()))
}

/// POST /users — registers and signs in.
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignUpForm>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&form.email);
    let errors = validate_sign_up(&email, &form);
    if !errors.is_empty() {
        return Err(AppError::Unprocessable(views::sign_up(&email, &errors)));
    }

    let id = Uuid::new_v4();
    let new_email = email.clone();
    let created = db_call(&state, move |db| {
        if db.get_user_by_email(&new_email)?.is_some() {
            return Ok(false);
        }
        let password_hash = hash_password(&form.password)?;
        // A concurrent registration may have claimed the email since the
        // lookup; the insert reports that instead of failing.
        db.create_user(&id.to_string(), &new_email, &password_hash)
    })
    .await?;

    if !created {
        let mut errors = ValidationErrors::new();
        errors.push("email", "Email has already been taken");
        return Err(AppError::Unprocessable(views::sign_up(&email, &errors)));
    }

    info!("Registered {}", email);
    signed_in(&state, jar, &Actor { id, email })
}

/// POST /users/sign_out
pub async fn sign_out(session: Session, jar: CookieJar) -> impl IntoResponse {
    if let Some(actor) = session.actor() {
        info!("{} signed out", actor.email);
    }
    (session::clear_session(jar), Redirect::to("/"))
}
