use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use grams_types::api::Claims;

use crate::AppState;

pub const SESSION_COOKIE: &str = "grams_session";

/// The signed-in user making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
}

/// The actor behind a request, if any. A missing, tampered or expired
/// session cookie yields an anonymous session rather than an error.
#[derive(Debug, Clone, Default)]
pub struct Session(pub Option<Actor>);

impl Session {
    pub fn actor(&self) -> Option<&Actor> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let actor = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| verify_token(&state.session_secret, cookie.value()));
        Ok(Session(actor))
    }
}

pub fn create_token(secret: &str, actor: &Actor, days: i64) -> anyhow::Result<String> {
    let claims = Claims {
        sub: actor.id,
        email: actor.email.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::days(days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn verify_token(secret: &str, token: &str) -> Option<Actor> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    Some(Actor {
        id: data.claims.sub,
        email: data.claims.email,
    })
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
