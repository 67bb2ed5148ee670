//! Authentication and ownership checks run before any handler logic.

use grams_db::models::GramRow;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::session::{Actor, Session};
use crate::{AppState, db_call};

/// Outcome of checking an actor against a looked-up resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Forbidden,
    NotFound,
}

impl Decision {
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Forbidden => Err(AppError::Forbidden),
            Decision::NotFound => Err(AppError::NotFound),
        }
    }
}

/// Anything created by, and therefore owned by, a single user.
pub trait Owned {
    fn owner_id(&self) -> &str;
}

impl Owned for GramRow {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

/// Existence is checked before ownership.
pub fn authorize<R: Owned>(actor: &Actor, resource: Option<&R>) -> Decision {
    match resource {
        None => Decision::NotFound,
        Some(r) if r.owner_id().parse::<Uuid>().ok() == Some(actor.id) => Decision::Allowed,
        Some(_) => Decision::Forbidden,
    }
}

/// Resolves the resource only when `actor` may mutate it.
pub fn owned_by<R: Owned>(actor: &Actor, resource: Option<R>) -> Result<R, AppError> {
    authorize(actor, resource.as_ref()).into_result()?;
    resource.ok_or(AppError::NotFound)
}

pub fn require_actor(session: Session) -> Result<Actor, AppError> {
    session.0.ok_or(AppError::NotAuthenticated)
}

/// Like [`require_actor`], but also checks the session's user still has an
/// account. Used before inserting rows that reference the user.
pub async fn require_account(state: &AppState, session: Session) -> Result<Actor, AppError> {
    let actor = require_actor(session)?;
    let id = actor.id.to_string();
    if db_call(state, move |db| db.get_user_by_id(&id)).await?.is_none() {
        warn!("Session for {} has no account", actor.email);
        return Err(AppError::NotAuthenticated);
    }
    Ok(actor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: Uuid) -> Actor {
        Actor {
            id,
            email: "owner@example.com".into(),
        }
    }

    fn gram(owner: Uuid) -> GramRow {
        GramRow {
            id: 1,
            message: "hello".into(),
            picture: "p.jpg".into(),
            user_id: owner.to_string(),
            author_email: "owner@example.com".into(),
            created_at: "2016-10-10 19:01:05".into(),
            updated_at: "2016-10-10 19:01:05".into(),
        }
    }

    #[test]
    fn owner_is_allowed() {
        let id = Uuid::new_v4();
        assert_eq!(authorize(&actor(id), Some(&gram(id))), Decision::Allowed);
    }

    #[test]
    fn other_user_is_forbidden() {
        let g = gram(Uuid::new_v4());
        assert_eq!(authorize(&actor(Uuid::new_v4()), Some(&g)), Decision::Forbidden);
    }

    #[test]
    fn missing_resource_is_not_found() {
        assert_eq!(
            authorize::<GramRow>(&actor(Uuid::new_v4()), None),
            Decision::NotFound
        );
    }

    #[test]
    fn owned_by_hands_back_the_resource() {
        let id = Uuid::new_v4();
        let g = owned_by(&actor(id), Some(gram(id))).unwrap();
        assert_eq!(g.id, 1);
        assert!(matches!(
            owned_by(&actor(Uuid::new_v4()), Some(gram(id))),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn anonymous_session_is_rejected() {
        assert!(matches!(
            require_actor(Session(None)),
            Err(AppError::NotAuthenticated)
        ));
    }
}
