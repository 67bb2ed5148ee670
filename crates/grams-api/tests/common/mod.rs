#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use grams_api::pictures::PictureStore;
use grams_api::session::{self, Actor, SESSION_COOKIE};
use grams_api::{AppState, AppStateInner};
use grams_db::{Database, NewGram};

pub const SECRET: &str = "integration-test-secret";
pub const BOUNDARY: &str = "----grams-test-boundary";
pub const JPEG: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg-bytes";

pub struct TestApp {
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("grams.db")).unwrap();
        let pictures = PictureStore::new(dir.path().join("pictures")).await.unwrap();
        let state = Arc::new(AppStateInner {
            db,
            pictures,
            session_secret: SECRET.into(),
            session_days: 1,
        });
        Self { state, _dir: dir }
    }

    pub fn user(&self, email: &str) -> Actor {
        let actor = Actor {
            id: Uuid::new_v4(),
            email: email.into(),
        };
        assert!(
            self.state
                .db
                .create_user(&actor.id.to_string(), email, "not-a-real-hash")
                .unwrap()
        );
        actor
    }

    /// A signed session for a user with no account row.
    pub fn unregistered(&self, email: &str) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            email: email.into(),
        }
    }

    /// A gram owned by `owner`, with its picture on disk.
    pub async fn gram(&self, owner: &Actor, message: &str) -> i64 {
        let name = self.state.pictures.allocate_name("jpg");
        self.state.pictures.save(&name, JPEG).await.unwrap();
        let gram = NewGram::new(owner.id.to_string(), message, Some(&name)).unwrap();
        self.state.db.insert_gram(&gram).unwrap()
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        grams_api::router(self.state.clone())
            .oneshot(req)
            .await
            .unwrap()
    }

    pub fn gram_count(&self) -> i64 {
        self.state.db.count_grams().unwrap()
    }

    pub fn message_of(&self, id: i64) -> Option<String> {
        self.state.db.get_gram(id).unwrap().map(|g| g.message)
    }

    pub fn stored_pictures(&self) -> usize {
        std::fs::read_dir(self.state.pictures.dir()).unwrap().count()
    }
}

pub fn cookie(actor: &Actor) -> String {
    let token = session::create_token(SECRET, actor, 1).unwrap();
    format!("{}={}", SESSION_COOKIE, token)
}

/// One part of a multipart/form-data body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub fn picture(bytes: &[u8]) -> Part<'_> {
    Part::File {
        name: "picture",
        file_name: "picture.jpg",
        content_type: "image/jpeg",
        bytes,
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(
    method: &str,
    uri: &str,
    actor: Option<&Actor>,
    parts: &[Part<'_>],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(actor) = actor {
        builder = builder.header(header::COOKIE, cookie(actor));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

pub fn form_request(method: &str, uri: &str, actor: Option<&Actor>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(actor) = actor {
        builder = builder.header(header::COOKIE, cookie(actor));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn request(method: &str, uri: &str, actor: Option<&Actor>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(header::COOKIE, cookie(actor));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub fn assert_redirects_to(response: &Response<Body>, path: &str) {
    assert!(
        response.status().is_redirection(),
        "expected redirect, got {}",
        response.status()
    );
    assert_eq!(location(response), path);
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
