//! Server-rendered pages. Every user-supplied string goes through [`escape`].

use std::fmt::Write;

use grams_db::ValidationErrors;
use grams_types::models::{Comment, Gram};

use crate::session::Actor;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, actor: Option<&Actor>, body: &str) -> String {
    let nav = match actor {
        Some(actor) => format!(
            r#"<span>Signed in as {}</span>
      <a href="/grams/new">New gram</a>
      <form method="post" action="/users/sign_out"><button type="submit">Sign out</button></form>"#,
            escape(&actor.email)
        ),
        None => r#"<a href="/users/sign_in">Sign in</a>
      <a href="/users/sign_up">Sign up</a>"#
            .to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{title} | Grams</title>
  </head>
  <body>
    <nav>
      <a href="/">Grams</a>
      {nav}
    </nav>
    <main>
{body}
    </main>
  </body>
</html>
"#,
        title = escape(title),
    )
}

fn error_list(errors: &ValidationErrors) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = String::from(r#"<ul class="errors">"#);
    for message in errors.messages() {
        let _ = write!(out, "<li>{}</li>", escape(&message));
    }
    out.push_str("</ul>");
    out
}

fn comment_item(comment: &Comment) -> String {
    format!(
        r#"<li class="comment"><strong>{}</strong> {}</li>"#,
        escape(&comment.author_email),
        escape(&comment.message)
    )
}

fn gram_card(actor: Option<&Actor>, gram: &Gram) -> String {
    let mut out = format!(
        r#"<article class="gram" id="gram-{id}">
  <header><a href="/grams/{id}">{author}</a></header>
  <img src="{src}" alt="">
  <p>{message}</p>
"#,
        id = gram.id,
        author = escape(&gram.author_email),
        src = escape(&gram.picture_url()),
        message = escape(&gram.message),
    );

    if actor.is_some_and(|a| a.id == gram.user_id) {
        let _ = write!(
            out,
            r#"  <a href="/grams/{id}/edit">Edit</a>
  <form method="post" action="/grams/{id}/delete"><button type="submit">Delete</button></form>
"#,
            id = gram.id
        );
    }

    out.push_str("  <ul class=\"comments\">");
    for comment in &gram.comments {
        out.push_str(&comment_item(comment));
    }
    out.push_str("</ul>\n");

    if actor.is_some() {
        let _ = write!(
            out,
            r#"  <form method="post" action="/grams/{id}/comments">
    <input type="text" name="message" placeholder="Add a comment">
    <button type="submit">Comment</button>
  </form>
"#,
            id = gram.id
        );
    }

    out.push_str("</article>");
    out
}

pub fn index(actor: Option<&Actor>, grams: &[Gram]) -> String {
    let body = if grams.is_empty() {
        "<p>No grams yet.</p>".to_string()
    } else {
        grams
            .iter()
            .map(|g| gram_card(actor, g))
            .collect::<Vec<_>>()
            .join("\n")
    };
    layout("Home", actor, &body)
}

pub fn show(actor: Option<&Actor>, gram: &Gram) -> String {
    layout("Gram", actor, &gram_card(actor, gram))
}

/// Which gram form is being rendered.
#[derive(Debug, Clone, Copy)]
pub enum GramForm {
    New,
    Edit(i64),
}

pub fn gram_form(
    actor: Option<&Actor>,
    form: GramForm,
    message: &str,
    errors: &ValidationErrors,
) -> String {
    let (title, action, picture_hint) = match form {
        GramForm::New => ("New gram", "/grams".to_string(), ""),
        GramForm::Edit(id) => (
            "Edit gram",
            format!("/grams/{id}"),
            "<small>Leave empty to keep the current picture.</small>",
        ),
    };

    let body = format!(
        r#"<h1>{title}</h1>
{errors}
<form method="post" action="{action}" enctype="multipart/form-data">
  <label>Message <textarea name="message">{message}</textarea></label>
  <label>Picture <input type="file" name="picture" accept="image/*"></label>
  {picture_hint}
  <button type="submit">Save</button>
</form>"#,
        errors = error_list(errors),
        message = escape(message),
    );
    layout(title, actor, &body)
}

pub fn sign_in(email: &str, error: Option<&str>) -> String {
    let error = error
        .map(|e| format!(r#"<p class="errors">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<h1>Sign in</h1>
{error}
<form method="post" action="/users/sign_in">
  <label>Email <input type="email" name="email" value="{email}"></label>
  <label>Password <input type="password" name="password"></label>
  <button type="submit">Sign in</button>
</form>
<a href="/users/sign_up">Sign up</a>"#,
        email = escape(email),
    );
    layout("Sign in", None, &body)
}

pub fn sign_up(email: &str, errors: &ValidationErrors) -> String {
    let body = format!(
        r#"<h1>Sign up</h1>
{errors}
<form method="post" action="/users">
  <label>Email <input type="email" name="email" value="{email}"></label>
  <label>Password <input type="password" name="password"></label>
  <label>Password confirmation <input type="password" name="password_confirmation"></label>
  <button type="submit">Sign up</button>
</form>
<a href="/users/sign_in">Sign in</a>"#,
        errors = error_list(errors),
        email = escape(email),
    );
    layout("Sign up", None, &body)
}

pub fn not_found() -> String {
    layout(
        "Not found",
        None,
        "<h1>Not found</h1>\n<p>The page you were looking for doesn't exist.</p>",
    )
}

pub fn forbidden() -> String {
    layout(
        "Forbidden",
        None,
        "<h1>Forbidden</h1>\n<p>You are not allowed to do that.</p>",
    )
}
