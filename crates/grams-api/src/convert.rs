//! Row to view-model conversion.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use grams_db::models::{CommentRow, GramRow};
use grams_types::models::{Comment, Gram};

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without a timezone;
/// they are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().ok().or_else(|| {
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|ndt| ndt.and_utc())
    })
}

fn timestamp(raw: &str, what: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt {} '{}'", what, raw);
        DateTime::default()
    })
}

fn user_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt user id '{}': {}", raw, e);
        Uuid::default()
    })
}

pub fn comment(row: CommentRow) -> Comment {
    Comment {
        id: row.id,
        user_id: user_id(&row.user_id),
        created_at: timestamp(&row.created_at, "comment created_at"),
        message: row.message,
        author_email: row.author_email,
        gram_id: row.gram_id,
    }
}

/// Attaches each gram's comments, keeping both orders as given.
pub fn grams(rows: Vec<GramRow>, comment_rows: Vec<CommentRow>) -> Vec<Gram> {
    let mut by_gram: HashMap<i64, Vec<Comment>> = HashMap::new();
    for row in comment_rows {
        by_gram.entry(row.gram_id).or_default().push(comment(row));
    }

    rows.into_iter()
        .map(|row| {
            let comments = by_gram.remove(&row.id).unwrap_or_default();
            Gram {
                id: row.id,
                user_id: user_id(&row.user_id),
                created_at: timestamp(&row.created_at, "gram created_at"),
                updated_at: timestamp(&row.updated_at, "gram updated_at"),
                message: row.message,
                picture: row.picture,
                author_email: row.author_email,
                comments,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_and_rfc3339_timestamps() {
        let sqlite = parse_timestamp("2016-10-10 19:01:05").unwrap();
        let rfc = parse_timestamp("2016-10-10T19:01:05Z").unwrap();
        assert_eq!(sqlite, rfc);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn comments_attach_to_their_gram() {
        let owner = Uuid::new_v4().to_string();
        let gram_row = |id| GramRow {
            id,
            message: format!("gram {id}"),
            picture: "p.jpg".into(),
            user_id: owner.clone(),
            author_email: "a@example.com".into(),
            created_at: "2016-10-10 19:01:05".into(),
            updated_at: "2016-10-10 19:01:05".into(),
        };
        let comment_row = |id, gram_id| CommentRow {
            id,
            message: format!("comment {id}"),
            user_id: owner.clone(),
            author_email: "b@example.com".into(),
            gram_id,
            created_at: "2016-10-10 19:02:00".into(),
        };

        let out = grams(
            vec![gram_row(2), gram_row(1)],
            vec![comment_row(10, 1), comment_row(11, 2), comment_row(12, 1)],
        );

        assert_eq!(out[0].id, 2);
        assert_eq!(out[0].comments.len(), 1);
        let ids: Vec<i64> = out[1].comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![10, 12]);
    }
}
