use crate::Database;
use crate::models::{CommentRow, GramRow, UserRow};
use crate::validation::{GramChanges, NewGram};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

const COMMENT_BATCH: usize = 500;

const GRAM_COLUMNS: &str =
    "g.id, g.message, g.picture, g.user_id, COALESCE(u.email, 'unknown'), g.created_at, g.updated_at";

impl Database {
    // -- Users --

    /// Returns false, inserting nothing, if the email is already taken.
    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)
                 ON CONFLICT(email) DO NOTHING",
                (id, email, password_hash),
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Grams --

    /// Inserts a validated gram and returns its id.
    pub fn insert_gram(&self, gram: &NewGram) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO grams (message, picture, user_id) VALUES (?1, ?2, ?3)",
                params![gram.message(), gram.picture(), gram.user_id()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_gram(&self, id: i64) -> Result<Option<GramRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {GRAM_COLUMNS} FROM grams g LEFT JOIN users u ON g.user_id = u.id WHERE g.id = ?1"
            );
            let row = conn.query_row(&sql, [id], gram_from_row).optional()?;
            Ok(row)
        })
    }

    /// All grams, newest first.
    pub fn list_grams(&self) -> Result<Vec<GramRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {GRAM_COLUMNS} FROM grams g LEFT JOIN users u ON g.user_id = u.id
                 ORDER BY g.created_at DESC, g.id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], gram_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_grams(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM grams", [], |r| r.get(0))?))
    }

    /// Applies validated changes. Returns false if the gram no longer exists.
    pub fn update_gram(&self, id: i64, changes: &GramChanges) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE grams
                 SET message = COALESCE(?2, message),
                     picture = COALESCE(?3, picture),
                     updated_at = datetime('now')
                 WHERE id = ?1",
                params![id, changes.message(), changes.picture()],
            )?;
            Ok(updated > 0)
        })
    }

    /// Deletes a gram and its comments. Returns the removed picture's file
    /// name, or `None` if no such gram existed.
    pub fn delete_gram(&self, id: i64) -> Result<Option<String>> {
        self.with_transaction(|tx| {
            let picture: Option<String> = tx
                .query_row("SELECT picture FROM grams WHERE id = ?1", [id], |r| r.get(0))
                .optional()?;
            if picture.is_some() {
                tx.execute("DELETE FROM comments WHERE gram_id = ?1", [id])?;
                tx.execute("DELETE FROM grams WHERE id = ?1", [id])?;
            }
            Ok(picture)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, gram_id: i64, user_id: &str, message: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (message, user_id, gram_id) VALUES (?1, ?2, ?3)",
                params![message, user_id, gram_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Comments for a set of grams, oldest first within each gram. Ids are
    /// bound in batches to stay under SQLite's host parameter limit.
    pub fn get_comments_for_grams(&self, gram_ids: &[i64]) -> Result<Vec<CommentRow>> {
        if gram_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let mut rows = Vec::new();
            for batch in gram_ids.chunks(COMMENT_BATCH) {
                rows.extend(query_comments(conn, batch)?);
            }
            Ok(rows)
        })
    }

    pub fn count_comments_for_gram(&self, gram_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE gram_id = ?1",
                [gram_id],
                |r| r.get(0),
            )?)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT id, email, password, created_at FROM users WHERE {column} = ?1");
    let row = conn
        .query_row(&sql, [value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_comments(conn: &Connection, gram_ids: &[i64]) -> Result<Vec<CommentRow>> {
    let placeholders: Vec<String> = (1..=gram_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT c.id, COALESCE(c.message, ''), c.user_id, COALESCE(u.email, 'unknown'), c.gram_id, c.created_at
         FROM comments c
         LEFT JOIN users u ON c.user_id = u.id
         WHERE c.gram_id IN ({})
         ORDER BY c.created_at ASC, c.id ASC",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(gram_ids), |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                message: row.get(1)?,
                user_id: row.get(2)?,
                author_email: row.get(3)?,
                gram_id: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn gram_from_row(row: &Row<'_>) -> rusqlite::Result<GramRow> {
    Ok(GramRow {
        id: row.get(0)?,
        message: row.get(1)?,
        picture: row.get(2)?,
        user_id: row.get(3)?,
        author_email: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_user(id: &str, email: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_user(id, email, "hash").unwrap());
        db
    }

    fn gram(user: &str, message: &str) -> NewGram {
        NewGram::new(user, message, Some("picture.jpg")).unwrap()
    }

    #[test]
    fn insert_and_fetch_gram() {
        let db = db_with_user("u1", "a@example.com");
        let id = db.insert_gram(&gram("u1", "hello")).unwrap();

        let row = db.get_gram(id).unwrap().unwrap();
        assert_eq!(row.message, "hello");
        assert_eq!(row.picture, "picture.jpg");
        assert_eq!(row.user_id, "u1");
        assert_eq!(row.author_email, "a@example.com");
    }

    #[test]
    fn missing_gram_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_gram(999).unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first() {
        let db = db_with_user("u1", "a@example.com");
        let first = db.insert_gram(&gram("u1", "first")).unwrap();
        let second = db.insert_gram(&gram("u1", "second")).unwrap();

        let ids: Vec<i64> = db.list_grams().unwrap().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn partial_update_keeps_absent_fields() {
        let db = db_with_user("u1", "a@example.com");
        let id = db.insert_gram(&gram("u1", "Initial Value")).unwrap();

        let changes = GramChanges::new(Some("Changed"), None).unwrap();
        assert!(db.update_gram(id, &changes).unwrap());

        let row = db.get_gram(id).unwrap().unwrap();
        assert_eq!(row.message, "Changed");
        assert_eq!(row.picture, "picture.jpg");
    }

    #[test]
    fn update_of_missing_gram_reports_false() {
        let db = Database::open_in_memory().unwrap();
        let changes = GramChanges::new(Some("Changed"), None).unwrap();
        assert!(!db.update_gram(7, &changes).unwrap());
    }

    #[test]
    fn blank_message_rejected_by_schema() {
        let db = db_with_user("u1", "a@example.com");
        let result = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO grams (message, picture, user_id) VALUES ('  ', 'p.jpg', 'u1')",
                [],
            )?;
            Ok(())
        });
        assert!(result.is_err());
    }

    #[test]
    fn delete_removes_gram_and_comments() {
        let db = db_with_user("u1", "a@example.com");
        let id = db.insert_gram(&gram("u1", "bye")).unwrap();
        db.insert_comment(id, "u1", "nice").unwrap();

        assert_eq!(db.delete_gram(id).unwrap().as_deref(), Some("picture.jpg"));
        assert!(db.get_gram(id).unwrap().is_none());
        assert_eq!(db.count_comments_for_gram(id).unwrap(), 0);
        assert!(db.delete_gram(id).unwrap().is_none());
    }

    #[test]
    fn comments_grouped_by_gram_in_order() {
        let db = db_with_user("u1", "a@example.com");
        let g1 = db.insert_gram(&gram("u1", "one")).unwrap();
        let g2 = db.insert_gram(&gram("u1", "two")).unwrap();
        db.insert_comment(g1, "u1", "first").unwrap();
        db.insert_comment(g2, "u1", "other").unwrap();
        db.insert_comment(g1, "u1", "second").unwrap();

        let rows = db.get_comments_for_grams(&[g1]).unwrap();
        let messages: Vec<&str> = rows.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert_eq!(rows[0].author_email, "a@example.com");
    }

    #[test]
    fn comment_lookup_handles_more_ids_than_sqlite_binds() {
        let db = db_with_user("u1", "a@example.com");
        let g = db.insert_gram(&gram("u1", "one")).unwrap();
        db.insert_comment(g, "u1", "found").unwrap();

        // Well past SQLite's 32766 host parameter limit.
        let mut ids: Vec<i64> = (100_000..140_000).collect();
        ids.push(g);

        let rows = db.get_comments_for_grams(&ids).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, "found");
    }

    #[test]
    fn users_found_by_email_and_id() {
        let db = db_with_user("u1", "a@example.com");
        assert_eq!(db.get_user_by_email("a@example.com").unwrap().unwrap().id, "u1");
        assert_eq!(db.get_user_by_id("u1").unwrap().unwrap().email, "a@example.com");
        assert!(db.get_user_by_email("b@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_reported_not_inserted() {
        let db = db_with_user("u1", "a@example.com");
        assert!(!db.create_user("u2", "a@example.com", "other").unwrap());
        assert!(db.get_user_by_id("u2").unwrap().is_none());
        assert_eq!(db.get_user_by_email("a@example.com").unwrap().unwrap().id, "u1");
    }
}
