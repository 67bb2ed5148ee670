//! Row types mapping directly to SQLite rows, kept apart from the
//! grams-types view models so the DB layer stays independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct GramRow {
    pub id: i64,
    pub message: String,
    pub picture: String,
    pub user_id: String,
    pub author_email: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct CommentRow {
    pub id: i64,
    pub message: String,
    pub user_id: String,
    pub author_email: String,
    pub gram_id: i64,
    pub created_at: String,
}
