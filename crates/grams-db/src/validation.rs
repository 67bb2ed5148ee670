//! Presence rules checked before anything reaches the `grams` table.
//!
//! Writes go through [`NewGram`] and [`GramChanges`], which can only be built
//! from values that pass validation. The schema's CHECK constraints back the
//! same rules up.

use std::fmt;

/// Validation failures, in the order they were found. Each carries the
/// field it belongs to; a field keeps only its first failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<(&'static str, String)>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        if !self.has(field) {
            self.errors.push((field, message.into()));
        }
    }

    /// Adds `other`'s failures for fields that have none yet.
    pub fn extend(&mut self, other: ValidationErrors) {
        for (field, message) in other.errors {
            self.push(field, message);
        }
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|(f, _)| *f == field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|(_, m)| m.clone()).collect()
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// A gram that satisfies every presence rule and may be inserted.
#[derive(Debug, Clone)]
pub struct NewGram {
    user_id: String,
    message: String,
    picture: String,
}

impl NewGram {
    pub fn new(
        user_id: impl Into<String>,
        message: &str,
        picture: Option<&str>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if is_blank(message) {
            errors.push("message", "Message can't be blank");
        }
        let picture = picture.filter(|p| !is_blank(p));
        if picture.is_none() {
            errors.push("picture", "Picture can't be blank");
        }
        errors.into_result()?;

        Ok(Self {
            user_id: user_id.into(),
            message: message.to_string(),
            picture: picture.unwrap_or_default().to_string(),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn picture(&self) -> &str {
        &self.picture
    }
}

/// A partial update. Absent fields keep their stored value; present fields
/// must still satisfy the presence rules.
#[derive(Debug, Clone, Default)]
pub struct GramChanges {
    message: Option<String>,
    picture: Option<String>,
}

impl GramChanges {
    pub fn new(message: Option<&str>, picture: Option<&str>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if message.is_some_and(is_blank) {
            errors.push("message", "Message can't be blank");
        }
        if picture.is_some_and(is_blank) {
            errors.push("picture", "Picture can't be blank");
        }
        errors.into_result()?;

        Ok(Self {
            message: message.map(str::to_string),
            picture: picture.map(str::to_string),
        })
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn picture(&self) -> Option<&str> {
        self.picture.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.picture.is_none()
    }
}
