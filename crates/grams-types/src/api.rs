use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Session --

/// Claims carried in the session cookie. `sub` is the signed-in user's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Accounts --

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Checked against `password` only when submitted.
    pub password_confirmation: Option<String>,
}

// -- Comments --

/// Comment messages carry no presence rule; a missing field is stored empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_form_defaults_missing_message() {
        let form: CommentForm = serde_json::from_str("{}").unwrap();
        assert_eq!(form.message, "");
    }

    #[test]
    fn claims_roundtrip_through_json() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "someone@example.com".into(),
            exp: 42,
        };
        let json = serde_json::to_string(&claims).unwrap();
        let back: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sub, claims.sub);
        assert_eq!(back.email, claims.email);
    }
}
