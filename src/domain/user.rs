//! User type.

use uuid::Uuid;

/// A registered user.
///
/// `confirmation_code` is non-null until the user confirms their email;
/// unconfirmed users cannot log in.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub confirmation_code: Option<String>,
}

impl User {
    /// Display name used in generated operation descriptions.
    pub fn full_name(&self) -> String {
        let parts: Vec<&str> = [
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.middle_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect();

        if parts.is_empty() {
            self.email.clone()
        } else {
            parts.join(" ")
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmation_code.is_none()
    }
}
