//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Document ID
    pub id: String,
    /// Display name chosen by the user (may be unset or empty)
    pub username: Option<String>,
    /// Email address (may be None if not shared)
    pub email: Option<String>,
    /// Whether this user can create and manage opportunities
    #[serde(default)]
    pub is_manager: bool,
    /// When the user first signed up (ISO 8601)
    pub created_at: String,
}

impl User {
    /// Display name if one is set and non-empty.
    pub fn display_name(&self) -> Option<&str> {
        self.username.as_deref().filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user(username: Option<&str>) -> User {
        User {
            id: "u1".to_string(),
            username: username.map(String::from),
            email: None,
            is_manager: false,
            created_at: "2024-01-15T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_display_name_filters_empty() {
        assert_eq!(make_user(Some("ada")).display_name(), Some("ada"));
        assert_eq!(make_user(Some("")).display_name(), None);
        assert_eq!(make_user(None).display_name(), None);
    }
}
