use chrono::{DateTime, Utc};

pub const DEFAULT_AVATAR: &str = "/static/avatar.svg";

#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub email: String,
    pub name: String,
    pub avatar: String,
    pub bio: String,
    pub joined: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, name: String) -> Self {
        Self {
            username,
            email,
            name,
            avatar: DEFAULT_AVATAR.to_string(),
            bio: String::new(),
            joined: Utc::now(),
        }
    }

    /// Name shown on pages; falls back to the username when no display name was given.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.username.as_str()
        } else {
            self.name.as_str()
        }
    }
}
