use chrono::{DateTime, Utc};

use super::{BookID, UserID};

#[derive(Debug, Clone)]
pub struct Comment {
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub user: UserID,
    pub book: BookID,
    pub body: String,
}

impl Comment {
    /// Short label used on the delete confirmation page.
    pub fn summary(&self) -> String {
        self.body.chars().take(50).collect()
    }
}
