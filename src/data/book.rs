use chrono::{DateTime, Utc};

use super::{TopicID, UserID};

#[derive(Debug, Clone)]
pub struct Book {
    pub name: String,
    pub author: String,
    pub description: String,
    pub year: Option<i32>,
    pub image: String,
    pub topic: TopicID,
    pub host: UserID,
    pub participants: Vec<UserID>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Fields a superuser submits when creating or editing a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub topic: String,
    pub name: String,
    pub author: String,
    pub description: String,
    pub year: Option<i32>,
    pub image: String,
}

impl Book {
    pub fn readers(&self) -> usize {
        self.participants.len()
    }
}
