use std::sync::OnceLock;

use ammonia::Builder;
use regex::Regex;
use serde::Deserialize;

use crate::{db::DB, data::{User, UserID, Book, BookDraft}};

const REQUIRED: &str = "This field is required.";
const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9@.+_-]{1,150}$").expect("valid username pattern"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"))
}

fn check_username(errors: &mut Vec<FieldError>, db: &DB, username: &str, owner: Option<&UserID>) {
    if username.is_empty() {
        errors.push(FieldError::new("username", REQUIRED));
    } else if !username_pattern().is_match(username) {
        errors.push(FieldError::new("username", "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."));
    } else if db.find_user_by_username(username).map_or(false, |(id, _)| Some(id) != owner) {
        errors.push(FieldError::new("username", "A user with that username already exists."));
    }
}

fn check_email(errors: &mut Vec<FieldError>, db: &DB, email: &str, owner: Option<&UserID>) {
    if email.is_empty() {
        errors.push(FieldError::new("email", REQUIRED));
    } else if !email_pattern().is_match(email) {
        errors.push(FieldError::new("email", "Enter a valid email address."));
    } else if db.find_user_by_email(email).map_or(false, |(id, _)| Some(id) != owner) {
        errors.push(FieldError::new("email", "User with this Email already exists."));
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

impl RegisterForm {
    /// Returns the normalized new user and the password to hash.
    pub fn validate(&self, db: &DB) -> Result<(User, String), Vec<FieldError>> {
        let username = self.username.trim().to_lowercase();
        let email = self.email.trim().to_lowercase();
        let mut errors = vec![];
        check_username(&mut errors, db, username.as_str(), None);
        check_email(&mut errors, db, email.as_str(), None);
        if self.password1.is_empty() {
            errors.push(FieldError::new("password1", REQUIRED));
        } else if self.password1 != self.password2 {
            errors.push(FieldError::new("password2", "The two password fields didn't match."));
        } else if self.password1.chars().count() < MIN_PASSWORD_LENGTH {
            errors.push(FieldError::new("password2", format!("This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters.")));
        } else if self.password1.chars().all(|c| c.is_ascii_digit()) {
            errors.push(FieldError::new("password2", "This password is entirely numeric."));
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok((User::new(username, email, self.name.trim().to_string()), self.password1.clone()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BookForm {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub image: String,
}

impl BookForm {
    pub fn from_book(book: &Book, topic_name: &str) -> Self {
        Self {
            topic: topic_name.to_string(),
            name: book.name.clone(),
            author: book.author.clone(),
            description: book.description.clone(),
            year: book.year.map(|x| x.to_string()).unwrap_or_default(),
            image: book.image.clone(),
        }
    }

    pub fn validate(&self) -> Result<BookDraft, Vec<FieldError>> {
        let mut errors = vec![];
        let topic = self.topic.trim();
        let name = self.name.trim();
        let image = self.image.trim();
        if topic.is_empty() {
            errors.push(FieldError::new("topic", REQUIRED));
        }
        if name.is_empty() {
            errors.push(FieldError::new("name", REQUIRED));
        }
        if image.is_empty() {
            errors.push(FieldError::new("image", "Image cannot be empty"));
        }
        let year = match self.year.trim() {
            "" => None,
            year => match year.parse::<i32>() {
                Ok(year) => Some(year),
                Err(_) => {
                    errors.push(FieldError::new("year", "Enter a whole number."));
                    None
                },
            },
        };
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(BookDraft {
            topic: topic.to_string(),
            name: name.to_string(),
            author: self.author.trim().to_string(),
            description: self.description.trim().to_string(),
            year,
            image: image.to_string(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub bio: String,
}

impl UserForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            avatar: user.avatar.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            bio: user.bio.clone(),
        }
    }

    /// Applies the form to `current`, checking uniqueness against every other user.
    pub fn validate(&self, db: &DB, id: &UserID, current: &User) -> Result<User, Vec<FieldError>> {
        let username = self.username.trim();
        let email = self.email.trim().to_lowercase();
        let mut errors = vec![];
        check_username(&mut errors, db, username, Some(id));
        check_email(&mut errors, db, email.as_str(), Some(id));
        if !errors.is_empty() {
            return Err(errors);
        }
        let avatar = match self.avatar.trim() {
            "" => current.avatar.clone(),
            avatar => avatar.to_string(),
        };
        Ok(User {
            username: username.to_string(),
            email,
            name: self.name.trim().to_string(),
            avatar,
            bio: Builder::default().clean(self.bio.as_str()).to_string(),
            joined: current.joined,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub body: String,
}
