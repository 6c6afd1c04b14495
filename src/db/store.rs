use std::{collections::HashMap, fs::{self, read_dir, read_to_string, create_dir_all}, io, path::{Path, PathBuf}};

use chrono::{DateTime, Utc};
use json::{JsonValue, object};

use crate::{data::{Topic, User, UserID, TopicID, BookID, Book, CommentID, Comment}, auth::PasswordStore};

use super::Permission;

const USERS_DIR: &str = "users";
const TOPICS_DIR: &str = "topics";
const BOOKS_DIR: &str = "books";
const COMMENTS_DIR: &str = "comments";
const AUTH_DIR: &str = "auth";
const PERMISSIONS_FILE: &str = "permissions.json";

/// Directory of JSON documents, one file per record, grouped by kind.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, dir: &str, id: &str) -> PathBuf {
        self.root.join(dir).join(format!("{id}.json"))
    }

    fn read_documents(&self, dir: &str) -> io::Result<Vec<(String, JsonValue)>> {
        let entries = match read_dir(self.root.join(dir)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e),
        };
        let mut documents = vec![];
        for entry in entries {
            let path = entry?.path();
            let Some(id) = path.file_stem().and_then(|x| x.to_str()).map(str::to_string) else {
                continue;
            };
            match json::parse(&read_to_string(&path)?) {
                Ok(json) => documents.push((id, json)),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping malformed document"),
            }
        }
        Ok(documents)
    }

    fn load<K, V, F>(&self, dir: &str, make_id: fn(String) -> K, parse: F) -> io::Result<HashMap<K, V>>
        where K: std::hash::Hash + Eq, F: Fn(&JsonValue) -> Option<V> {
        Ok(self.read_documents(dir)?.into_iter()
            .filter_map(|(id, json)| match parse(&json) {
                Some(value) => Some((make_id(id), value)),
                None => {
                    tracing::warn!(dir, id = %id, "skipping document with missing fields");
                    None
                },
            })
            .collect())
    }

    fn write_document(&self, dir: &str, id: &str, json: JsonValue) -> io::Result<()> {
        create_dir_all(self.root.join(dir))?;
        fs::write(self.document_path(dir, id), json.dump())
    }

    fn remove_document(&self, dir: &str, id: &str) -> io::Result<()> {
        match fs::remove_file(self.document_path(dir, id)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

fn parse_time(json: &JsonValue) -> Option<DateTime<Utc>> {
    json.as_str()
        .and_then(|x| DateTime::parse_from_rfc3339(x).ok())
        .map(|x| x.with_timezone(&Utc))
}

fn string_or_default(json: &JsonValue) -> String {
    json.as_str().unwrap_or_default().to_string()
}

impl Store {
    pub fn load_users(&self) -> io::Result<HashMap<UserID, User>> {
        self.load(USERS_DIR, UserID, |json| Some(User {
            username: json["username"].as_str()?.to_string(),
            email: json["email"].as_str()?.to_string(),
            name: string_or_default(&json["name"]),
            avatar: string_or_default(&json["avatar"]),
            bio: string_or_default(&json["bio"]),
            joined: parse_time(&json["joined"]).unwrap_or_else(Utc::now),
        }))
    }

    pub fn load_topics(&self) -> io::Result<HashMap<TopicID, Topic>> {
        self.load(TOPICS_DIR, TopicID, |json| Some(Topic {
            name: json["name"].as_str()?.to_string(),
        }))
    }

    pub fn load_books(&self) -> io::Result<HashMap<BookID, Book>> {
        self.load(BOOKS_DIR, BookID, |json| Some(Book {
            name: json["name"].as_str()?.to_string(),
            author: string_or_default(&json["author"]),
            description: string_or_default(&json["description"]),
            year: json["year"].as_i32(),
            image: string_or_default(&json["image"]),
            topic: TopicID(json["topic"].as_str()?.to_string()),
            host: UserID(json["host"].as_str()?.to_string()),
            participants: json["participants"].members()
                .filter_map(|x| x.as_str())
                .map(|x| UserID(x.to_string()))
                .collect(),
            created: parse_time(&json["created"])?,
            updated: parse_time(&json["updated"])?,
        }))
    }

    pub fn load_comments(&self) -> io::Result<HashMap<CommentID, Comment>> {
        self.load(COMMENTS_DIR, CommentID, |json| Some(Comment {
            created: parse_time(&json["created"])?,
            updated: parse_time(&json["updated"])?,
            user: UserID(json["user"].as_str()?.to_string()),
            book: BookID(json["book"].as_str()?.to_string()),
            body: string_or_default(&json["body"]),
        }))
    }

    pub fn load_permissions(&self) -> io::Result<HashMap<UserID, Vec<Permission>>> {
        let text = match read_to_string(self.root.join(PERMISSIONS_FILE)) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e),
        };
        let json = match json::parse(&text) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed permissions file");
                return Ok(HashMap::new());
            },
        };
        Ok(json.entries().map(|(user, grants)| {
            let permissions = grants.members().filter_map(|x| match x.as_str() {
                Some("superuser") => Some(Permission::Superuser),
                _ => None,
            }).collect();
            (UserID(user.to_string()), permissions)
        }).collect())
    }

    pub fn load_user_auth(&self, id: &UserID) -> io::Result<Option<PasswordStore>> {
        let text = match read_to_string(self.document_path(AUTH_DIR, &id.0)) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let Ok(json) = json::parse(&text) else {
            tracing::warn!(user = %id.0, "ignoring malformed credential document");
            return Ok(None);
        };
        Ok(match (json["salt"].as_str(), json["hashed"].as_str()) {
            (Some(salt), Some(hashed)) => Some(PasswordStore { salt: salt.to_string(), hashed: hashed.to_string() }),
            _ => None,
        })
    }
}

impl Store {
    pub fn store_user(&self, id: &UserID, user: &User) -> io::Result<()> {
        self.write_document(USERS_DIR, &id.0, object! {
            username: user.username.as_str(),
            email: user.email.as_str(),
            name: user.name.as_str(),
            avatar: user.avatar.as_str(),
            bio: user.bio.as_str(),
            joined: user.joined.to_rfc3339(),
        })
    }

    pub fn store_topic(&self, id: &TopicID, topic: &Topic) -> io::Result<()> {
        self.write_document(TOPICS_DIR, &id.0, object! {
            name: topic.name.as_str(),
        })
    }

    pub fn store_book(&self, id: &BookID, book: &Book) -> io::Result<()> {
        self.write_document(BOOKS_DIR, &id.0, object! {
            name: book.name.as_str(),
            author: book.author.as_str(),
            description: book.description.as_str(),
            year: book.year,
            image: book.image.as_str(),
            topic: book.topic.0.as_str(),
            host: book.host.0.as_str(),
            participants: book.participants.iter().map(|x| x.0.as_str()).collect::<Vec<_>>(),
            created: book.created.to_rfc3339(),
            updated: book.updated.to_rfc3339(),
        })
    }

    pub fn store_comment(&self, id: &CommentID, comment: &Comment) -> io::Result<()> {
        self.write_document(COMMENTS_DIR, &id.0, object! {
            created: comment.created.to_rfc3339(),
            updated: comment.updated.to_rfc3339(),
            user: comment.user.0.as_str(),
            book: comment.book.0.as_str(),
            body: comment.body.as_str(),
        })
    }

    pub fn store_permissions(&self, permissions: &HashMap<UserID, Vec<Permission>>) -> io::Result<()> {
        create_dir_all(&self.root)?;
        let mut obj = JsonValue::new_object();
        for (user, permissions) in permissions {
            let grants = permissions.iter().map(|permission| match permission {
                Permission::Superuser => JsonValue::from("superuser"),
            }).collect::<Vec<_>>();
            obj[user.0.as_str()] = JsonValue::Array(grants);
        }
        fs::write(self.root.join(PERMISSIONS_FILE), obj.dump())
    }

    pub fn store_user_auth(&self, id: &UserID, password_store: &PasswordStore) -> io::Result<()> {
        self.write_document(AUTH_DIR, &id.0, object! {
            salt: password_store.salt.as_str(),
            hashed: password_store.hashed.as_str(),
        })
    }

    pub fn delete_book(&self, id: &BookID) -> io::Result<()> {
        self.remove_document(BOOKS_DIR, &id.0)
    }

    pub fn delete_comment(&self, id: &CommentID) -> io::Result<()> {
        self.remove_document(COMMENTS_DIR, &id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directories_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("nothing-here"));
        assert!(store.load_users().unwrap().is_empty());
        assert!(store.load_books().unwrap().is_empty());
        assert!(store.load_permissions().unwrap().is_empty());
    }

    #[test]
    fn malformed_documents_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        store.store_topic(&TopicID("good".into()), &Topic { name: "Poetry".into() }).unwrap();
        fs::write(dir.path().join(TOPICS_DIR).join("bad.json"), "{not json").unwrap();
        fs::write(dir.path().join(TOPICS_DIR).join("empty.json"), "{}").unwrap();
        let topics = store.load_topics().unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[&TopicID("good".into())].name, "Poetry");
    }

    #[test]
    fn permissions_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let mut permissions = HashMap::new();
        permissions.insert(UserID("admin".into()), vec![Permission::Superuser]);
        store.store_permissions(&permissions).unwrap();
        assert_eq!(store.load_permissions().unwrap(), permissions);
    }

    #[test]
    fn deleting_a_missing_document_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        assert!(store.delete_comment(&CommentID("gone".into())).is_ok());
    }
}
