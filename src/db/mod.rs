use std::{collections::HashMap, io};

use chrono::Utc;
use rand::distributions::{Alphanumeric, DistString};

use crate::{data::{Topic, User, UserID, TopicID, BookID, Book, BookDraft, CommentID, Comment}, auth::PasswordStore};

use self::store::Store;

pub mod participation;
pub mod permissions;
pub mod search;
pub mod sequence;
pub mod store;

#[derive(Debug)]
pub struct DB {
    store: Store,

    topics: HashMap<TopicID, Topic>,
    users: HashMap<UserID, User>,
    books: HashMap<BookID, Book>,
    comments: HashMap<CommentID, Comment>,

    permissions: HashMap<UserID, Vec<Permission>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    Superuser,
}

fn gen_id<K, V>(taken: &HashMap<K, V>, make_id: fn(String) -> K) -> K where K: std::hash::Hash + Eq {
    loop {
        let id = make_id(Alphanumeric.sample_string(&mut rand::thread_rng(), 24));
        if !taken.contains_key(&id) {
            return id;
        }
    }
}

impl DB {
    pub fn open(store: Store) -> io::Result<Self> {
        let mut db = Self {
            store,
            topics: HashMap::new(),
            users: HashMap::new(),
            books: HashMap::new(),
            comments: HashMap::new(),
            permissions: HashMap::new(),
        };
        db.reload()?;
        Ok(db)
    }

    pub fn reload(&mut self) -> io::Result<()> {
        self.users = self.store.load_users()?;
        self.topics = self.store.load_topics()?;
        self.books = self.store.load_books()?;
        self.comments = self.store.load_comments()?;
        self.permissions = self.store.load_permissions()?;
        tracing::info!(
            root = %self.store.root().display(),
            users = self.users.len(),
            topics = self.topics.len(),
            books = self.books.len(),
            comments = self.comments.len(),
            "store loaded"
        );
        Ok(())
    }

    pub fn get_topic(&self, id: &TopicID) -> Option<&Topic> {
        self.topics.get(id)
    }

    pub fn get_user(&self, id: &UserID) -> Option<&User> {
        self.users.get(id)
    }

    pub fn get_book(&self, id: &BookID) -> Option<&Book> {
        self.books.get(id)
    }

    pub fn get_comment(&self, id: &CommentID) -> Option<&Comment> {
        self.comments.get(id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<(&UserID, &User)> {
        self.users.iter().find(|(_, user)| user.email.eq_ignore_ascii_case(email))
    }

    pub fn find_user_by_username(&self, username: &str) -> Option<(&UserID, &User)> {
        self.users.iter().find(|(_, user)| user.username.eq_ignore_ascii_case(username))
    }

    pub fn load_user_auth(&self, id: &UserID) -> io::Result<Option<PasswordStore>> {
        self.store.load_user_auth(id)
    }

    pub fn store_user_auth(&self, id: &UserID, password_store: &PasswordStore) -> io::Result<()> {
        self.store.store_user_auth(id, password_store)
    }
}

impl DB {
    /// Returns the topic with exactly this name, creating it on first use.
    pub fn get_or_create_topic(&mut self, name: &str) -> io::Result<TopicID> {
        if let Some((id, _)) = self.topics.iter().find(|(_, topic)| topic.name == name) {
            return Ok(id.clone());
        }
        let id = gen_id(&self.topics, TopicID);
        let topic = Topic { name: name.to_string() };
        self.store.store_topic(&id, &topic)?;
        self.topics.insert(id.clone(), topic);
        tracing::info!(topic = %id.0, name, "topic created");
        Ok(id)
    }

    pub fn create_new_user(&mut self, user: User, password_store: &PasswordStore) -> io::Result<UserID> {
        let id = gen_id(&self.users, UserID);
        self.store.store_user(&id, &user)?;
        self.store.store_user_auth(&id, password_store)?;
        self.users.insert(id.clone(), user);
        Ok(id)
    }

    pub fn update_user(&mut self, id: &UserID, user: User) -> io::Result<bool> {
        if !self.users.contains_key(id) {
            return Ok(false);
        }
        self.store.store_user(id, &user)?;
        self.users.insert(id.clone(), user);
        Ok(true)
    }

    pub fn create_new_book(&mut self, host: &UserID, draft: BookDraft) -> io::Result<BookID> {
        let topic = self.get_or_create_topic(draft.topic.as_str())?;
        let id = gen_id(&self.books, BookID);
        let now = Utc::now();
        let book = Book {
            name: draft.name,
            author: draft.author,
            description: draft.description,
            year: draft.year,
            image: draft.image,
            topic,
            host: host.clone(),
            participants: vec![],
            created: now,
            updated: now,
        };
        self.store.store_book(&id, &book)?;
        self.books.insert(id.clone(), book);
        Ok(id)
    }

    pub fn update_book(&mut self, id: &BookID, draft: BookDraft) -> io::Result<bool> {
        if !self.books.contains_key(id) {
            return Ok(false);
        }
        let topic = self.get_or_create_topic(draft.topic.as_str())?;
        let Some(current) = self.books.get(id) else {
            return Ok(false);
        };
        let book = Book {
            name: draft.name,
            author: draft.author,
            description: draft.description,
            year: draft.year,
            image: draft.image,
            topic,
            updated: Utc::now(),
            ..current.clone()
        };
        self.store.store_book(id, &book)?;
        self.books.insert(id.clone(), book);
        Ok(true)
    }

    /// Removes a book together with its comments.
    /// Each document leaves memory only once its file is gone.
    pub fn delete_book(&mut self, id: &BookID) -> io::Result<Option<Book>> {
        if !self.books.contains_key(id) {
            return Ok(None);
        }
        let comment_ids = self.comments.iter()
            .filter(|(_, comment)| &comment.book == id)
            .map(|(comment_id, _)| comment_id.clone())
            .collect::<Vec<_>>();
        for comment_id in comment_ids {
            self.store.delete_comment(&comment_id)?;
            self.comments.remove(&comment_id);
        }
        self.store.delete_book(id)?;
        Ok(self.books.remove(id))
    }

    pub fn try_comment(&mut self, body: &str, book_id: &BookID, user: &UserID) -> io::Result<Option<CommentID>> {
        if !(self.books.contains_key(book_id) && self.users.contains_key(user)) {
            return Ok(None);
        }
        let now = Utc::now();
        let comment = Comment {
            created: now,
            updated: now,
            user: user.clone(),
            book: book_id.clone(),
            body: body.to_string(),
        };
        let id = gen_id(&self.comments, CommentID);
        self.store.store_comment(&id, &comment)?;
        self.comments.insert(id.clone(), comment);
        Ok(Some(id))
    }

    pub fn delete_comment(&mut self, id: &CommentID) -> io::Result<Option<Comment>> {
        if !self.comments.contains_key(id) {
            return Ok(None);
        }
        self.store.delete_comment(id)?;
        Ok(self.comments.remove(id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn draft(topic: &str, name: &str, author: &str, description: &str) -> BookDraft {
        BookDraft {
            topic: topic.to_string(),
            name: name.to_string(),
            author: author.to_string(),
            description: description.to_string(),
            year: Some(1965),
            image: "/static/covers/default.png".to_string(),
        }
    }

    pub(crate) fn test_user(db: &mut DB, username: &str) -> UserID {
        let user = User::new(username.to_string(), format!("{username}@example.com"), username.to_string());
        let password = PasswordStore { salt: "salt".to_string(), hashed: "hash".to_string() };
        db.create_new_user(user, &password).unwrap()
    }

    /// Puts a directory where a document file belongs, so writing or removing it fails.
    pub(crate) fn block_document(root: &std::path::Path, dir: &str, id: &str) {
        let path = root.join(dir).join(format!("{id}.json"));
        let _ = std::fs::remove_file(&path);
        std::fs::create_dir_all(path.join("blocker")).unwrap();
    }

    #[test]
    fn failed_book_update_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let host = test_user(&mut db, "admin");
        let book = db.create_new_book(&host, draft("Sci-Fi", "Dune", "Frank Herbert", "Spice")).unwrap();
        let before = db.get_book(&book).unwrap().updated;
        block_document(dir.path(), "books", &book.0);

        assert!(db.update_book(&book, draft("Sci-Fi", "Changed", "Someone", "Else")).is_err());
        let kept = db.get_book(&book).unwrap();
        assert_eq!(kept.name, "Dune");
        assert_eq!(kept.author, "Frank Herbert");
        assert_eq!(kept.updated, before);
    }

    #[test]
    fn failed_deletes_keep_documents_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let host = test_user(&mut db, "admin");
        let book = db.create_new_book(&host, draft("Sci-Fi", "Dune", "Frank Herbert", "Spice")).unwrap();
        let comment = db.try_comment("great", &book, &host).unwrap().unwrap();

        block_document(dir.path(), "comments", &comment.0);
        assert!(db.delete_comment(&comment).is_err());
        assert!(db.get_comment(&comment).is_some());

        assert!(db.delete_book(&book).is_err());
        assert!(db.get_book(&book).is_some());
        assert!(db.get_comment(&comment).is_some());
    }

    #[test]
    fn failed_book_delete_keeps_the_book() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let host = test_user(&mut db, "admin");
        let book = db.create_new_book(&host, draft("Sci-Fi", "Dune", "Frank Herbert", "Spice")).unwrap();
        let comment = db.try_comment("great", &book, &host).unwrap().unwrap();
        block_document(dir.path(), "books", &book.0);

        assert!(db.delete_book(&book).is_err());
        assert!(db.get_book(&book).is_some());
        assert!(db.get_comment(&comment).is_none());
        assert!(!dir.path().join("comments").join(format!("{}.json", comment.0)).exists());
    }

    #[test]
    fn same_topic_name_is_shared_between_books() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let host = test_user(&mut db, "admin");
        let first = db.create_new_book(&host, draft("Sci-Fi", "Dune", "Frank Herbert", "Spice")).unwrap();
        let second = db.create_new_book(&host, draft("Sci-Fi", "Foundation", "Isaac Asimov", "Empire")).unwrap();

        assert_eq!(db.topics.len(), 1);
        assert_eq!(db.get_book(&first).unwrap().topic, db.get_book(&second).unwrap().topic);
        let topic = db.get_book(&first).unwrap().topic.clone();
        assert_eq!(db.get_topic(&topic).unwrap().name, "Sci-Fi");
    }

    #[test]
    fn topic_names_are_matched_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let a = db.get_or_create_topic("Poetry").unwrap();
        let b = db.get_or_create_topic("poetry").unwrap();
        assert_ne!(a, b);
        assert_eq!(db.get_or_create_topic("Poetry").unwrap(), a);
    }

    #[test]
    fn reopening_the_store_sees_previous_writes() {
        let dir = tempfile::tempdir().unwrap();
        let (book, comment) = {
            let mut db = DB::open(Store::new(dir.path())).unwrap();
            let host = test_user(&mut db, "admin");
            let book = db.create_new_book(&host, draft("Sci-Fi", "Dune", "Frank Herbert", "Spice")).unwrap();
            let comment = db.try_comment("great", &book, &host).unwrap().unwrap();
            (book, comment)
        };
        let db = DB::open(Store::new(dir.path())).unwrap();
        let loaded = db.get_book(&book).unwrap();
        assert_eq!(loaded.name, "Dune");
        assert_eq!(loaded.year, Some(1965));
        assert_eq!(db.get_comment(&comment).unwrap().body, "great");
        assert!(db.find_user_by_email("ADMIN@example.com").is_some());
    }

    #[test]
    fn updating_a_book_moves_it_to_another_topic() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let host = test_user(&mut db, "admin");
        let book = db.create_new_book(&host, draft("Sci-Fi", "Dune", "Frank Herbert", "Spice")).unwrap();
        assert!(db.update_book(&book, draft("Classics", "Dune", "F. Herbert", "Spice")).unwrap());

        let updated = db.get_book(&book).unwrap();
        assert_eq!(updated.author, "F. Herbert");
        assert_eq!(db.get_topic(&updated.topic).unwrap().name, "Classics");
        assert!(!db.update_book(&BookID("missing".into()), draft("x", "y", "z", "w")).unwrap());
    }

    #[test]
    fn deleting_a_book_removes_its_comments() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let host = test_user(&mut db, "admin");
        let book = db.create_new_book(&host, draft("Sci-Fi", "Dune", "Frank Herbert", "Spice")).unwrap();
        let other = db.create_new_book(&host, draft("Sci-Fi", "Foundation", "Isaac Asimov", "Empire")).unwrap();
        let doomed = db.try_comment("first", &book, &host).unwrap().unwrap();
        let kept = db.try_comment("second", &other, &host).unwrap().unwrap();

        assert!(db.delete_book(&book).unwrap().is_some());
        assert!(db.get_book(&book).is_none());
        assert!(db.get_comment(&doomed).is_none());
        assert!(db.get_comment(&kept).is_some());

        let reopened = DB::open(Store::new(dir.path())).unwrap();
        assert!(reopened.get_comment(&doomed).is_none());
    }

    #[test]
    fn comments_need_an_existing_book_and_user() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let host = test_user(&mut db, "admin");
        assert!(db.try_comment("hello", &BookID("missing".into()), &host).unwrap().is_none());
    }
}
