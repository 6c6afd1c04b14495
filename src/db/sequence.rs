use std::{cmp::Ordering, collections::HashMap};

use super::DB;

use crate::data::{UserID, TopicID, Topic, BookID, Book, CommentID, Comment};

/// How many books the "most read" sidebar shows.
pub const MOST_READ_LIMIT: usize = 15;

fn default_book_order(a: &(&BookID, &Book), b: &(&BookID, &Book)) -> Ordering {
    b.1.updated.cmp(&a.1.updated)
        .then_with(|| b.1.created.cmp(&a.1.created))
        .then_with(|| a.0.cmp(b.0))
}

impl DB {
    /// All books, most recently updated first.
    pub fn sorted_books(&self) -> Vec<(&BookID, &Book)> {
        let mut books = self.books.iter().collect::<Vec<_>>();
        books.sort_unstable_by(default_book_order);
        books
    }

    pub fn sorted_topics(&self) -> Vec<(&TopicID, &Topic)> {
        let mut topics = self.topics.iter().collect::<Vec<_>>();
        topics.sort_unstable_by(|(a_id, a), (b_id, b)| a.name.cmp(&b.name).then_with(|| a_id.cmp(b_id)));
        topics
    }

    pub fn topic_book_counts(&self) -> HashMap<&TopicID, usize> {
        let mut counts = HashMap::new();
        for book in self.books.values() {
            *counts.entry(&book.topic).or_insert(0) += 1;
        }
        counts
    }

    /// Books by descending participant count; ties keep the default order.
    pub fn most_read(&self, limit: usize) -> Vec<(&BookID, &Book)> {
        let mut books = self.sorted_books();
        books.sort_by(|(_, a), (_, b)| b.readers().cmp(&a.readers()));
        books.truncate(limit);
        books
    }

    pub fn books_for_participant(&self, user: &UserID) -> Vec<(&BookID, &Book)> {
        self.sorted_books().into_iter()
            .filter(|(_, book)| book.participants.contains(user))
            .collect()
    }

    /// Comments on a book, newest first.
    pub fn comments_for_book(&self, book: &BookID) -> Vec<(&CommentID, &Comment)> {
        let mut comments = self.comments.iter()
            .filter(|(_, comment)| &comment.book == book)
            .collect::<Vec<_>>();
        comments.sort_unstable_by(|(a_id, a), (b_id, b)| b.created.cmp(&a.created).then_with(|| a_id.cmp(b_id)));
        comments
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::MOST_READ_LIMIT;
    use crate::db::{DB, store::Store, tests::{draft, test_user}};

    #[test]
    fn most_read_ranks_by_participants_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let host = test_user(&mut db, "admin");
        let readers = (0..5).map(|i| test_user(&mut db, &format!("reader{i}"))).collect::<Vec<_>>();
        let mut books = vec![];
        for i in 0..20 {
            books.push(db.create_new_book(&host, draft("Misc", &format!("Book {i}"), "Anon", "")).unwrap());
        }
        for (i, reader) in readers.iter().enumerate() {
            for book in &books[..=i] {
                db.add_participant(book, reader).unwrap();
            }
        }

        let ranking = db.most_read(MOST_READ_LIMIT);
        assert_eq!(ranking.len(), MOST_READ_LIMIT);
        assert_eq!(ranking[0].0, &books[0]);
        assert_eq!(ranking[0].1.readers(), 5);
        assert!(ranking.windows(2).all(|w| w[0].1.readers() >= w[1].1.readers()));
        assert_eq!(ranking[5].1.readers(), 0);
    }

    #[test]
    fn ties_keep_the_default_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let host = test_user(&mut db, "admin");
        let older = db.create_new_book(&host, draft("Misc", "Older", "Anon", "")).unwrap();
        let newer = db.create_new_book(&host, draft("Misc", "Newer", "Anon", "")).unwrap();
        db.books.get_mut(&older).unwrap().updated = Utc::now() - Duration::days(1);

        let ranking = db.most_read(MOST_READ_LIMIT);
        assert_eq!(ranking.iter().map(|(id, _)| (*id).clone()).collect::<Vec<_>>(), [newer, older]);
    }

    #[test]
    fn comments_are_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let host = test_user(&mut db, "admin");
        let book = db.create_new_book(&host, draft("Misc", "Book", "Anon", "")).unwrap();
        let first = db.try_comment("first", &book, &host).unwrap().unwrap();
        let second = db.try_comment("second", &book, &host).unwrap().unwrap();
        db.comments.get_mut(&first).unwrap().created = Utc::now() - Duration::hours(1);

        let comments = db.comments_for_book(&book);
        assert_eq!(comments.iter().map(|(id, _)| (*id).clone()).collect::<Vec<_>>(), [second, first]);
    }

    #[test]
    fn profile_books_are_those_the_user_opened() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let host = test_user(&mut db, "admin");
        let reader = test_user(&mut db, "reader");
        let read = db.create_new_book(&host, draft("Misc", "Read", "Anon", "")).unwrap();
        db.create_new_book(&host, draft("Misc", "Unread", "Anon", "")).unwrap();
        db.add_participant(&read, &reader).unwrap();

        let books = db.books_for_participant(&reader);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].0, &read);
        assert_eq!(db.topic_book_counts().values().sum::<usize>(), 2);
    }
}
