use std::io;

use super::DB;

use crate::data::{UserID, BookID};

impl DB {
    /// Records that `user` opened the book. Returns whether they were newly added.
    pub fn add_participant(&mut self, book_id: &BookID, user: &UserID) -> io::Result<bool> {
        if self.is_participant(book_id, user) {
            return Ok(false);
        }
        let Some(current) = self.books.get(book_id) else {
            return Ok(false);
        };
        let mut book = current.clone();
        book.participants.push(user.clone());
        self.store.store_book(book_id, &book)?;
        self.books.insert(book_id.clone(), book);
        Ok(true)
    }

    pub fn is_participant(&self, book_id: &BookID, user: &UserID) -> bool {
        self.books.get(book_id).map_or(false, |book| book.participants.contains(user))
    }
}
