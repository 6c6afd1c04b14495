use crate::data::{BookID, Book};

use super::DB;

impl DB {
    /// Books whose topic name, name, description or author contains `query`, ignoring case.
    pub fn search_books(&self, query: &str) -> Vec<(&BookID, &Book)> {
        let query = query.to_lowercase();
        self.sorted_books().into_iter()
            .filter(|(_, book)| self.match_book_to_query(book, query.as_str()))
            .collect()
    }

    /// Each author once, in the order their first book appears.
    pub fn distinct_authors(&self) -> Vec<&str> {
        let mut authors: Vec<&str> = vec![];
        for (_, book) in self.sorted_books() {
            if !authors.contains(&book.author.as_str()) {
                authors.push(book.author.as_str());
            }
        }
        authors
    }

    fn match_book_to_query(&self, book: &Book, query: &str) -> bool {
        let topic = self.get_topic(&book.topic).map_or("", |x| x.name.as_str());
        [topic, book.name.as_str(), book.description.as_str(), book.author.as_str()]
            .iter()
            .any(|field| field.to_lowercase().contains(query))
    }
}
