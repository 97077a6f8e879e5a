//! Domain models that mirror the catalog schema and get passed throughout the
//! TUI. These stay light-weight data holders; the store produces them and the
//! rest of the crate only renders them.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single catalog entry as returned by the store.
pub struct BookRecord {
    /// Primary key assigned by the store. Update requests refer back to it.
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Publication year. Kept as an integer so year searches match exactly.
    pub year: i64,
}

impl fmt::Display for BookRecord {
    /// One report line per record. Search and View All join these with
    /// newlines in the order the store returned them.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {}  Title: {}  Author: {}  Year: {}",
            self.id, self.title, self.author, self.year
        )
    }
}

/// Validated field values for a new or rewritten record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub year: i64,
}
