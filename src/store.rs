//! The catalog store seam. The dispatcher only ever talks to this trait, so
//! tests can swap in a stub and the SQLite-backed store stays an
//! implementation detail.

use crate::access::Role;
use crate::error::CatalogResult;
use crate::models::{BookFields, BookRecord};

/// Stored-procedure surface of the catalog. Every call acquires its own
/// connection and releases it before returning.
pub trait CatalogStore {
    /// Create the catalog database if absent, then install its schema while
    /// connected as `role`.
    fn create_catalog(&self, role: Role) -> CatalogResult<()>;

    /// Drop the catalog database if it exists.
    fn drop_catalog(&self) -> CatalogResult<()>;

    fn clear_records(&self, role: Role) -> CatalogResult<()>;

    fn add_record(&self, role: Role, book: &BookFields) -> CatalogResult<()>;

    fn find_by_title(&self, role: Role, title: &str) -> CatalogResult<Vec<BookRecord>>;

    fn find_by_author(&self, role: Role, author: &str) -> CatalogResult<Vec<BookRecord>>;

    fn find_by_year(&self, role: Role, year: i64) -> CatalogResult<Vec<BookRecord>>;

    fn update_record(&self, role: Role, id: i64, book: &BookFields) -> CatalogResult<()>;

    fn delete_record_by_title(&self, role: Role, title: &str) -> CatalogResult<()>;

    fn list_all(&self, role: Role) -> CatalogResult<Vec<BookRecord>>;

    /// Open and immediately release a connection as `role`. Used once at
    /// startup to tell the user whether the catalog is reachable.
    fn probe(&self, role: Role) -> CatalogResult<()>;
}
