use std::fs;
use std::io;

use rusqlite::{params, Row};
use tracing::info;

use crate::access::Role;
use crate::config::AppConfig;
use crate::error::{CatalogResult, StoreError};
use crate::models::{BookFields, BookRecord};
use crate::store::CatalogStore;

use super::connection::{CatalogConnection, ConnectionSelector};

/// Schema installed into a freshly created catalog.
const CATALOG_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS books (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        author TEXT NOT NULL,
        year INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS books_title ON books (title);
";

const BOOK_COLUMNS: &str = "SELECT id, title, author, year FROM books";

/// SQLite-backed catalog. Holds only the selector; connections are opened per
/// call and dropped before the call returns.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    selector: ConnectionSelector,
}

impl SqliteCatalog {
    pub fn new(selector: ConnectionSelector) -> Self {
        Self { selector }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ConnectionSelector::new(config))
    }

    fn connect(&self, role: Role) -> CatalogResult<CatalogConnection> {
        Ok(self.selector.connect(role)?)
    }

    /// Shared body of the lookup procedures: one query, rows in id order.
    fn query_books<P: rusqlite::Params>(
        &self,
        role: Role,
        procedure: &'static str,
        filter: &str,
        params: P,
    ) -> CatalogResult<Vec<BookRecord>> {
        let conn = self.connect(role)?;
        let mut stmt = conn
            .prepare(&format!("{BOOK_COLUMNS} {filter} ORDER BY id"))
            .map_err(StoreError::sql(procedure))?;

        let books = stmt
            .query_map(params, read_book)
            .map_err(StoreError::sql(procedure))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::sql(procedure))?;

        Ok(books)
    }
}

impl CatalogStore for SqliteCatalog {
    fn create_catalog(&self, role: Role) -> CatalogResult<()> {
        let name = self.selector.catalog_name().to_string();
        let path = self.selector.catalog_path();

        // Phase one runs on the administrative endpoint: register the
        // database and every role principal, then create the database file.
        {
            let sys = self.selector.connect_system()?;
            let tx = sys
                .unchecked_transaction()
                .map_err(StoreError::sql("CreateDatabase"))?;
            let created = tx
                .execute(
                    "INSERT OR IGNORE INTO databases (name, owner) VALUES (?1, ?2)",
                    params![name, sys.principal()],
                )
                .map_err(StoreError::sql("CreateDatabase"))?;
            for credential in self.selector.role_credentials() {
                if sys
                    .ensure_principal(credential)
                    .map_err(StoreError::sql("CreateRole"))?
                {
                    info!(principal = %credential.principal, "registered principal");
                }
            }
            tx.commit().map_err(StoreError::sql("CreateDatabase"))?;
            // An empty file is a valid, empty SQLite database.
            if !path.exists() {
                fs::File::create(&path).map_err(|source| StoreError::Io {
                    procedure: "CreateDatabase",
                    source,
                })?;
            }
            if created > 0 {
                info!(catalog = %name, "created catalog database");
            }
        }

        // Phase two connects to the new catalog itself as the session role.
        let conn = self.connect(role)?;
        conn.execute_batch(CATALOG_SCHEMA)
            .map_err(StoreError::sql("InstallSchema"))?;
        Ok(())
    }

    fn drop_catalog(&self) -> CatalogResult<()> {
        let sys = self.selector.connect_system()?;
        let name = self.selector.catalog_name();
        let removed = sys
            .execute("DELETE FROM databases WHERE name = ?1", [name])
            .map_err(StoreError::sql("DropDatabase"))?;

        match fs::remove_file(self.selector.catalog_path()) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StoreError::Io {
                    procedure: "DropDatabase",
                    source,
                }
                .into())
            }
        }

        if removed > 0 {
            info!(catalog = %name, "dropped catalog database");
        }
        Ok(())
    }

    fn clear_records(&self, role: Role) -> CatalogResult<()> {
        let conn = self.connect(role)?;
        conn.execute("DELETE FROM books", [])
            .map_err(StoreError::sql("ClearTable"))?;
        Ok(())
    }

    fn add_record(&self, role: Role, book: &BookFields) -> CatalogResult<()> {
        let conn = self.connect(role)?;
        conn.execute(
            "INSERT INTO books (title, author, year) VALUES (?1, ?2, ?3)",
            params![book.title, book.author, book.year],
        )
        .map_err(StoreError::sql("AddBook"))?;
        Ok(())
    }

    fn find_by_title(&self, role: Role, title: &str) -> CatalogResult<Vec<BookRecord>> {
        self.query_books(
            role,
            "FindBookByTitle",
            "WHERE title LIKE ?1 ESCAPE '\\'",
            [contains_pattern(title)],
        )
    }

    fn find_by_author(&self, role: Role, author: &str) -> CatalogResult<Vec<BookRecord>> {
        self.query_books(
            role,
            "FindBookByAuthor",
            "WHERE author LIKE ?1 ESCAPE '\\'",
            [contains_pattern(author)],
        )
    }

    fn find_by_year(&self, role: Role, year: i64) -> CatalogResult<Vec<BookRecord>> {
        self.query_books(role, "FindBookByYear", "WHERE year = ?1", [year])
    }

    fn update_record(&self, role: Role, id: i64, book: &BookFields) -> CatalogResult<()> {
        let conn = self.connect(role)?;
        let updated = conn
            .execute(
                "UPDATE books SET title = ?1, author = ?2, year = ?3 WHERE id = ?4",
                params![book.title, book.author, book.year, id],
            )
            .map_err(StoreError::sql("UpdateBook"))?;

        if updated == 0 {
            Err(StoreError::MissingId(id).into())
        } else {
            Ok(())
        }
    }

    fn delete_record_by_title(&self, role: Role, title: &str) -> CatalogResult<()> {
        let conn = self.connect(role)?;
        let deleted = conn
            .execute("DELETE FROM books WHERE title = ?1", [title])
            .map_err(StoreError::sql("DeleteBookByTitle"))?;

        if deleted == 0 {
            Err(StoreError::MissingTitle(title.to_string()).into())
        } else {
            Ok(())
        }
    }

    fn list_all(&self, role: Role) -> CatalogResult<Vec<BookRecord>> {
        self.query_books(role, "ViewAllRecords", "", [])
    }

    fn probe(&self, role: Role) -> CatalogResult<()> {
        self.connect(role).map(drop)
    }
}

fn read_book(row: &Row<'_>) -> rusqlite::Result<BookRecord> {
    Ok(BookRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        year: row.get(3)?,
    })
}

/// Case-insensitive substring pattern for `LIKE`, with the user's own
/// wildcard characters escaped.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Dune"), "%Dune%");
        assert_eq!(contains_pattern("100%_\\"), "%100\\%\\_\\\\%");
    }
}
