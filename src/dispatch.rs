//! Turns raw command input into catalog calls. Each request is checked
//! against the permission table first, then its fields are validated, and
//! only then is the store contacted.

use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::access::{is_authorized, Operation, Role};
use crate::error::{CatalogError, CatalogResult, ValidationError};
use crate::models::{BookFields, BookRecord};
use crate::store::CatalogStore;

/// One command as typed by the user. Field values are raw text; the
/// dispatcher owns trimming and parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    CreateStore,
    DeleteStore,
    ClearTable,
    AddRecord {
        title: String,
        author: String,
        year: String,
    },
    SearchRecord {
        /// Label of the chosen search field, as presented by the front end.
        field: String,
        term: String,
    },
    UpdateRecord {
        id: String,
        title: String,
        author: String,
        year: String,
    },
    DeleteRecord {
        title: String,
    },
    ViewAll,
}

impl Request {
    pub fn operation(&self) -> Operation {
        match self {
            Request::CreateStore => Operation::CreateStore,
            Request::DeleteStore => Operation::DeleteStore,
            Request::ClearTable => Operation::ClearTable,
            Request::AddRecord { .. } => Operation::AddRecord,
            Request::SearchRecord { .. } => Operation::SearchRecord,
            Request::UpdateRecord { .. } => Operation::UpdateRecord,
            Request::DeleteRecord { .. } => Operation::DeleteRecord,
            Request::ViewAll => Operation::ViewAll,
        }
    }
}

/// Column a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Author,
    Year,
}

impl SearchField {
    pub const ALL: [SearchField; 3] = [SearchField::Title, SearchField::Author, SearchField::Year];

    pub fn label(self) -> &'static str {
        match self {
            SearchField::Title => "Title",
            SearchField::Author => "Author",
            SearchField::Year => "Year",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SearchField {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(SearchField::Title),
            "author" => Ok(SearchField::Author),
            "year" => Ok(SearchField::Year),
            _ => Err(CatalogError::Internal(format!("unknown search field: {s}"))),
        }
    }
}

/// What a successful request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A mutation went through.
    Confirmed(String),
    /// Rows from a search or listing, one line each, in store order.
    Report { heading: &'static str, body: String },
    /// A search matched nothing.
    NotFound,
    /// The catalog holds no records.
    Empty,
}

impl Outcome {
    /// Short line for the status footer.
    pub fn message(&self) -> String {
        match self {
            Outcome::Confirmed(text) => text.clone(),
            Outcome::Report { heading, body } => {
                format!("{heading}: {} record(s)", body.lines().count())
            }
            Outcome::NotFound => "Book not found.".to_string(),
            Outcome::Empty => "The catalog is empty.".to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Outcome::Confirmed(_) => "confirmed",
            Outcome::Report { .. } => "report",
            Outcome::NotFound => "not_found",
            Outcome::Empty => "empty",
        }
    }
}

/// Runs requests for one session. The role is fixed at construction and
/// travels with every store call.
pub struct Dispatcher<S> {
    role: Role,
    store: S,
}

impl<S: CatalogStore> Dispatcher<S> {
    pub fn new(role: Role, store: S) -> Self {
        Self { role, store }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check the permission table for this session's role.
    pub fn authorize(&self, operation: Operation) -> CatalogResult<()> {
        if is_authorized(self.role, operation) {
            Ok(())
        } else {
            Err(CatalogError::Unauthorized {
                operation,
                required: operation.required_role(),
            })
        }
    }

    /// Authorize, validate, then run a request against the store.
    pub fn dispatch(&self, request: Request) -> CatalogResult<Outcome> {
        let operation = request.operation();
        let result = self
            .authorize(operation)
            .and_then(|()| self.execute(request));

        match &result {
            Ok(outcome) => {
                info!(role = %self.role, %operation, outcome = outcome.kind(), "operation finished")
            }
            Err(err) => {
                warn!(role = %self.role, %operation, kind = %err.kind(), error = %err, "operation failed")
            }
        }
        result
    }

    /// Confirm the session role can reach the catalog.
    pub fn probe(&self) -> CatalogResult<()> {
        self.store.probe(self.role)
    }

    fn execute(&self, request: Request) -> CatalogResult<Outcome> {
        let role = self.role;
        match request {
            Request::CreateStore => {
                self.store.create_catalog(role)?;
                Ok(Outcome::Confirmed("Database created.".into()))
            }
            Request::DeleteStore => {
                self.store.drop_catalog()?;
                Ok(Outcome::Confirmed("Database deleted.".into()))
            }
            Request::ClearTable => {
                self.store.clear_records(role)?;
                Ok(Outcome::Confirmed("Table cleared.".into()))
            }
            Request::AddRecord {
                title,
                author,
                year,
            } => {
                let book = RawBook::present(&title, &author, &year)?.parse()?;
                self.store.add_record(role, &book)?;
                Ok(Outcome::Confirmed(format!("Added \"{}\".", book.title)))
            }
            Request::SearchRecord { field, term } => {
                let field: SearchField = field.parse()?;
                let term = required("search term", &term)?;
                let books = match field {
                    SearchField::Title => self.store.find_by_title(role, term)?,
                    SearchField::Author => self.store.find_by_author(role, term)?,
                    SearchField::Year => {
                        let year = integer("year", term)?;
                        self.store.find_by_year(role, year)?
                    }
                };
                Ok(report("Search results", &books).unwrap_or(Outcome::NotFound))
            }
            Request::UpdateRecord {
                id,
                title,
                author,
                year,
            } => {
                let id = required("id", &id)?;
                let fields = RawBook::present(&title, &author, &year)?;
                let id = integer("id", id)?;
                let book = fields.parse()?;
                self.store.update_record(role, id, &book)?;
                Ok(Outcome::Confirmed(format!("Updated book {id}.")))
            }
            Request::DeleteRecord { title } => {
                let title = required("title", &title)?;
                self.store.delete_record_by_title(role, title)?;
                Ok(Outcome::Confirmed(format!("Deleted \"{title}\".")))
            }
            Request::ViewAll => {
                let books = self.store.list_all(role)?;
                Ok(report("All records", &books).unwrap_or(Outcome::Empty))
            }
        }
    }
}

/// Record fields that are known to be non-empty but not yet parsed.
struct RawBook<'a> {
    title: &'a str,
    author: &'a str,
    year: &'a str,
}

impl<'a> RawBook<'a> {
    fn present(title: &'a str, author: &'a str, year: &'a str) -> Result<Self, ValidationError> {
        Ok(Self {
            title: required("title", title)?,
            author: required("author", author)?,
            year: required("year", year)?,
        })
    }

    fn parse(self) -> Result<BookFields, ValidationError> {
        Ok(BookFields {
            title: self.title.to_string(),
            author: self.author.to_string(),
            year: integer("year", self.year)?,
        })
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Incomplete { field })
    } else {
        Ok(trimmed)
    }
}

fn integer(field: &'static str, value: &str) -> Result<i64, ValidationError> {
    value.parse().map_err(|_| ValidationError::Malformed {
        field,
        value: value.to_string(),
    })
}

fn report(heading: &'static str, books: &[BookRecord]) -> Option<Outcome> {
    if books.is_empty() {
        return None;
    }
    let body = books
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    Some(Outcome::Report { heading, body })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::{ConnectionError, ErrorKind};

    /// Store stub that records every call and serves canned rows.
    #[derive(Default)]
    struct RecordingStore {
        calls: RefCell<Vec<String>>,
        rows: Vec<BookRecord>,
        unreachable: bool,
    }

    impl RecordingStore {
        fn with_rows(rows: Vec<BookRecord>) -> Self {
            Self {
                rows,
                ..Self::default()
            }
        }

        fn record(&self, call: String) -> CatalogResult<()> {
            self.calls.borrow_mut().push(call);
            if self.unreachable {
                Err(ConnectionError::MissingDatabase("library".into()).into())
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl CatalogStore for RecordingStore {
        fn create_catalog(&self, role: Role) -> CatalogResult<()> {
            self.record(format!("create_catalog({role})"))
        }

        fn drop_catalog(&self) -> CatalogResult<()> {
            self.record("drop_catalog".into())
        }

        fn clear_records(&self, role: Role) -> CatalogResult<()> {
            self.record(format!("clear_records({role})"))
        }

        fn add_record(&self, role: Role, book: &BookFields) -> CatalogResult<()> {
            self.record(format!(
                "add_record({role}, {}, {}, {})",
                book.title, book.author, book.year
            ))
        }

        fn find_by_title(&self, role: Role, title: &str) -> CatalogResult<Vec<BookRecord>> {
            self.record(format!("find_by_title({role}, {title})"))?;
            Ok(self.rows.clone())
        }

        fn find_by_author(&self, role: Role, author: &str) -> CatalogResult<Vec<BookRecord>> {
            self.record(format!("find_by_author({role}, {author})"))?;
            Ok(self.rows.clone())
        }

        fn find_by_year(&self, role: Role, year: i64) -> CatalogResult<Vec<BookRecord>> {
            self.record(format!("find_by_year({role}, {year})"))?;
            Ok(self.rows.clone())
        }

        fn update_record(&self, role: Role, id: i64, book: &BookFields) -> CatalogResult<()> {
            self.record(format!(
                "update_record({role}, {id}, {}, {}, {})",
                book.title, book.author, book.year
            ))
        }

        fn delete_record_by_title(&self, role: Role, title: &str) -> CatalogResult<()> {
            self.record(format!("delete_record_by_title({role}, {title})"))
        }

        fn list_all(&self, role: Role) -> CatalogResult<Vec<BookRecord>> {
            self.record(format!("list_all({role})"))?;
            Ok(self.rows.clone())
        }

        fn probe(&self, role: Role) -> CatalogResult<()> {
            self.record(format!("probe({role})"))
        }
    }

    fn book(id: i64, title: &str, author: &str, year: i64) -> BookRecord {
        BookRecord {
            id,
            title: title.into(),
            author: author.into(),
            year,
        }
    }

    fn add(title: &str, author: &str, year: &str) -> Request {
        Request::AddRecord {
            title: title.into(),
            author: author.into(),
            year: year.into(),
        }
    }

    fn update(id: &str, title: &str, author: &str, year: &str) -> Request {
        Request::UpdateRecord {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            year: year.into(),
        }
    }

    fn search(field: &str, term: &str) -> Request {
        Request::SearchRecord {
            field: field.into(),
            term: term.into(),
        }
    }

    fn sample_requests() -> Vec<Request> {
        vec![
            Request::CreateStore,
            Request::DeleteStore,
            Request::ClearTable,
            add("Dune", "Herbert", "1965"),
            search("title", "Dune"),
            update("1", "Dune", "Herbert", "1965"),
            Request::DeleteRecord {
                title: "Dune".into(),
            },
            Request::ViewAll,
        ]
    }

    #[test]
    fn guest_add_is_denied_without_store_contact() {
        let dispatcher = Dispatcher::new(Role::Guest, RecordingStore::default());
        let err = dispatcher
            .dispatch(add("Dune", "Herbert", "1965"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(err.to_string().contains("Add Record"));
        assert!(err.to_string().contains("Moderator"));
        assert!(dispatcher.store().calls().is_empty());
    }

    #[test]
    fn denied_requests_never_reach_the_store() {
        for role in Role::ALL {
            for request in sample_requests() {
                let operation = request.operation();
                let dispatcher = Dispatcher::new(role, RecordingStore::default());
                let result = dispatcher.dispatch(request);
                if is_authorized(role, operation) {
                    assert_eq!(dispatcher.store().calls().len(), 1, "{role} / {operation}");
                } else {
                    assert_eq!(result.unwrap_err().kind(), ErrorKind::Authorization);
                    assert!(dispatcher.store().calls().is_empty(), "{role} / {operation}");
                }
            }
        }
    }

    #[test]
    fn authorization_is_checked_before_validation() {
        let dispatcher = Dispatcher::new(Role::Guest, RecordingStore::default());
        let err = dispatcher.dispatch(add("", "", "abc")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn malformed_numbers_abort_before_store() {
        let cases = [
            add("Dune", "Herbert", "nineteen"),
            add("Dune", "Herbert", "19.65"),
            update("seven", "X", "Y", "2000"),
            update("7", "X", "Y", "not-a-number"),
            search("year", "sixties"),
        ];
        for request in cases {
            let dispatcher = Dispatcher::new(Role::Administrator, RecordingStore::default());
            let err = dispatcher.dispatch(request.clone()).unwrap_err();
            assert!(
                matches!(
                    err,
                    CatalogError::Validation(ValidationError::Malformed { .. })
                ),
                "{request:?} -> {err}"
            );
            assert!(dispatcher.store().calls().is_empty(), "{request:?}");
        }
    }

    #[test]
    fn update_with_bad_year_reports_the_field() {
        let dispatcher = Dispatcher::new(Role::Administrator, RecordingStore::default());
        let err = dispatcher
            .dispatch(update("7", "X", "Y", "not-a-number"))
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Validation(ValidationError::Malformed { field: "year", ref value })
                if value == "not-a-number"
        ));
        assert!(dispatcher.store().calls().is_empty());
    }

    #[test]
    fn missing_fields_abort_before_store() {
        let cases = [
            (add("", "Herbert", "1965"), "title"),
            (add("Dune", "   ", "1965"), "author"),
            (add("Dune", "Herbert", ""), "year"),
            (update("", "X", "Y", "2000"), "id"),
            (update("7", "", "Y", "2000"), "title"),
            (update("7", "X", "", "2000"), "author"),
            (update("7", "X", "Y", ""), "year"),
            (
                Request::DeleteRecord {
                    title: " ".into(),
                },
                "title",
            ),
            (search("author", ""), "search term"),
        ];
        for (request, expected) in cases {
            let dispatcher = Dispatcher::new(Role::Moderator, RecordingStore::default());
            let err = dispatcher.dispatch(request.clone()).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("incomplete input: {expected} is required"),
                "{request:?}"
            );
            assert!(dispatcher.store().calls().is_empty(), "{request:?}");
        }
    }

    #[test]
    fn incomplete_input_wins_over_malformed_numbers() {
        let dispatcher = Dispatcher::new(Role::Moderator, RecordingStore::default());
        let err = dispatcher.dispatch(update("abc", "", "Y", "2000")).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Validation(ValidationError::Incomplete { field: "title" })
        ));
    }

    #[test]
    fn fields_are_trimmed_before_the_store_sees_them() {
        let dispatcher = Dispatcher::new(Role::Moderator, RecordingStore::default());
        dispatcher
            .dispatch(add("  Dune ", "Herbert ", " 1965 "))
            .unwrap();
        assert_eq!(
            dispatcher.store().calls(),
            vec!["add_record(Moderator, Dune, Herbert, 1965)"]
        );
    }

    #[test]
    fn search_selection_maps_to_lookup_procedure() {
        let dispatcher = Dispatcher::new(Role::Guest, RecordingStore::default());
        dispatcher.dispatch(search("Title", "Dune")).unwrap();
        dispatcher.dispatch(search("author", "Herbert")).unwrap();
        dispatcher.dispatch(search("YEAR", "1965")).unwrap();
        assert_eq!(
            dispatcher.store().calls(),
            vec![
                "find_by_title(Guest, Dune)",
                "find_by_author(Guest, Herbert)",
                "find_by_year(Guest, 1965)",
            ]
        );
    }

    #[test]
    fn unknown_search_field_is_internal_error() {
        let dispatcher = Dispatcher::new(Role::Guest, RecordingStore::default());
        let err = dispatcher.dispatch(search("isbn", "123")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(dispatcher.store().calls().is_empty());
    }

    #[test]
    fn empty_results_are_not_errors() {
        let dispatcher = Dispatcher::new(Role::Moderator, RecordingStore::default());
        assert_eq!(
            dispatcher.dispatch(search("title", "Dune")).unwrap(),
            Outcome::NotFound
        );
        assert_eq!(dispatcher.dispatch(Request::ViewAll).unwrap(), Outcome::Empty);
    }

    #[test]
    fn reports_keep_store_order() {
        let rows = vec![
            book(9, "Zebra", "Ann", 2001),
            book(2, "Apple", "Bob", 1999),
        ];
        let dispatcher = Dispatcher::new(Role::Guest, RecordingStore::with_rows(rows));
        let outcome = dispatcher.dispatch(Request::ViewAll).unwrap();
        assert_eq!(
            outcome,
            Outcome::Report {
                heading: "All records",
                body: "ID: 9  Title: Zebra  Author: Ann  Year: 2001\n\
                       ID: 2  Title: Apple  Author: Bob  Year: 1999"
                    .into(),
            }
        );
        assert_eq!(outcome.message(), "All records: 2 record(s)");
    }

    #[test]
    fn store_failures_surface_unchanged() {
        let store = RecordingStore {
            unreachable: true,
            ..RecordingStore::default()
        };
        let dispatcher = Dispatcher::new(Role::Administrator, store);
        let err = dispatcher.dispatch(Request::ClearTable).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(err.to_string(), "database \"library\" does not exist");
        // No retry.
        assert_eq!(dispatcher.store().calls().len(), 1);
    }

    #[test]
    fn lifecycle_requests_pass_the_session_role() {
        let dispatcher = Dispatcher::new(Role::Administrator, RecordingStore::default());
        dispatcher.dispatch(Request::CreateStore).unwrap();
        dispatcher.dispatch(Request::DeleteStore).unwrap();
        assert_eq!(
            dispatcher.store().calls(),
            vec!["create_catalog(Administrator)", "drop_catalog"]
        );
    }
}
