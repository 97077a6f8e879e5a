//! Core library surface for the library catalog front end.
//!
//! The crate gates a small book catalog behind three role tiers. Requests flow
//! through the permission table in [`access`], are validated and routed by the
//! [`dispatch::Dispatcher`], and reach the catalog through the
//! [`store::CatalogStore`] trait, implemented on SQLite by
//! [`db::SqliteCatalog`].
pub mod access;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod models;
pub mod store;
pub mod ui;

pub use access::{is_authorized, Operation, Role};
pub use config::{AppConfig, ConfigError, Credential};
pub use db::{ConnectionSelector, SqliteCatalog};
pub use dispatch::{Dispatcher, Outcome, Request, SearchField};
pub use error::{CatalogError, CatalogResult, ConnectionError, ErrorKind, StoreError, ValidationError};
pub use models::{BookFields, BookRecord};
pub use store::CatalogStore;

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
