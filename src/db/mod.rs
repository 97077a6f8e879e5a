//! Persistence module split across logical submodules: endpoint selection and
//! authentication in `connection`, the stored procedures in `catalog`.

mod catalog;
mod connection;

pub use catalog::SqliteCatalog;
pub use connection::{CatalogConnection, ConnectionSelector, SystemConnection};
