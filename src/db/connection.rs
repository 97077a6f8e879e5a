use std::collections::BTreeMap;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::access::Role;
use crate::config::{AppConfig, Credential};
use crate::error::ConnectionError;

/// File name of the administrative endpoint inside the data directory.
const SYSTEM_DB_FILE: &str = "system.sqlite";

/// Cluster registry kept on the administrative endpoint. Principals hold a
/// digest of their secret, never the secret itself.
const SYSTEM_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS principals (
        name TEXT PRIMARY KEY,
        secret_digest TEXT NOT NULL,
        superuser INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS databases (
        name TEXT PRIMARY KEY,
        owner TEXT NOT NULL
    );
";

/// Resolves a role (or the system principal) to a live connection. Nothing is
/// cached: each call reads the credential table and authenticates again.
#[derive(Debug, Clone)]
pub struct ConnectionSelector {
    data_dir: PathBuf,
    catalog: String,
    system: Credential,
    roles: BTreeMap<Role, Credential>,
}

impl ConnectionSelector {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            catalog: config.catalog.clone(),
            system: config.system.clone(),
            roles: config.roles.clone(),
        }
    }

    pub fn catalog_name(&self) -> &str {
        &self.catalog
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.sqlite", self.catalog))
    }

    fn system_path(&self) -> PathBuf {
        self.data_dir.join(SYSTEM_DB_FILE)
    }

    /// Credential for a role. A missing entry means the table and the role
    /// enum have drifted apart.
    pub fn credential(&self, role: Role) -> Result<&Credential, ConnectionError> {
        self.roles
            .get(&role)
            .ok_or(ConnectionError::MissingCredential(role))
    }

    /// Every role credential, in role order. Catalog creation registers these
    /// as principals.
    pub fn role_credentials(&self) -> impl Iterator<Item = &Credential> {
        self.roles.values()
    }

    /// Connect to the administrative endpoint as the system principal. The
    /// very first connection initializes the registry and records the system
    /// principal with the configured secret.
    pub fn connect_system(&self) -> Result<SystemConnection, ConnectionError> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.system_path();
        let conn = open_endpoint(&path, OpenFlags::default())?;
        conn.execute_batch(SYSTEM_SCHEMA)
            .map_err(|source| engine_error(&path, source))?;

        let principal = &self.system.principal;
        let existing = lookup_principal(&conn, principal).map_err(|e| engine_error(&path, e))?;
        match existing {
            Some(record) => {
                if record.digest != digest(&self.system.secret) {
                    return Err(ConnectionError::AuthenticationFailed(principal.clone()));
                }
                if !record.superuser {
                    return Err(ConnectionError::NotSuperuser(principal.clone()));
                }
            }
            None => {
                let superusers: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM principals WHERE superuser = 1",
                        [],
                        |row| row.get(0),
                    )
                    .map_err(|e| engine_error(&path, e))?;
                if superusers > 0 {
                    return Err(ConnectionError::UnknownPrincipal(principal.clone()));
                }
                conn.execute(
                    "INSERT INTO principals (name, secret_digest, superuser) VALUES (?1, ?2, 1)",
                    params![principal, digest(&self.system.secret)],
                )
                .map_err(|e| engine_error(&path, e))?;
                info!(principal = %principal, "initialized administrative endpoint");
            }
        }

        debug!(principal = %principal, "opened system connection");
        Ok(SystemConnection {
            conn,
            principal: principal.clone(),
        })
    }

    /// Connect to the catalog endpoint as `role`. Authentication happens
    /// against the administrative registry, which is opened read-only and
    /// closed again before the catalog file is opened.
    pub fn connect(&self, role: Role) -> Result<CatalogConnection, ConnectionError> {
        let credential = self.credential(role)?;
        self.authenticate(credential)?;

        let path = self.catalog_path();
        if !path.exists() {
            return Err(ConnectionError::MissingDatabase(self.catalog.clone()));
        }
        let conn = open_endpoint(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        debug!(principal = %credential.principal, catalog = %self.catalog, "opened catalog connection");
        Ok(CatalogConnection {
            conn,
            principal: credential.principal.clone(),
        })
    }

    fn authenticate(&self, credential: &Credential) -> Result<(), ConnectionError> {
        let path = self.system_path();
        if !path.exists() {
            // No cluster yet means no principals either.
            return Err(ConnectionError::UnknownPrincipal(credential.principal.clone()));
        }
        let registry = open_endpoint(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let record = lookup_principal(&registry, &credential.principal)
            .map_err(|e| engine_error(&path, e))?
            .ok_or_else(|| ConnectionError::UnknownPrincipal(credential.principal.clone()))?;
        if record.digest != digest(&credential.secret) {
            return Err(ConnectionError::AuthenticationFailed(
                credential.principal.clone(),
            ));
        }

        let registered: Option<String> = registry
            .query_row(
                "SELECT name FROM databases WHERE name = ?1",
                [&self.catalog],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| engine_error(&path, e))?;
        if registered.is_none() {
            return Err(ConnectionError::MissingDatabase(self.catalog.clone()));
        }
        Ok(())
    }
}

/// Connection to the administrative endpoint. Closed when dropped.
#[derive(Debug)]
pub struct SystemConnection {
    conn: Connection,
    principal: String,
}

impl SystemConnection {
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Register a principal, or bring an existing one's secret in line with
    /// the credential table. Superusers are never rewritten. Returns whether
    /// the principal is new.
    pub fn ensure_principal(&self, credential: &Credential) -> rusqlite::Result<bool> {
        let existed = lookup_principal(&self.conn, &credential.principal)?.is_some();
        self.conn.execute(
            "INSERT INTO principals (name, secret_digest, superuser) VALUES (?1, ?2, 0)
             ON CONFLICT(name) DO UPDATE SET secret_digest = excluded.secret_digest
             WHERE principals.superuser = 0",
            params![credential.principal, digest(&credential.secret)],
        )?;
        Ok(!existed)
    }
}

impl Deref for SystemConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for SystemConnection {
    fn drop(&mut self) {
        debug!(principal = %self.principal, "released system connection");
    }
}

/// Connection to the catalog endpoint under one role's principal. Closed when
/// dropped, whichever way the operation holding it ends.
#[derive(Debug)]
pub struct CatalogConnection {
    conn: Connection,
    principal: String,
}

impl Deref for CatalogConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for CatalogConnection {
    fn drop(&mut self) {
        debug!(principal = %self.principal, "released catalog connection");
    }
}

struct PrincipalRecord {
    digest: String,
    superuser: bool,
}

fn lookup_principal(conn: &Connection, name: &str) -> rusqlite::Result<Option<PrincipalRecord>> {
    conn.query_row(
        "SELECT secret_digest, superuser FROM principals WHERE name = ?1",
        [name],
        |row| {
            Ok(PrincipalRecord {
                digest: row.get(0)?,
                superuser: row.get(1)?,
            })
        },
    )
    .optional()
}

fn open_endpoint(path: &Path, flags: OpenFlags) -> Result<Connection, ConnectionError> {
    Connection::open_with_flags(path, flags).map_err(|source| engine_error(path, source))
}

fn engine_error(path: &Path, source: rusqlite::Error) -> ConnectionError {
    ConnectionError::Engine {
        endpoint: path.display().to_string(),
        source,
    }
}

fn digest(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}
