//! Configuration file parsing. The file supplies the system principal's
//! secret (required) plus optional overrides for the data directory, the
//! catalog name, and the per-role credential table.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::access::Role;

/// Folder name used beneath the user's home directory for the database files.
const DATA_DIR_NAME: &str = ".library-catalog";
const DEFAULT_SYSTEM_USER: &str = "postgres";
const DEFAULT_CATALOG: &str = "library";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// A principal name and its secret. Looked up fresh for every connection.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub principal: String,
    pub secret: String,
}

impl Credential {
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Resolved configuration ready to hand to the connection selector.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub catalog: String,
    pub system: Credential,
    pub roles: BTreeMap<Role, Credential>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    database: RawDatabase,
    #[serde(default)]
    credentials: BTreeMap<String, RawCredential>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDatabase {
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    catalog: Option<String>,
    #[serde(default)]
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCredential {
    #[serde(default)]
    user: Option<String>,
    password: String,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;

        let password = raw
            .database
            .password
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::Validation("database.password is required".into()))?;
        let user = raw
            .database
            .user
            .unwrap_or_else(|| DEFAULT_SYSTEM_USER.to_string());
        let catalog = raw
            .database
            .catalog
            .unwrap_or_else(|| DEFAULT_CATALOG.to_string());
        if !is_plain_name(&catalog) {
            return Err(ConfigError::Validation(format!(
                "database.catalog must be alphanumeric, got \"{catalog}\""
            )));
        }

        let data_dir = match raw.database.data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };

        let mut roles = default_role_credentials();
        for (key, entry) in raw.credentials {
            let role: Role = key.parse().map_err(ConfigError::Validation)?;
            let principal = entry.user.unwrap_or_else(|| role.principal().to_string());
            roles.insert(role, Credential::new(principal, entry.password));
        }

        Ok(Self {
            data_dir,
            catalog,
            system: Credential::new(user, password),
            roles,
        })
    }

    /// Configuration rooted at an explicit directory, used by tests and tools
    /// that do not read a file.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>, system_secret: &str) -> Self {
        Self {
            data_dir: data_dir.into(),
            catalog: DEFAULT_CATALOG.to_string(),
            system: Credential::new(DEFAULT_SYSTEM_USER, system_secret),
            roles: default_role_credentials(),
        }
    }
}

/// Every role connects as its own principal with the stock password.
pub fn default_role_credentials() -> BTreeMap<Role, Credential> {
    Role::ALL
        .into_iter()
        .map(|role| {
            let principal = role.principal();
            (role, Credential::new(principal, format!("{principal}_password")))
        })
        .collect()
}

fn default_data_dir() -> Result<PathBuf, ConfigError> {
    let base_dirs = BaseDirs::new()
        .ok_or_else(|| ConfigError::Validation("could not locate home directory".into()))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

/// Catalog names become file names, so keep them to `[A-Za-z0-9_]`.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [database]
            password = "s3cret"
            data_dir = "/tmp/catalog"
            "#,
        )
        .unwrap();

        assert_eq!(config.system, Credential::new("postgres", "s3cret"));
        assert_eq!(config.catalog, "library");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/catalog"));
        assert_eq!(config.roles.len(), 3);
        assert_eq!(
            config.roles[&Role::Moderator],
            Credential::new("moderator", "moderator_password")
        );
    }

    #[test]
    fn role_credentials_can_be_overridden() {
        let config = AppConfig::from_toml(
            r#"
            [database]
            password = "x"
            data_dir = "/tmp/catalog"

            [credentials.guest]
            user = "reader"
            password = "letmein"
            "#,
        )
        .unwrap();

        assert_eq!(config.roles[&Role::Guest], Credential::new("reader", "letmein"));
        assert_eq!(config.roles[&Role::Administrator].principal, "admin");
    }

    #[test]
    fn missing_password_is_rejected() {
        let err = AppConfig::from_toml("[database]\ndata_dir = \"/tmp\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = AppConfig::from_toml("[database]\npassword = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn unknown_role_section_is_rejected() {
        let err = AppConfig::from_toml(
            "[database]\npassword = \"x\"\ndata_dir = \"/tmp\"\n[credentials.root]\npassword = \"y\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("root")));
    }

    #[test]
    fn catalog_name_must_be_plain() {
        let err = AppConfig::from_toml(
            "[database]\npassword = \"x\"\ndata_dir = \"/tmp\"\ncatalog = \"../etc\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let rendered = format!("{:?}", Credential::new("admin", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
