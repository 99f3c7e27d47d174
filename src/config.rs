//! Configuration for backend selection, backend options and session behavior.

use std::collections::HashMap;
use std::path::Path;

use crate::{
    backend::{MemoryBackend, SqliteTripleBackend, StoreBackend},
    errors::StoreError,
    store::PersistentStore,
};

/// Environment variable read by [`BackendKind::from_env`].
pub const BACKEND_ENV_VAR: &str = "GRAPHSTAGE_BACKEND";

/// Which reference backend [`open_backend`] constructs.
///
/// # Examples
///
/// ```rust
/// use graphstage::{BackendKind, StoreConfig};
///
/// let cfg = StoreConfig::new(BackendKind::Memory);
/// assert_eq!(cfg.backend, BackendKind::Memory);
/// assert_eq!(StoreConfig::default().backend, BackendKind::Sqlite);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Process-local graphs; the path argument is ignored.
    Memory,
    /// SQLite database file holding graph and triple tables.
    #[default]
    Sqlite,
}

impl BackendKind {
    /// Parse `memory` or `sqlite`, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, StoreError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(StoreError::invalid_input(format!(
                "unknown backend kind: {other}"
            ))),
        }
    }

    /// Read the kind from `GRAPHSTAGE_BACKEND`, falling back to the default
    /// when the variable is unset.
    pub fn from_env() -> Result<Self, StoreError> {
        match std::env::var(BACKEND_ENV_VAR) {
            Ok(value) => Self::parse(&value),
            Err(_) => Ok(BackendKind::default()),
        }
    }
}

/// Options for the SQLite backend.
///
/// ```rust
/// use graphstage::SqliteConfig;
/// let config = SqliteConfig::default();
/// assert!(config.create_if_missing);
/// assert!(config.cache_size.is_none());
/// assert!(config.pragma_settings.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct SqliteConfig {
    /// Create the database file when it does not exist.
    ///
    /// **Default:** `true`. When `false`, opening a missing file fails with
    /// [`StoreError::BackendFault`].
    pub create_if_missing: bool,

    /// Capacity of the prepared statement cache.
    ///
    /// **Default:** `None`, keeping the backend's own setting.
    pub cache_size: Option<usize>,

    /// Extra `PRAGMA key = value` statements applied after opening.
    pub pragma_settings: HashMap<String, String>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            cache_size: None,
            pragma_settings: HashMap::new(),
        }
    }
}

/// Session behavior independent of the backend.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Create new graphs through an incremental update against an empty
    /// graph instead of a whole-graph save, when the backend offers both.
    ///
    /// **Default:** `true`. Edits to existing graphs always use incremental
    /// updates when the backend advertises them.
    pub prefer_incremental_updates: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            prefer_incremental_updates: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    pub backend: BackendKind,

    pub sqlite: SqliteConfig,

    pub session: SessionOptions,
}

impl StoreConfig {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    pub fn memory() -> Self {
        Self::new(BackendKind::Memory)
    }

    pub fn sqlite() -> Self {
        Self::new(BackendKind::Sqlite)
    }

    /// Configuration whose backend kind comes from `GRAPHSTAGE_BACKEND`.
    pub fn from_env() -> Result<Self, StoreError> {
        Ok(Self::new(BackendKind::from_env()?))
    }
}

pub fn open_backend<P: AsRef<Path>>(
    path: P,
    cfg: &StoreConfig,
) -> Result<Box<dyn StoreBackend>, StoreError> {
    match cfg.backend {
        BackendKind::Memory => Ok(Box::new(MemoryBackend::new())),
        BackendKind::Sqlite => {
            let backend = if cfg.sqlite.create_if_missing {
                SqliteTripleBackend::open(&path)?
            } else {
                SqliteTripleBackend::open_existing(&path)?
            };
            let conn = backend.connection();
            if let Some(capacity) = cfg.sqlite.cache_size {
                conn.set_prepared_statement_cache_capacity(capacity);
            }
            for (key, value) in &cfg.sqlite.pragma_settings {
                match conn.execute(&format!("PRAGMA {key} = {value}"), []) {
                    Ok(_) | Err(rusqlite::Error::ExecuteReturnedResults) => {}
                    Err(e) => {
                        return Err(StoreError::backend(format!(
                            "PRAGMA {key} = {value}: {e}"
                        )));
                    }
                }
            }
            tracing::debug!(path = %path.as_ref().display(), "opened sqlite backend");
            Ok(Box::new(backend))
        }
    }
}

/// Open a backend and start a session over it.
pub fn open_store<P: AsRef<Path>>(
    path: P,
    cfg: &StoreConfig,
) -> Result<PersistentStore<Box<dyn StoreBackend>>, StoreError> {
    let backend = open_backend(path, cfg)?;
    Ok(PersistentStore::with_options(backend, cfg.session.clone()))
}
