//! Service layer orchestrating database mutations.
//!
//! `ThesiaService` wraps `ThesiaDb` (raw database access) and serializes
//! all operations on its connection. All repo methods are implemented as
//! `impl ThesiaService`.

use tokio::sync::Mutex;

use crate::ThesiaDb;
use crate::error::DatabaseError;

/// Orchestrates database access over a single shared connection.
///
/// Every mutation method follows this protocol:
/// 1. Acquire the operation lock
/// 2. Begin a transaction
/// 3. Load rows, check policy and guards, execute conditioned writes
/// 4. Append a status history entry where a transition committed
/// 5. Commit (rollback happens on drop if any step fails)
///
/// The operation lock keeps transactions from interleaving on the shared
/// connection, so a completeness guard and the status write it gates
/// always observe one snapshot. Reads take the same lock: on a single
/// connection a statement issued mid-transaction would otherwise see
/// uncommitted rows, so queries run only between transactions and never
/// observe a partial write.
pub struct ThesiaService {
    db: ThesiaDb,
    op_lock: Mutex<()>,
    default_limit: u32,
}

impl ThesiaService {
    /// Create a new service wrapping a local database.
    ///
    /// # Arguments
    ///
    /// * `db_path` — Path to the libSQL database file, or `":memory:"` for tests.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn new_local(db_path: &str) -> Result<Self, DatabaseError> {
        let db = ThesiaDb::open_local(db_path).await?;
        Ok(Self::from_db(db))
    }

    /// Create a service at the path named by the loaded configuration.
    ///
    /// Parent directories are created if the path is file-backed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory or database cannot be
    /// created.
    pub async fn from_config(config: &thesia_config::ThesiaConfig) -> Result<Self, DatabaseError> {
        if !config.database.is_memory() {
            let parent = std::path::Path::new(&config.database.path).parent();
            if let Some(parent) = parent.filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Query(format!("create {}: {e}", parent.display()))
                })?;
            }
        }
        let db = ThesiaDb::open_local(&config.database.path).await?;
        let mut svc = Self::from_db(db);
        svc.default_limit = config.general.default_limit;
        Ok(svc)
    }

    /// Create from an existing `ThesiaDb` (for testing).
    #[must_use]
    pub const fn from_db(db: ThesiaDb) -> Self {
        Self {
            db,
            op_lock: Mutex::const_new(()),
            default_limit: thesia_config::GeneralConfig::DEFAULT_LIMIT,
        }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &ThesiaDb {
        &self.db
    }

    /// Result cap applied to list queries when a filter sets no limit.
    pub(crate) const fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Acquire the operation lock. Held across a mutation's transaction,
    /// and for the duration of each read query.
    pub(crate) async fn op_lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.op_lock.lock().await
    }
}
