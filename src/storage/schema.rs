use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;

use super::types::{is_lock_message, DatabaseError, Origin, StorageEvent};

/// Capacity of the change broadcast; slow receivers see `Lagged` and resync.
const EVENT_CAPACITY: usize = 64;

// ============================================================================
// Database
// ============================================================================

/// State shared by every context opened on the same pool.
pub(crate) struct Shared {
    pub(crate) events: broadcast::Sender<StorageEvent>,
    /// Last value this process wrote or observed per key. The external
    /// watcher compares against it to tell foreign writes from our own.
    known: Mutex<HashMap<String, Option<String>>>,
    /// Held across a write and its `known` update, and across each watcher
    /// read-and-compare, so a poll never sees a row older than `known`.
    write_lock: tokio::sync::Mutex<()>,
    next_context: AtomicU64,
}

impl Shared {
    pub(crate) fn known(&self) -> MutexGuard<'_, HashMap<String, Option<String>>> {
        self.known.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) async fn write_guard(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }
}

/// Handle onto the local key-value store.
///
/// Cloning keeps the same storage context. Use [`Database::new_context`] to
/// get a handle whose writes are reported to the others as foreign changes.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
    pub(crate) shared: Arc<Shared>,
    pub(crate) origin: Origin,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// Pass `":memory:"` for a private in-memory database (tests).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Busy` if another process holds the write lock
    /// past the busy timeout, `DatabaseError::Migration` if the schema cannot
    /// be created, and `DatabaseError::Other` for everything else.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // Create the file with user-only permissions before SQLite touches it
        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::PermissionsExt;
            let db_path = std::path::Path::new(path);
            if db_path.exists() {
                let perms = std::fs::Permissions::from_mode(0o600);
                if let Err(e) = std::fs::set_permissions(path, perms) {
                    tracing::warn!(path = %path, error = %e, "Failed to set database file permissions");
                }
            } else if let Some(parent) = db_path.parent() {
                if parent.exists() {
                    use std::os::unix::fs::OpenOptionsExt;
                    let _file = std::fs::OpenOptions::new()
                        .write(true)
                        .create_new(true)
                        .mode(0o600)
                        .open(db_path)
                        .ok(); // SQLite reports the real error at connect_with
                }
            }
        }

        // busy_timeout lets two dexview processes share the file without
        // surfacing SQLITE_BUSY on short write overlaps.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        // Every connection to ":memory:" is its own database
        let max_connections = if path == ":memory:" { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            events,
            known: Mutex::new(HashMap::new()),
            write_lock: tokio::sync::Mutex::new(()),
            next_context: AtomicU64::new(1),
        });
        let db = Self {
            pool,
            origin: Origin::Context(0),
            shared,
        };
        db.migrate().await.map_err(|e| {
            if is_lock_message(&e.to_string()) {
                DatabaseError::Busy
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        Ok(db)
    }

    /// Open another storage context on the same database.
    ///
    /// Writes made through the returned handle reach subscribers of this one
    /// with a different [`Origin`], the way a second browser tab would.
    pub fn new_context(&self) -> Self {
        let id = self.shared.next_context.fetch_add(1, Ordering::Relaxed);
        Self {
            pool: self.pool.clone(),
            shared: Arc::clone(&self.shared),
            origin: Origin::Context(id),
        }
    }

    /// Origin stamped on writes made through this handle.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Subscribe to committed writes from every context of this database
    /// (including this one) and from the external watcher.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.shared.events.subscribe()
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<()> {
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&self.pool)
            .await?;

        let mut tx = self.pool.begin().await?;

        // Key-value table standing in for the browser's local storage
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
