use thiserror::Error;

// ============================================================================
// Well-known Keys
// ============================================================================

/// JSON array of favorite ids, in insertion order.
pub const FAVORITES_KEY: &str = "favorites";
/// Theme variant name (`light` or `dark`).
pub const THEME_KEY: &str = "theme";
/// Last written list location (`q=..&type=..&sort=..`).
pub const LOCATION_KEY: &str = "location";

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The database file is held by a writer that did not release it in time
    #[error("Database is busy. Another dexview process may be holding a write lock.")]
    Busy,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::Busy;
        }
        DatabaseError::Other(err)
    }
}

/// A stored value that could not be interpreted.
///
/// Callers recover with a default and log; this never reaches the user.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Malformed value under '{key}': {reason}")]
pub struct StoredValueError {
    pub key: &'static str,
    pub reason: String,
}

impl StoredValueError {
    pub fn new(key: &'static str, reason: impl Into<String>) -> Self {
        Self {
            key,
            reason: reason.into(),
        }
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) surface as
/// text in sqlx errors.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("database is locked")
        || lower.contains("database table is locked")
        || lower.contains("sqlite_busy")
        || lower.contains("sqlite_locked")
        || lower.contains("unable to open database file")
}

// ============================================================================
// Change Notifications
// ============================================================================

/// Which storage context produced a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A handle in this process, created by `Database::open` or `Database::new_context`.
    Context(u64),
    /// Another process sharing the same database file, seen by the watcher.
    External,
}

/// A committed write to the key-value table.
///
/// `new_value` is `None` when the key was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
    pub origin: Origin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_messages_detected() {
        assert!(is_lock_message("error returned from database: database is locked"));
        assert!(is_lock_message("SQLITE_BUSY"));
        assert!(!is_lock_message("no such table: local_storage"));
    }

    #[test]
    fn origins_compare_by_context() {
        assert_eq!(Origin::Context(1), Origin::Context(1));
        assert_ne!(Origin::Context(1), Origin::Context(2));
        assert_ne!(Origin::Context(1), Origin::External);
    }
}
