use anyhow::Result;

use super::schema::Database;
use super::types::StorageEvent;

impl Database {
    // ========================================================================
    // Key-Value Operations
    // ========================================================================

    /// Get a single value by key, or `None` if the key was never written.
    pub async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM local_storage WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Set a value (UPSERT) and notify subscribers.
    ///
    /// The known-value map and the row change together under the shared
    /// write lock, so the external watcher never reports this process's own
    /// write as foreign. If the write fails the watcher sees the mismatch on
    /// its next poll and republishes the stored value, which resyncs every
    /// context.
    pub async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.shared.write_guard().await;
        self.shared
            .known()
            .insert(key.to_string(), Some(value.to_string()));

        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        self.publish(key, Some(value.to_string()));
        Ok(())
    }

    /// Remove a key and notify subscribers. Removing a missing key is a no-op
    /// that still publishes, matching a storage `removeItem`.
    pub async fn remove_item(&self, key: &str) -> Result<()> {
        let _guard = self.shared.write_guard().await;
        self.shared.known().insert(key.to_string(), None);

        sqlx::query("DELETE FROM local_storage WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        self.publish(key, None);
        Ok(())
    }

    fn publish(&self, key: &str, new_value: Option<String>) {
        let event = StorageEvent {
            key: key.to_string(),
            new_value,
            origin: self.origin,
        };
        // No receivers is fine: nothing else is listening yet
        if self.shared.events.send(event).is_err() {
            tracing::trace!(key, "No storage subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, Origin};

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_get_item_missing() {
        let db = test_db().await;
        assert_eq!(db.get_item("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_and_get_item() {
        let db = test_db().await;
        db.set_item("theme", "dark").await.unwrap();
        assert_eq!(db.get_item("theme").await.unwrap(), Some("dark".to_string()));
    }

    #[tokio::test]
    async fn test_set_item_upsert() {
        let db = test_db().await;
        db.set_item("theme", "dark").await.unwrap();
        db.set_item("theme", "light").await.unwrap();
        assert_eq!(db.get_item("theme").await.unwrap(), Some("light".to_string()));
    }

    #[tokio::test]
    async fn test_remove_item() {
        let db = test_db().await;
        db.set_item("favorites", "[1]").await.unwrap();
        db.remove_item("favorites").await.unwrap();
        assert_eq!(db.get_item("favorites").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_contexts_share_data() {
        let db = test_db().await;
        let other = db.new_context();
        other.set_item("favorites", "[25]").await.unwrap();
        assert_eq!(
            db.get_item("favorites").await.unwrap(),
            Some("[25]".to_string())
        );
    }

    #[tokio::test]
    async fn test_write_publishes_with_origin() {
        let db = test_db().await;
        let other = db.new_context();
        let mut rx = db.subscribe();

        other.set_item("theme", "dark").await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.key, "theme");
        assert_eq!(event.new_value.as_deref(), Some("dark"));
        assert_eq!(event.origin, other.origin());
        assert_ne!(event.origin, db.origin());
    }

    #[tokio::test]
    async fn test_remove_publishes_none() {
        let db = test_db().await;
        let mut rx = db.subscribe();
        db.remove_item("location").await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.new_value, None);
        assert!(matches!(event.origin, Origin::Context(_)));
    }
}
