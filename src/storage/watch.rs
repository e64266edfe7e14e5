//! Polling watcher for writes made by other processes.
//!
//! In-process contexts notify each other directly through the broadcast
//! channel. A second dexview process sharing the database file has no such
//! channel, so the watcher re-reads the watched keys on an interval and
//! publishes any value that differs from the last one this process knew.
use std::time::Duration;

use tokio::task::JoinHandle;

use super::schema::Database;
use super::types::{Origin, StorageEvent};

impl Database {
    /// Spawn a task that publishes `Origin::External` events for `keys`.
    ///
    /// Current values are recorded silently before the first poll. The task
    /// runs until the returned handle is aborted.
    pub fn watch_external(&self, keys: Vec<String>, interval: Duration) -> JoinHandle<()> {
        let db = self.clone();
        tokio::spawn(async move {
            for key in &keys {
                let _guard = db.shared.write_guard().await;
                match db.get_item(key).await {
                    Ok(value) => {
                        db.shared.known().entry(key.clone()).or_insert(value);
                    }
                    Err(e) => tracing::warn!(key = %key, error = %e, "Failed to seed watched key"),
                }
            }

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                for key in &keys {
                    db.poll_key(key).await;
                }
            }
        })
    }

    async fn poll_key(&self, key: &str) {
        // No write from this process can land between the read and the compare
        let _guard = self.shared.write_guard().await;
        let current = match self.get_item(key).await {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(key, error = %e, "Watcher read failed, retrying next tick");
                return;
            }
        };

        let changed = {
            let mut known = self.shared.known();
            match known.get(key) {
                Some(previous) if *previous == current => false,
                _ => {
                    known.insert(key.to_string(), current.clone());
                    true
                }
            }
        };

        if changed {
            tracing::debug!(key, "External storage change detected");
            let _ = self.shared.events.send(StorageEvent {
                key: key.to_string(),
                new_value: current,
                origin: Origin::External,
            });
        }
    }
}
