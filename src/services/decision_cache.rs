use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct Entry {
    is_admin: bool,
    expires_at: Instant,
}

/// Short-lived cache of admin decisions, keyed by identity id.
///
/// Entries are written only on database-sourced decisions and are never
/// trusted past their expiry; `get` treats an expired entry as a miss
/// without freeing it immediately. The map is bounded: a full cache drops
/// expired entries first, then the entry closest to expiry. Writes are
/// last-writer-wins, which is safe because concurrent writers derive their
/// answers from the same source of truth.
pub struct DecisionCache {
    entries: RwLock<HashMap<Uuid, Entry>>,
    ttl: Duration,
    max_entries: usize,
}

impl DecisionCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<bool> {
        let entries = self.entries.read().await;
        entries
            .get(&id)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.is_admin)
    }

    pub async fn set(&self, id: Uuid, is_admin: bool) {
        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries && !entries.contains_key(&id) {
            let now = Instant::now();
            entries.retain(|_, entry| entry.expires_at > now);

            if entries.len() >= self.max_entries {
                let evict = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(key, _)| *key);
                if let Some(key) = evict {
                    entries.remove(&key);
                }
            }
        }

        entries.insert(
            id,
            Entry {
                is_admin,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drops all entries unconditionally (logout, tests).
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
