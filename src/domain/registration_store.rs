//! In-memory registration database.
//!
//! [`RegistrationStore`] partitions entries by [`Role`], then by topic
//! domain, then by [`RegistrationKey`]. The whole map sits behind a single
//! [`tokio::sync::RwLock`]: request handling and the replication loop may
//! call into the same store concurrently, and every mutation is a small
//! set operation.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::registration::{RegistrationEntry, RegistrationKey, Role};
use super::topic::{ANY, Topic};

type Bucket = HashMap<RegistrationKey, RegistrationEntry>;
type Partition = HashMap<String, Bucket>;

/// Registration database keyed by role and topic domain.
///
/// # Invariants
///
/// - No two stored entries share a [`RegistrationKey`].
/// - Nothing here fails: duplicates and absent entries are no-ops.
#[derive(Debug, Default)]
pub struct RegistrationStore {
    partitions: RwLock<HashMap<Role, Partition>>,
}

fn bucket_of(topic: &Topic) -> String {
    topic.domain().unwrap_or(ANY).to_string()
}

impl RegistrationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entry` unless the same registration is already present.
    ///
    /// Returns `true` if the entry was inserted.
    pub async fn add(&self, entry: RegistrationEntry) -> bool {
        let key = entry.key();
        let mut partitions = self.partitions.write().await;
        let bucket = partitions
            .entry(entry.role)
            .or_default()
            .entry(bucket_of(&entry.topic))
            .or_default();
        if bucket.contains_key(&key) {
            return false;
        }
        tracing::debug!(name = %entry.name, topic = %entry.topic, role = %entry.role, "registration added");
        bucket.insert(key, entry);
        true
    }

    /// Deletes the registration exactly matching `entry`.
    ///
    /// Returns `true` if something was removed.
    pub async fn remove(&self, entry: &RegistrationEntry) -> bool {
        let bucket_key = bucket_of(&entry.topic);
        let mut partitions = self.partitions.write().await;
        let Some(partition) = partitions.get_mut(&entry.role) else {
            return false;
        };
        let Some(bucket) = partition.get_mut(&bucket_key) else {
            return false;
        };
        let removed = bucket.remove(&entry.key()).is_some();
        if bucket.is_empty() {
            partition.remove(&bucket_key);
        }
        if removed {
            tracing::debug!(name = %entry.name, topic = %entry.topic, role = %entry.role, "registration removed");
        }
        removed
    }

    /// Returns every `role` entry whose topic matches `query`.
    pub async fn find(&self, role: Role, query: &Topic) -> Vec<RegistrationEntry> {
        let partitions = self.partitions.read().await;
        let Some(partition) = partitions.get(&role) else {
            return Vec::new();
        };
        match query.domain() {
            Some(domain) => partition
                .get(domain)
                .map(|bucket| {
                    bucket
                        .values()
                        .filter(|e| e.topic.matches(query))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            None => partition
                .values()
                .flat_map(Bucket::values)
                .filter(|e| e.topic.matches(query))
                .cloned()
                .collect(),
        }
    }

    /// Returns a snapshot copy of every stored entry.
    pub async fn export(&self) -> Vec<RegistrationEntry> {
        let partitions = self.partitions.read().await;
        partitions
            .values()
            .flat_map(Partition::values)
            .flat_map(Bucket::values)
            .cloned()
            .collect()
    }

    /// Returns a snapshot copy of every entry with the given role.
    pub async fn export_role(&self, role: Role) -> Vec<RegistrationEntry> {
        let partitions = self.partitions.read().await;
        partitions
            .get(&role)
            .map(|p| p.values().flat_map(Bucket::values).cloned().collect())
            .unwrap_or_default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        let partitions = self.partitions.read().await;
        partitions
            .values()
            .flat_map(Partition::values)
            .map(Bucket::len)
            .sum()
    }

    /// Returns `true` if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
