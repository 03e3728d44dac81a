use std::sync::Arc;

use serde::Deserialize;

use crate::{
    backends::{MemoryContactStore, MemoryHistoryStore, MemoryStatsStore},
    r#trait::{ContactStore, HistoryStore, StatsStore},
};

/// Configuration for the stores backing pushcast
///
/// # Examples
///
/// Memory-backed stores with no limit:
/// ```ron
/// Pushcast (
///     store: Memory(capacity: None),
/// )
/// ```
///
/// Memory-backed stores with a registry capacity limit:
/// ```ron
/// Pushcast (
///     store: Memory(
///         capacity: Some(100000),
///     ),
/// )
/// ```
#[derive(Debug, Clone, Deserialize)]
pub enum StoreConfig {
    /// Memory-based stores (development and single-node deployments)
    Memory {
        /// Maximum number of registered contacts (omit for unlimited)
        #[serde(default)]
        capacity: Option<usize>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory { capacity: None }
    }
}

/// Handles to every store the service uses.
///
/// Cloning is cheap; every clone refers to the same underlying stores.
#[derive(Debug, Clone)]
pub struct Stores {
    pub contacts: Arc<dyn ContactStore>,
    pub history: Arc<dyn HistoryStore>,
    pub stats: Arc<dyn StatsStore>,
}

impl StoreConfig {
    /// Create the configured stores
    #[must_use]
    pub fn build(&self) -> Stores {
        match self {
            Self::Memory { capacity } => {
                let contacts =
                    capacity.map_or_else(MemoryContactStore::new, MemoryContactStore::with_capacity);

                tracing::debug!(?capacity, "Using memory-backed stores");

                Stores {
                    contacts: Arc::new(contacts),
                    history: Arc::new(MemoryHistoryStore::new()),
                    stats: Arc::new(MemoryStatsStore::new()),
                }
            }
        }
    }
}
