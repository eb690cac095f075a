//! Configuration entries and the store that holds them.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// How a flow was started.
///
/// Selects the initial step name dispatched by the manager and is stamped
/// onto the entry the flow produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowSource {
    /// Started by a user from the frontend.
    User,
    /// Started from a discovered device or service.
    Discovery,
    /// Started from imported legacy configuration.
    Import,
}

impl FlowSource {
    /// Name of the step the manager dispatches first for this source.
    pub(crate) fn init_step(self) -> &'static str {
        match self {
            FlowSource::User => "init",
            FlowSource::Discovery => "discovery",
            FlowSource::Import => "import",
        }
    }

    /// Wire name of this source.
    pub fn as_str(self) -> &'static str {
        match self {
            FlowSource::User => "user",
            FlowSource::Discovery => "discovery",
            FlowSource::Import => "import",
        }
    }
}

impl fmt::Display for FlowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A materialized configuration entry: the durable result of a completed
/// flow.
///
/// Immutable once created, apart from explicit removal.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigEntry {
    /// Unique entry identifier, disjoint from the flow id namespace.
    pub entry_id: String,
    /// Domain whose handler produced the entry.
    pub domain: String,
    /// Human-readable title.
    pub title: String,
    /// How the producing flow was started.
    pub source: FlowSource,
    /// Opaque payload the handler assembled (already validated).
    pub data: Value,
    /// When the entry was materialized.
    pub created_at: OffsetDateTime,
}

/// Storage for materialized configuration entries.
///
/// The trait is the seam for durable deployments; [`MemoryEntryStore`] is
/// the implementation shipped in-crate. `add` is infallible by contract:
/// payload validation has already happened by the time the manager calls
/// it.
#[async_trait]
pub trait EntryStore: Send + Sync + Clone + 'static {
    /// Store a new entry and return its freshly generated id.
    async fn add(&self, domain: &str, title: &str, source: FlowSource, data: Value) -> String;

    /// All entries, in creation order.
    async fn list(&self) -> Vec<ConfigEntry>;

    /// Remove an entry by id. Returns whether one was removed.
    async fn remove(&self, entry_id: &str) -> bool;
}

/// In-memory entry store.
///
/// Cheaply cloneable handle over shared state; clones observe the same
/// entries.
#[derive(Clone, Default)]
pub struct MemoryEntryStore {
    entries: Arc<RwLock<Vec<ConfigEntry>>>,
}

impl MemoryEntryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn add(&self, domain: &str, title: &str, source: FlowSource, data: Value) -> String {
        let entry_id = Uuid::new_v4().simple().to_string();
        let entry = ConfigEntry {
            entry_id: entry_id.clone(),
            domain: domain.to_owned(),
            title: title.to_owned(),
            source,
            data,
            created_at: OffsetDateTime::now_utc(),
        };
        self.entries.write().await.push(entry);
        entry_id
    }

    async fn list(&self) -> Vec<ConfigEntry> {
        self.entries.read().await.clone()
    }

    async fn remove(&self, entry_id: &str) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| entry.entry_id != entry_id);
        entries.len() != before
    }
}
