// # Record Store Trait
//
// Defines the interface for reading and mutating address records in a
// hosted DNS zone.
//
// ## Implementations
//
// - Cloudflare: `nbsync-provider-cloudflare` crate
// - In-memory: `nbsync_core::store::MemoryRecordStore`
//
// ## Usage
//
// ```rust,ignore
// use nbsync_core::traits::{RecordStore, RecordType};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* RecordStore implementation */;
//
//     let zone = store.resolve_zone("example.com").await?;
//     let existing = store
//         .list_records(&zone.id, "host.example.com", RecordType::A)
//         .await?;
//
//     if existing.is_empty() {
//         store
//             .create_record(&zone.id, "host.example.com", "100.64.0.1", false)
//             .await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A hosted DNS zone, resolved by name once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider-specific zone identifier
    pub id: String,
    /// Zone apex, e.g. "example.com"
    pub domain: String,
}

impl Zone {
    pub fn new(id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
        }
    }
}

/// DNS record type
///
/// Only address records are managed; the type still travels through the
/// store interface so listings are filtered server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record currently stored under a domain, as returned by
/// [`RecordStore::list_records`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingRecord {
    /// Opaque provider record id
    pub id: String,
    /// Fully qualified record name
    pub domain: String,
    /// Record content (the address)
    pub address: String,
    /// Provider proxy flag. Not managed by nbsync, only carried over.
    pub proxied: bool,
}

/// Trait for record store implementations
///
/// A record store is the hosted DNS provider's zone/record API. The
/// reconciler decides *what* to change; the store only executes single
/// requests.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// ## Allowed
/// - ✅ One remote request per method call
/// - ✅ Map provider responses and HTTP status codes into [`crate::Error`]
///
/// ## Forbidden
/// - ❌ Retry or back off (a failed run is retried whole on the next tick)
/// - ❌ Paginate, batch, or cache between calls
/// - ❌ Decide whether a change is needed (owned by the `Reconciler`)
/// - ❌ Log API credentials
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up the zone whose name is exactly `domain`
    ///
    /// # Returns
    ///
    /// - `Ok(Zone)`: exactly one zone matched
    /// - `Err(Error::NotFound)`: no zone matched
    /// - `Err(Error)`: more than one zone matched, or the request failed
    async fn resolve_zone(&self, domain: &str) -> Result<Zone, crate::Error>;

    /// List records of `record_type` whose name is exactly `name`
    ///
    /// Records are returned in the store's own list order.
    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<ExistingRecord>, crate::Error>;

    /// Create an A record and return its id
    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        address: &str,
        proxied: bool,
    ) -> Result<String, crate::Error>;

    /// Overwrite the A record `record_id` in place
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        address: &str,
        proxied: bool,
    ) -> Result<(), crate::Error>;

    /// Delete the record `record_id`
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn resolve_zone(&self, domain: &str) -> Result<Zone, crate::Error> {
        (**self).resolve_zone(domain).await
    }

    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<ExistingRecord>, crate::Error> {
        (**self).list_records(zone_id, name, record_type).await
    }

    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        address: &str,
        proxied: bool,
    ) -> Result<String, crate::Error> {
        (**self).create_record(zone_id, name, address, proxied).await
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        address: &str,
        proxied: bool,
    ) -> Result<(), crate::Error> {
        (**self)
            .update_record(zone_id, record_id, name, address, proxied)
            .await
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), crate::Error> {
        (**self).delete_record(zone_id, record_id).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}

/// Helper trait for constructing record stores from configuration
pub trait RecordStoreFactory: Send + Sync {
    /// Create a RecordStore instance from configuration
    ///
    /// # Returns
    ///
    /// A boxed RecordStore trait object, or a configuration error if
    /// `config` is not meant for this factory
    fn create(
        &self,
        config: &crate::config::StoreConfig,
    ) -> Result<Box<dyn RecordStore>, crate::Error>;
}
