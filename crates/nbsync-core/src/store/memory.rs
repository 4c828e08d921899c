// # Memory Record Store
//
// In-memory implementation of RecordStore.
//
// ## Purpose
//
// Provides a record store that never leaves the process. Useful for tests,
// for trying a configuration against a live peer list without touching a
// real zone, and as the reference behavior for provider implementations.
//
// ## Behavior
//
// - Records are kept in insertion order, which is the list order
// - Ids are sequential ("1", "2", ...) across all zones
// - All state is lost on restart
// - With `auto_zone`, unknown zones are created on first lookup

use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::traits::record_store::{ExistingRecord, RecordStore, RecordStoreFactory, RecordType, Zone};
use crate::config::StoreConfig;
use crate::Error;

#[derive(Debug, Default)]
struct Inner {
    zones: Vec<Zone>,
    /// (zone id, record)
    records: Vec<(String, ExistingRecord)>,
    next_id: u64,
    auto_zone: bool,
}

impl Inner {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn has_zone(&self, zone_id: &str) -> bool {
        self.zones.iter().any(|z| z.id == zone_id)
    }

    fn check_zone(&self, zone_id: &str) -> Result<(), Error> {
        if !self.has_zone(zone_id) {
            return Err(Error::not_found(format!("zone id {}", zone_id)));
        }
        Ok(())
    }
}

/// In-memory record store implementation
///
/// Cloning is cheap and clones share the same records.
///
/// # Example
///
/// ```rust,no_run
/// use nbsync_core::store::MemoryRecordStore;
/// use nbsync_core::traits::{RecordStore, RecordType, Zone};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::with_zone(Zone::new("z1", "example.com"));
///
///     let zone = store.resolve_zone("example.com").await?;
///     store.create_record(&zone.id, "a.example.com", "100.64.0.1", false).await?;
///
///     let records = store.list_records(&zone.id, "a.example.com", RecordType::A).await?;
///     assert_eq!(records.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryRecordStore {
    /// Create a new empty memory store with no zones
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one empty zone
    pub fn with_zone(zone: Zone) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                zones: vec![zone],
                ..Default::default()
            })),
        }
    }

    /// Create a store that creates zones on first lookup
    pub fn auto_zone() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                auto_zone: true,
                ..Default::default()
            })),
        }
    }

    /// Add a zone
    pub async fn add_zone(&self, zone: Zone) {
        self.inner.write().await.zones.push(zone);
    }

    /// Seed a record directly, bypassing the trait; returns its id
    pub async fn insert(&self, zone_id: &str, name: &str, address: &str, proxied: bool) -> String {
        let mut guard = self.inner.write().await;
        let id = guard.next_id();
        guard.records.push((
            zone_id.to_string(),
            ExistingRecord {
                id: id.clone(),
                domain: name.to_string(),
                address: address.to_string(),
                proxied,
            },
        ));
        id
    }

    /// All records in a zone, in list order
    pub async fn records(&self, zone_id: &str) -> Vec<ExistingRecord> {
        self.inner
            .read()
            .await
            .records
            .iter()
            .filter(|(z, _)| z == zone_id)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Get the number of records across all zones
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Check if the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }

    /// Remove all records, keeping zones
    pub async fn clear(&self) {
        self.inner.write().await.records.clear();
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn resolve_zone(&self, domain: &str) -> Result<Zone, Error> {
        let mut guard = self.inner.write().await;
        let mut matches: Vec<Zone> = guard
            .zones
            .iter()
            .filter(|z| z.domain == domain)
            .cloned()
            .collect();

        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 if guard.auto_zone => {
                let zone = Zone::new(format!("memory-{}", domain), domain);
                guard.zones.push(zone.clone());
                Ok(zone)
            }
            0 => Err(Error::not_found(format!("zone {}", domain))),
            n => Err(Error::store_operation(
                "resolve zone",
                format!("{} zones named {}", n, domain),
            )),
        }
    }

    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<ExistingRecord>, Error> {
        let guard = self.inner.read().await;
        guard.check_zone(zone_id)?;
        match record_type {
            RecordType::A => Ok(guard
                .records
                .iter()
                .filter(|(z, r)| z == zone_id && r.domain == name)
                .map(|(_, r)| r.clone())
                .collect()),
        }
    }

    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        address: &str,
        proxied: bool,
    ) -> Result<String, Error> {
        self.inner.read().await.check_zone(zone_id)?;
        Ok(self.insert(zone_id, name, address, proxied).await)
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        address: &str,
        proxied: bool,
    ) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.check_zone(zone_id)?;
        let (_, record) = guard
            .records
            .iter_mut()
            .find(|(z, r)| z == zone_id && r.id == record_id)
            .ok_or_else(|| Error::not_found(format!("record {}", record_id)))?;

        record.domain = name.to_string();
        record.address = address.to_string();
        record.proxied = proxied;
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.check_zone(zone_id)?;
        let index = guard
            .records
            .iter()
            .position(|(z, r)| z == zone_id && r.id == record_id)
            .ok_or_else(|| Error::not_found(format!("record {}", record_id)))?;
        guard.records.remove(index);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for the `memory` store type
///
/// Created stores use [`MemoryRecordStore::auto_zone`], so any configured
/// zone resolves.
pub struct MemoryStoreFactory;

impl RecordStoreFactory for MemoryStoreFactory {
    fn create(&self, config: &StoreConfig) -> Result<Box<dyn RecordStore>, Error> {
        match config {
            StoreConfig::Memory => Ok(Box::new(MemoryRecordStore::auto_zone())),
            _ => Err(Error::config("Invalid config for memory store")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryRecordStore {
        MemoryRecordStore::with_zone(Zone::new("z1", "example.com"))
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = store();
        assert!(store.is_empty().await);

        let id = store.create_record("z1", "a.example.com", "10.0.0.1", false).await.unwrap();
        assert_eq!(id, "1");
        assert_eq!(store.len().await, 1);

        store.update_record("z1", &id, "a.example.com", "10.0.0.2", true).await.unwrap();
        let records = store.list_records("z1", "a.example.com", RecordType::A).await.unwrap();
        assert_eq!(records[0].address, "10.0.0.2");
        assert!(records[0].proxied);

        store.delete_record("z1", &id).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_list_is_exact_and_ordered() {
        let store = store();
        store.insert("z1", "a.example.com", "10.0.0.1", false).await;
        store.insert("z1", "b.a.example.com", "10.0.0.2", false).await;
        store.insert("z1", "a.example.com", "10.0.0.3", false).await;

        let records = store.list_records("z1", "a.example.com", RecordType::A).await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_memory_store_zone_resolution() {
        let store = store();
        assert_eq!(store.resolve_zone("example.com").await.unwrap().id, "z1");
        assert!(matches!(
            store.resolve_zone("other.com").await,
            Err(Error::NotFound(_))
        ));

        store.add_zone(Zone::new("z2", "example.com")).await;
        assert!(matches!(
            store.resolve_zone("example.com").await,
            Err(Error::StoreOperation { .. })
        ));
    }

    #[tokio::test]
    async fn test_memory_store_auto_zone() {
        let store = MemoryRecordStore::auto_zone();
        let zone = store.resolve_zone("example.com").await.unwrap();
        assert_eq!(zone.id, "memory-example.com");
        assert_eq!(store.resolve_zone("example.com").await.unwrap(), zone);
    }

    #[tokio::test]
    async fn test_memory_store_unknown_ids() {
        let store = store();
        assert!(store.delete_record("z1", "42").await.is_err());
        assert!(store.update_record("z1", "42", "a.example.com", "10.0.0.1", false).await.is_err());
        assert!(store.list_records("nope", "a.example.com", RecordType::A).await.is_err());
    }

    #[test]
    fn test_factory_rejects_other_configs() {
        let config = StoreConfig::Cloudflare {
            api_token: "token".to_string(),
            dry_run: false,
        };
        assert!(MemoryStoreFactory.create(&config).is_err());
        assert!(MemoryStoreFactory.create(&StoreConfig::Memory).is_ok());
    }
}
