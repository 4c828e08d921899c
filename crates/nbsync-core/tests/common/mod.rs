//! Test doubles and common utilities for contract tests
//!
//! `RecordingStore` wraps the in-memory store, records every call in order,
//! and can inject a failure or fire a cancellation token on a chosen call.
//! Clones share the same log and records.

#![allow(dead_code)]

use nbsync_core::config::{EngineConfig, StoreConfig, SyncConfig};
use nbsync_core::error::{Error, Result};
use nbsync_core::traits::{ExistingRecord, Peer, PeerSource, RecordStore, RecordType, Zone};
use nbsync_core::{CancellationToken, MemoryRecordStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ZONE_ID: &str = "zone-1";
pub const ZONE_DOMAIN: &str = "example.com";

/// A store call, as observed by `RecordingStore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ResolveZone(String),
    List(String),
    Create {
        name: String,
        address: String,
        proxied: bool,
    },
    Update {
        id: String,
        name: String,
        address: String,
        proxied: bool,
    },
    Delete(String),
}

impl StoreCall {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            StoreCall::Create { .. } | StoreCall::Update { .. } | StoreCall::Delete(_)
        )
    }

    fn op(&self) -> Op {
        match self {
            StoreCall::ResolveZone(_) => Op::ResolveZone,
            StoreCall::List(_) => Op::List,
            StoreCall::Create { .. } => Op::Create,
            StoreCall::Update { .. } => Op::Update,
            StoreCall::Delete(_) => Op::Delete,
        }
    }
}

/// Kind of store call, for fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    ResolveZone,
    List,
    Create,
    Update,
    Delete,
}

#[derive(Clone)]
pub struct RecordingStore {
    inner: MemoryRecordStore,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    fail_on: Arc<Mutex<Option<Op>>>,
    cancel_on: Arc<Mutex<Option<(Op, CancellationToken)>>>,
}

impl RecordingStore {
    /// A store with the `example.com` zone and no records
    pub fn new() -> Self {
        Self {
            inner: MemoryRecordStore::with_zone(Zone::new(ZONE_ID, ZONE_DOMAIN)),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on: Arc::new(Mutex::new(None)),
            cancel_on: Arc::new(Mutex::new(None)),
        }
    }

    /// Seed a record in the test zone without recording a call
    pub async fn seed(&self, name: &str, address: &str, proxied: bool) -> String {
        self.inner.insert(ZONE_ID, name, address, proxied).await
    }

    /// Make the first call of kind `op` fail with a store operation error
    pub fn fail_on(&self, op: Op) {
        *self.fail_on.lock().unwrap() = Some(op);
    }

    /// Cancel `token` right after the first call of kind `op` completes
    pub fn cancel_after(&self, op: Op, token: CancellationToken) {
        *self.cancel_on.lock().unwrap() = Some((op, token));
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Current A records for `name`, in list order
    pub async fn records_for(&self, name: &str) -> Vec<ExistingRecord> {
        self.inner
            .records(ZONE_ID)
            .await
            .into_iter()
            .filter(|r| r.domain == name)
            .collect()
    }

    fn before(&self, call: StoreCall) -> Result<()> {
        let op = call.op();
        self.calls.lock().unwrap().push(call);

        let mut fail_on = self.fail_on.lock().unwrap();
        if *fail_on == Some(op) {
            *fail_on = None;
            return Err(Error::store_operation(format!("{:?}", op), "injected failure"));
        }
        Ok(())
    }

    fn after(&self, op: Op) {
        let mut cancel_on = self.cancel_on.lock().unwrap();
        if matches!(&*cancel_on, Some((o, _)) if *o == op) {
            if let Some((_, token)) = cancel_on.take() {
                token.cancel();
            }
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for RecordingStore {
    async fn resolve_zone(&self, domain: &str) -> Result<Zone> {
        self.before(StoreCall::ResolveZone(domain.to_string()))?;
        let zone = self.inner.resolve_zone(domain).await?;
        self.after(Op::ResolveZone);
        Ok(zone)
    }

    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<ExistingRecord>> {
        self.before(StoreCall::List(name.to_string()))?;
        let records = self.inner.list_records(zone_id, name, record_type).await?;
        self.after(Op::List);
        Ok(records)
    }

    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        address: &str,
        proxied: bool,
    ) -> Result<String> {
        self.before(StoreCall::Create {
            name: name.to_string(),
            address: address.to_string(),
            proxied,
        })?;
        let id = self.inner.create_record(zone_id, name, address, proxied).await?;
        self.after(Op::Create);
        Ok(id)
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        address: &str,
        proxied: bool,
    ) -> Result<()> {
        self.before(StoreCall::Update {
            id: record_id.to_string(),
            name: name.to_string(),
            address: address.to_string(),
            proxied,
        })?;
        self.inner
            .update_record(zone_id, record_id, name, address, proxied)
            .await?;
        self.after(Op::Update);
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        self.before(StoreCall::Delete(record_id.to_string()))?;
        self.inner.delete_record(zone_id, record_id).await?;
        self.after(Op::Delete);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// A peer source returning a fixed list and counting fetches
#[derive(Clone)]
pub struct StaticPeerSource {
    peers: Arc<Mutex<Vec<Peer>>>,
    fetch_count: Arc<AtomicUsize>,
    fail: bool,
}

impl StaticPeerSource {
    pub fn new(peers: Vec<Peer>) -> Self {
        Self {
            peers: Arc::new(Mutex::new(peers)),
            fetch_count: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    /// A source whose every fetch fails with a connectivity error
    pub fn unreachable() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn set_peers(&self, peers: Vec<Peer>) {
        *self.peers.lock().unwrap() = peers;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PeerSource for StaticPeerSource {
    async fn fetch_peers(&self) -> Result<Vec<Peer>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::connectivity("static", "peer source unreachable"));
        }
        Ok(self.peers.lock().unwrap().clone())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// Minimal config for the test zone with a one second interval
pub fn minimal_config() -> SyncConfig {
    SyncConfig {
        zone_domain: ZONE_DOMAIN.to_string(),
        store: StoreConfig::Memory,
        engine: EngineConfig {
            interval: Duration::from_secs(1),
            event_channel_capacity: 100,
        },
    }
}
