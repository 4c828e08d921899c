// # nbsync-core
//
// Core library for keeping a DNS zone in step with an overlay network's
// peer list.
//
// ## Architecture Overview
//
// - **PeerSource**: Trait for fetching the current peer list
// - **RecordStore**: Trait for listing and mutating A records in a hosted zone
// - **build_desired_state**: Peers → (domain, IPv4 address) pairs, zone-validated
// - **Reconciler**: Converges each domain to exactly one correct A record
// - **SyncEngine**: Runs the whole pass now and then on an interval
// - **StoreRegistry**: Plugin-based registry for record stores
//
// ## Design Principles
//
// 1. **Stateless runs**: every run re-fetches peers and re-lists records
// 2. **Minimal mutations**: a converged zone produces zero store writes
// 3. **Fail-fast**: the first failing call aborts the run; the next run heals
// 4. **Sequential**: one domain at a time, to stay under provider rate limits
// 5. **Library-First**: all core functionality can be used as a library

pub mod traits;
pub mod desired;
pub mod reconcile;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;
pub mod store;

// Re-export core types for convenience
pub use traits::{PeerSource, RecordStore};
pub use desired::{DesiredRecord, build_desired_state};
pub use reconcile::{Outcome, Reconciler, RunReport, reconcile_run};
pub use engine::{SyncEngine, SyncEvent};
pub use registry::StoreRegistry;
pub use config::{EngineConfig, StoreConfig, SyncConfig};
pub use error::{Error, Result};
pub use store::MemoryRecordStore;

pub use tokio_util::sync::CancellationToken;
