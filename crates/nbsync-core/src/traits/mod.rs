//! Core traits for nbsync
//!
//! This module defines the abstract interfaces that all adapters must follow.
//!
//! - [`PeerSource`]: Fetch the overlay network's peer list
//! - [`RecordStore`]: Read and mutate records in a hosted DNS zone

pub mod peer_source;
pub mod record_store;

pub use peer_source::{Peer, PeerGroup, PeerSource};
pub use record_store::{ExistingRecord, RecordStore, RecordStoreFactory, RecordType, Zone};
