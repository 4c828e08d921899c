// # Record Store Implementations
//
// Record stores that live in this crate. Hosted providers live in their own
// crates (e.g. `nbsync-provider-cloudflare`).

pub mod memory;

pub use memory::{MemoryRecordStore, MemoryStoreFactory};
