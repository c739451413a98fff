//! Reconciled cluster state
//!
//! This module owns the two halves of the synchronization core:
//! - `store`: the authoritative resource mappings and the rules for applying
//!   snapshots and incremental events
//! - `layout`: the pure orbit layout derived from the store

pub mod layout;
mod store;


pub use store::{ClusterStore, Resource};
