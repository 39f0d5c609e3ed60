//! Local-first pantry engine: a persisted working list and pantry, guest
//! identity bootstrap, startup reconciliation against a remote pantry, and
//! optimistic mutations that sync in the background of each call.

pub mod catalog;
pub mod identity;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod service;
pub mod store;
pub mod working;

#[cfg(test)]
pub(crate) mod testing;

pub use models::{PantryEntry, SyncState};
pub use reconcile::ReconcileOutcome;
pub use remote::PantryRemote;
pub use service::{PantryService, SyncReport};
