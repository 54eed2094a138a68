//! In-memory adapters.
//!
//! `InMemoryGovernanceStore` implements every persistence port over shared
//! process memory. Tests and local runs use it in place of Postgres.

mod organization;
mod store;

pub use organization::{CompanyRecord, PartyRecord, UserRecord};
pub use store::InMemoryGovernanceStore;
