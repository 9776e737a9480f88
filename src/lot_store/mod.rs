//! LotStore - Persistent Lot State
//!
//! ## Responsibilities
//!
//! - Authoritative record of lot occupancy, capacity, and the transient
//!   leaving-soon counter
//! - Departure schedule rows and their expiry deletion
//! - Write-boundary clamping of the occupancy and leaving-soon invariants

mod repository;
mod types;

pub use repository::LotRepository;
pub use types::Lot;

use crate::aggregator::OccupancySnapshot;
use crate::error::Result;
use async_trait::async_trait;

/// The subset of lot mutations performed by background tasks.
///
/// Both the reconciliation loop and the delayed leaving-soon decrement go
/// through this seam so tests can substitute an in-memory store.
#[async_trait]
pub trait LotStateStore: Send + Sync {
    /// Persist an occupancy sample for the named lot (last writer wins)
    async fn record_occupancy(&self, lot_name: &str, snapshot: &OccupancySnapshot) -> Result<()>;

    /// Increment the leaving-soon counter and return the updated lot
    async fn increment_leaving_soon(&self, lot_name: &str) -> Result<Lot>;

    /// Decrement the leaving-soon counter, clamped at zero
    async fn decrement_leaving_soon(&self, lot_name: &str) -> Result<()>;
}
