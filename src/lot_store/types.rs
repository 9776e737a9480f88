//! Lot state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One parking lot (matches the lots table)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lot {
    pub id: i64,
    /// Unique, stable lot name
    pub name: String,
    /// Capacity, set at provisioning
    pub max_occupancy: i32,
    /// Occupied spot count, written by the reconciliation loop
    pub occupancy: i32,
    /// Transient counter of drivers who signaled imminent departure
    pub leaving_soon: i32,
    /// Fixed geographic anchor for proximity checks
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    /// Spots currently available, never negative
    pub fn available_spots(&self) -> i32 {
        (self.max_occupancy - self.occupancy).max(0)
    }
}
