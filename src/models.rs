//! Shared data models

use crate::departures::DepartureSlot;
use crate::lot_store::Lot;
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub db_connected: bool,
    pub inference_connected: bool,
}

/// Lot snapshot served to clients
#[derive(Debug, Serialize)]
pub struct LotSnapshot {
    pub name: String,
    pub occupancy: i32,
    pub max_occupancy: i32,
    pub available_spots: i32,
    pub leaving_soon: i32,
    /// Upcoming departure histogram, earliest minutes first
    pub departures: Vec<DepartureSlot>,
}

impl LotSnapshot {
    pub fn from_lot(lot: &Lot, departures: Vec<DepartureSlot>) -> Self {
        Self {
            name: lot.name.clone(),
            occupancy: lot.occupancy,
            max_occupancy: lot.max_occupancy,
            available_spots: lot.available_spots(),
            leaving_soon: lot.leaving_soon,
            departures,
        }
    }
}

/// Acknowledgement for a submitted departure schedule
#[derive(Debug, Serialize)]
pub struct ScheduleAck {
    pub ok: bool,
    pub lot_name: String,
    /// Stored canonical `HH:MM:SS` form
    pub departure_time: String,
}

/// Proximity check response
#[derive(Debug, Serialize)]
pub struct LocationCheckResponse {
    pub lot_name: String,
    pub within_range: bool,
}
