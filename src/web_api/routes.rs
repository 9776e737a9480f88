//! API Routes

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::departures::{self, DEFAULT_HISTOGRAM_SLOTS};
use crate::error::{Error, Result};
use crate::live_export::LiveLotData;
use crate::lot_store::Lot;
use crate::models::{LocationCheckResponse, LotSnapshot, ScheduleAck};
use crate::state::AppState;

/// Maximum coordinate delta, in degrees, for a user to count as at the lot
const PROXIMITY_DEGREES: f64 = 0.005;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(super::health_check))
        .route("/api/lot/live-cv-data", get(live_cv_data))
        .route("/api/lot/:name", get(get_lot))
        .route("/api/leaving-soon", post(mark_leaving_soon))
        .route("/api/submit-schedule", post(submit_schedule))
        .route("/api/location", post(check_location))
        .with_state(state)
}

// ========================================
// Lot Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct LotNameQuery {
    lot_name: Option<String>,
}

async fn get_lot(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LotNameQuery>,
) -> Result<Json<LotSnapshot>> {
    let name = effective_lot_name(&name, query.lot_name.as_deref())?;
    let lot = require_lot(&state, &name).await?;
    Ok(Json(lot_snapshot(&state, lot).await?))
}

#[derive(Debug, Deserialize)]
struct LeavingSoonRequest {
    lot_name: String,
}

async fn mark_leaving_soon(
    State(state): State<AppState>,
    Json(req): Json<LeavingSoonRequest>,
) -> Result<Json<LotSnapshot>> {
    let name = effective_lot_name(&req.lot_name, None)?;
    let lot = state.leaving_soon.mark_leaving(&name).await?;
    Ok(Json(lot_snapshot(&state, lot).await?))
}

#[derive(Debug, Deserialize)]
struct SubmitScheduleRequest {
    lot_name: String,
    departure_time: String,
}

async fn submit_schedule(
    State(state): State<AppState>,
    Json(req): Json<SubmitScheduleRequest>,
) -> Result<Json<ScheduleAck>> {
    let name = effective_lot_name(&req.lot_name, None)?;
    let time = departures::parse_time_of_day(&req.departure_time).ok_or_else(|| {
        Error::Parse(format!("bad departure time: {}", req.departure_time))
    })?;

    let lot = require_lot(&state, &name).await?;

    // Stored zero-padded so the expiry sweep's string comparison holds
    let canonical = time.format("%H:%M:%S").to_string();
    state.lots.insert_schedule(lot.id, &canonical).await?;

    tracing::info!(lot = %lot.name, departure_time = %canonical, "Departure schedule recorded");

    Ok(Json(ScheduleAck {
        ok: true,
        lot_name: lot.name,
        departure_time: canonical,
    }))
}

async fn live_cv_data(State(state): State<AppState>) -> Result<Json<LiveLotData>> {
    state
        .live_export
        .read()
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound("live occupancy data not available yet".to_string()))
}

#[derive(Debug, Deserialize)]
struct LocationCheckRequest {
    lot_name: String,
    user_latitude: f64,
    user_longitude: f64,
}

async fn check_location(
    State(state): State<AppState>,
    Json(req): Json<LocationCheckRequest>,
) -> Result<Json<LocationCheckResponse>> {
    let name = effective_lot_name(&req.lot_name, None)?;
    let lot = require_lot(&state, &name).await?;

    let (latitude, longitude) = match (lot.latitude, lot.longitude) {
        (Some(latitude), Some(longitude)) => (latitude, longitude),
        _ => {
            return Err(Error::Validation(format!(
                "lot has no location anchor: {}",
                lot.name
            )))
        }
    };

    if (latitude - req.user_latitude).abs() > PROXIMITY_DEGREES
        || (longitude - req.user_longitude).abs() > PROXIMITY_DEGREES
    {
        return Err(Error::NotFound(format!("user is not near lot: {}", lot.name)));
    }

    Ok(Json(LocationCheckResponse {
        lot_name: lot.name,
        within_range: true,
    }))
}

// ========================================
// Helpers
// ========================================

/// Resolve the lot name from the path segment and the optional query
/// override, rejecting blank names
fn effective_lot_name(path_name: &str, query_name: Option<&str>) -> Result<String> {
    let name = query_name.unwrap_or(path_name).trim();
    if name.is_empty() {
        return Err(Error::Validation("lot name is required".to_string()));
    }
    Ok(name.to_string())
}

async fn require_lot(state: &AppState, name: &str) -> Result<Lot> {
    state
        .lots
        .get_lot(name)
        .await?
        .ok_or_else(|| Error::NotFound(format!("lot not found: {name}")))
}

async fn lot_snapshot(state: &AppState, lot: Lot) -> Result<LotSnapshot> {
    let times = state.lots.schedule_times(lot.id).await?;
    let departures = departures::departure_histogram(&times, DEFAULT_HISTOGRAM_SLOTS);
    Ok(LotSnapshot::from_lot(&lot, departures))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_name_overrides_path_segment() {
        let name = effective_lot_name("furnas", Some("Furnas Hall Parking")).unwrap();
        assert_eq!(name, "Furnas Hall Parking");
    }

    #[test]
    fn test_path_segment_used_without_query() {
        let name = effective_lot_name("Jarvis B", None).unwrap();
        assert_eq!(name, "Jarvis B");
    }

    #[test]
    fn test_blank_names_are_rejected() {
        assert!(effective_lot_name("", None).is_err());
        assert!(effective_lot_name("  ", None).is_err());
        assert!(effective_lot_name("furnas", Some("   ")).is_err());
    }
}
