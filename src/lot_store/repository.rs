//! Lot state repository
//!
//! Database access layer for lots and departure schedules

use super::types::Lot;
use super::LotStateStore;
use crate::aggregator::OccupancySnapshot;
use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

/// Lot repository for database operations
#[derive(Clone)]
pub struct LotRepository {
    pool: MySqlPool,
}

impl LotRepository {
    /// Create new repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Lot SELECT columns
    const LOT_COLUMNS: &'static str =
        "id, name, max_occupancy, occupancy, leaving_soon, latitude, longitude, updated_at";

    /// Get lot by name
    pub async fn get_lot(&self, name: &str) -> Result<Option<Lot>> {
        let query = format!("SELECT {} FROM lots WHERE name = ?", Self::LOT_COLUMNS);
        let lot = sqlx::query_as::<_, Lot>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(lot)
    }

    /// Upsert an occupancy sample by lot name, last writer wins.
    ///
    /// Existing rows keep their provisioned capacity and have the written
    /// occupancy clamped into `[0, max_occupancy]`; a lot seen for the first
    /// time is created with the observed total as its capacity.
    pub async fn upsert_occupancy(&self, name: &str, snapshot: &OccupancySnapshot) -> Result<()> {
        let now = chrono::Utc::now();
        sqlx::query(
            r#"
            INSERT INTO lots (name, max_occupancy, occupancy, leaving_soon, updated_at)
            VALUES (?, ?, ?, 0, ?)
            ON DUPLICATE KEY UPDATE occupancy = LEAST(?, max_occupancy), updated_at = ?
            "#,
        )
        .bind(name)
        .bind(snapshot.total as i32)
        .bind(snapshot.occupied as i32)
        .bind(now)
        .bind(snapshot.occupied as i32)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Increment leaving_soon and return the updated lot
    pub async fn bump_leaving_soon(&self, name: &str) -> Result<Lot> {
        let now = chrono::Utc::now();
        let result = sqlx::query(
            "UPDATE lots SET leaving_soon = leaving_soon + 1, updated_at = ? WHERE name = ?",
        )
        .bind(now)
        .bind(name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("lot not found: {name}")));
        }

        self.get_lot(name)
            .await?
            .ok_or(Error::NotFound(format!("lot not found: {name}")))
    }

    /// Decrement leaving_soon against its then-current value, clamped at zero
    pub async fn unwind_leaving_soon(&self, name: &str) -> Result<()> {
        let now = chrono::Utc::now();
        sqlx::query(
            "UPDATE lots SET leaving_soon = GREATEST(leaving_soon - 1, 0), updated_at = ? WHERE name = ?",
        )
        .bind(now)
        .bind(name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a departure schedule entry for a lot
    pub async fn insert_schedule(&self, lot_id: i64, departure_time: &str) -> Result<()> {
        let now = chrono::Utc::now();
        sqlx::query(
            "INSERT INTO departure_schedules (lot_id, departure_time, created_at) VALUES (?, ?, ?)",
        )
        .bind(lot_id)
        .bind(departure_time)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All stored departure times for a lot
    pub async fn schedule_times(&self, lot_id: i64) -> Result<Vec<String>> {
        let times = sqlx::query_scalar::<_, String>(
            "SELECT departure_time FROM departure_schedules WHERE lot_id = ?",
        )
        .bind(lot_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(times)
    }

    /// Delete every schedule row whose time-of-day precedes the cutoff.
    ///
    /// Times are stored zero-padded `HH:MM[:SS]`, so the lexicographic
    /// string comparison matches temporal order.
    pub async fn delete_expired_schedules(&self, cutoff: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM departure_schedules WHERE departure_time < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl LotStateStore for LotRepository {
    async fn record_occupancy(&self, lot_name: &str, snapshot: &OccupancySnapshot) -> Result<()> {
        self.upsert_occupancy(lot_name, snapshot).await
    }

    async fn increment_leaving_soon(&self, lot_name: &str) -> Result<Lot> {
        self.bump_leaving_soon(lot_name).await
    }

    async fn decrement_leaving_soon(&self, lot_name: &str) -> Result<()> {
        self.unwind_leaving_soon(lot_name).await
    }
}
