//! LiveExport - Side-Channel Occupancy File
//!
//! ## Responsibilities
//!
//! - Mirror each classified occupancy sample to a JSON file for out-of-band
//!   consumers
//! - Serve the latest file contents to the live-data endpoint

use crate::aggregator::OccupancySnapshot;
use crate::error::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Live occupancy data as written to the side file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveLotData {
    pub lot_name: String,
    pub free: u32,
    pub occupied: u32,
    pub total: u32,
    /// RFC 3339 capture timestamp
    pub timestamp: String,
    /// Human-readable local time of the last update
    pub last_updated: String,
}

impl LiveLotData {
    /// Build an entry for the current wall-clock time
    pub fn now(lot_name: &str, snapshot: &OccupancySnapshot) -> Self {
        let now = Local::now();
        Self {
            lot_name: lot_name.to_string(),
            free: snapshot.free,
            occupied: snapshot.occupied,
            total: snapshot.total,
            timestamp: now.to_rfc3339(),
            last_updated: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Writer/reader for the live occupancy side file
#[derive(Clone)]
pub struct LiveExporter {
    path: PathBuf,
}

impl LiveExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Replace the side file with the given entry.
    ///
    /// Writes to a sibling temp file and renames it over the target so
    /// readers never observe a half-written file.
    pub async fn write(&self, data: &LiveLotData) -> Result<()> {
        let json = serde_json::to_vec_pretty(data)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, &json).await?;
        fs::rename(&tmp, &self.path).await?;

        Ok(())
    }

    /// Read the latest entry, or `None` if nothing was written yet
    pub async fn read(&self) -> Result<Option<LiveLotData>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let data: LiveLotData = serde_json::from_slice(&bytes)?;
        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(free: u32, occupied: u32) -> OccupancySnapshot {
        OccupancySnapshot {
            free,
            occupied,
            total: free + occupied,
        }
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = LiveExporter::new(dir.path().join("live_parking_data.json"));

        exporter
            .write(&LiveLotData::now("Furnas Hall Parking", &snapshot(12, 38)))
            .await
            .unwrap();

        let data = exporter.read().await.unwrap().unwrap();
        assert_eq!(data.lot_name, "Furnas Hall Parking");
        assert_eq!(data.free, 12);
        assert_eq!(data.occupied, 38);
        assert_eq!(data.total, 50);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = LiveExporter::new(dir.path().join("live_parking_data.json"));
        assert!(exporter.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_overwrites_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = LiveExporter::new(dir.path().join("live_parking_data.json"));

        exporter
            .write(&LiveLotData::now("Lot", &snapshot(5, 5)))
            .await
            .unwrap();
        exporter
            .write(&LiveLotData::now("Lot", &snapshot(2, 8)))
            .await
            .unwrap();

        let data = exporter.read().await.unwrap().unwrap();
        assert_eq!(data.free, 2);
        assert_eq!(data.occupied, 8);
    }
}
