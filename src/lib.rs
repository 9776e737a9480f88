//! Parkwatch Library
//!
//! Real-time parking-lot occupancy backend
//!
//! ## Architecture
//!
//! 1. LotStore - persistent lot state (occupancy, capacity, leaving-soon)
//! 2. FrameSource - looping video decode via ffmpeg
//! 3. InferenceClient - hosted spot-detection adapter
//! 4. OccupancyAggregator - detections to `{free, occupied, total}`
//! 5. OccupancyMonitor - reconciliation loop (sample, classify, persist)
//! 6. LeavingSoon - delayed counter unwind
//! 7. Departures - schedule histogram and expiry sweep
//! 8. LiveExport - side-channel occupancy file
//! 9. WebAPI - REST API endpoints
//!
//! ## Design Principles
//!
//! - Best effort, eventually correct: the store mediates all coordination
//! - Background loops never die on a single failed tick
//! - Invariants clamped at the write boundary, not assumed from the store

pub mod aggregator;
pub mod departures;
pub mod error;
pub mod frame_source;
pub mod inference_client;
pub mod leaving_soon;
pub mod live_export;
pub mod lot_store;
pub mod models;
pub mod occupancy_monitor;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
