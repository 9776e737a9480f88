//! OccupancyMonitor - Occupancy Reconciliation Loop
//!
//! ## Responsibilities
//!
//! - Drive the frame source at its native pace, looping on exhaustion
//! - Classify every Nth frame through the spot classifier
//! - Aggregate detections and persist the result into lot state
//! - Mirror each sample to the live side file

use crate::aggregator;
use crate::frame_source::{Frame, FrameSource};
use crate::inference_client::SpotClassifier;
use crate::live_export::{LiveExporter, LiveLotData};
use crate::lot_store::LotStateStore;
use std::sync::Arc;
use std::time::Duration;

/// Pause between frame reads, bounding decode throughput. Independent of
/// the classification cadence.
const FRAME_READ_PAUSE: Duration = Duration::from_millis(10);

/// Outcome of one frame read, used by the loop to decide whether to go on
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stopped,
}

/// OccupancyMonitor instance
pub struct OccupancyMonitor {
    classifier: Arc<dyn SpotClassifier>,
    store: Arc<dyn LotStateStore>,
    exporter: Option<LiveExporter>,
    lot_name: String,
    interval_secs: u64,
    confidence_threshold: f32,
    frame_count: u64,
}

impl OccupancyMonitor {
    /// Create new OccupancyMonitor
    pub fn new(
        classifier: Arc<dyn SpotClassifier>,
        store: Arc<dyn LotStateStore>,
        exporter: Option<LiveExporter>,
        lot_name: String,
        interval_secs: u64,
        confidence_threshold: f32,
    ) -> Self {
        Self {
            classifier,
            store,
            exporter,
            lot_name,
            interval_secs,
            confidence_threshold,
            frame_count: 0,
        }
    }

    /// Start the reconciliation loop on a background task.
    ///
    /// The loop runs until process shutdown; the only terminal condition is
    /// a frame source that can no longer be reopened.
    pub fn start(self, source: Box<dyn FrameSource>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run(source).await;
        })
    }

    async fn run(mut self, mut source: Box<dyn FrameSource>) {
        let stride = classification_stride(source.frame_rate(), self.interval_secs);

        tracing::info!(
            lot = %self.lot_name,
            frame_rate = source.frame_rate(),
            interval_secs = self.interval_secs,
            stride = stride,
            "Occupancy monitor started"
        );

        loop {
            if self.step(source.as_mut(), stride).await == Step::Stopped {
                break;
            }
            tokio::time::sleep(FRAME_READ_PAUSE).await;
        }

        tracing::error!(lot = %self.lot_name, "Occupancy monitor stopped");
    }

    /// Process one frame read: advance the counter, classify when the
    /// counter lands on the cadence, rewind on exhaustion.
    pub(crate) async fn step(&mut self, source: &mut dyn FrameSource, stride: u64) -> Step {
        let frame = match source.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                // Finite asset exhausted; seek back and keep going
                return match source.rewind().await {
                    Ok(()) => Step::Continue,
                    Err(e) => {
                        tracing::error!(error = %e, "Frame source could not be reopened");
                        Step::Stopped
                    }
                };
            }
            Err(e) => {
                tracing::warn!(error = %e, "Frame read failed");
                return Step::Continue;
            }
        };

        if self.frame_count % stride == 0 {
            self.classify_and_persist(&frame).await;
        }
        self.frame_count += 1;

        Step::Continue
    }

    /// One reconciliation tick: classify, aggregate, persist. Every failure
    /// is logged and swallowed; the previously persisted value stands.
    async fn classify_and_persist(&self, frame: &Frame) {
        let detections = match self.classifier.classify(&frame.data).await {
            Ok(detections) => detections,
            Err(e) => {
                tracing::warn!(
                    lot = %self.lot_name,
                    frame = self.frame_count,
                    error = %e,
                    "Classification failed, keeping previous occupancy"
                );
                return;
            }
        };

        let snapshot = aggregator::aggregate(&detections, self.confidence_threshold);

        tracing::info!(
            lot = %self.lot_name,
            frame = self.frame_count,
            free = snapshot.free,
            occupied = snapshot.occupied,
            total = snapshot.total,
            "Occupancy sample"
        );

        if let Err(e) = self.store.record_occupancy(&self.lot_name, &snapshot).await {
            tracing::warn!(lot = %self.lot_name, error = %e, "Occupancy write failed");
        }

        if let Some(exporter) = &self.exporter {
            let data = LiveLotData::now(&self.lot_name, &snapshot);
            if let Err(e) = exporter.write(&data).await {
                tracing::warn!(error = %e, "Live data file write failed");
            }
        }
    }
}

/// Frames between classifications: the floor of frame rate times interval,
/// at least one
pub(crate) fn classification_stride(frame_rate: f64, interval_secs: u64) -> u64 {
    ((frame_rate * interval_secs as f64) as u64).max(1)
}
