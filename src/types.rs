//! Core types for background removal operations

use crate::platform::SegmentationTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-stage timing breakdown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Image loading and decoding
    pub image_decode_ms: u64,

    /// Platform segmentation request
    pub segmentation_ms: u64,

    /// Combination, scaling and blending
    pub compositing_ms: u64,

    /// PNG encoding and file write
    pub image_encode_ms: u64,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Time not attributed to any stage
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        self.total_ms.saturating_sub(
            self.image_decode_ms + self.segmentation_ms + self.compositing_ms + self.image_encode_ms,
        )
    }

    /// Get timing summary for display
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Total: {}ms | Decode: {}ms | Segment: {}ms | Composite: {}ms | Encode: {}ms",
            self.total_ms,
            self.image_decode_ms,
            self.segmentation_ms,
            self.compositing_ms,
            self.image_encode_ms
        )
    }
}

/// What happened during one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub tier: SegmentationTier,

    /// Name of the segmenter adapter that ran
    pub segmenter: String,

    /// Regions reported by the segmenter
    pub observations: usize,

    /// Regions that made it into the output
    pub contributing: usize,

    pub timings: ProcessingTimings,

    pub completed_at: DateTime<Utc>,
}

/// Result of a successful background removal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalOutcome {
    /// Written PNG file
    pub output_path: PathBuf,

    /// `file://` URL of `output_path`, as handed back to the host
    pub output_uri: String,

    /// Output dimensions, equal to the oriented source dimensions
    pub dimensions: (u32, u32),

    pub metadata: ProcessingMetadata,
}
