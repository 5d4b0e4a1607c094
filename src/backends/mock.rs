//! Deterministic segmentation stub for tests
//!
//! `StaticSegmenter` returns preconfigured masks instead of running a model,
//! so the orchestration can be exercised without platform services.

use crate::{
    error::{BgRemovalError, Result},
    platform::SegmentationTier,
    segmenter::{ForegroundRegion, ForegroundSegmenter, InstanceObservation, MaskedInstances},
};
use image::{DynamicImage, GrayImage, RgbaImage};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Stub segmenter with canned results
#[derive(Debug, Clone)]
pub struct StaticSegmenter {
    tier: SegmentationTier,
    /// Instance masks per observation (general tier)
    observations: Vec<Vec<GrayImage>>,
    /// Result of the person request (person tier)
    person_mask: Option<GrayImage>,
    /// Observations whose masked image request fails
    failing_observations: HashSet<usize>,
    /// Whether the whole request fails
    should_fail: bool,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
}

impl StaticSegmenter {
    /// General-tier stub; each entry is one observation's instance masks
    #[must_use]
    pub fn general(observations: Vec<Vec<GrayImage>>) -> Self {
        Self {
            tier: SegmentationTier::GeneralObject,
            observations,
            person_mask: None,
            failing_observations: HashSet::new(),
            should_fail: false,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Person-tier stub; `None` simulates an image without people
    #[must_use]
    pub fn person(mask: Option<GrayImage>) -> Self {
        Self {
            tier: SegmentationTier::PersonOnly,
            person_mask: mask,
            ..Self::general(Vec::new())
        }
    }

    /// Make the masked image request of observation `index` fail
    #[must_use]
    pub fn with_failing_observation(mut self, index: usize) -> Self {
        self.failing_observations.insert(index);
        self
    }

    /// Make every segmentation request fail
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn segment_calls(&self) -> usize {
        self.get_call_history()
            .iter()
            .filter(|call| call.starts_with("segment"))
            .count()
    }

    fn record_call(&self, call: String) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(call);
        }
    }
}

/// Observation whose masked image can never be produced
struct BrokenObservation {
    index: usize,
    instance_count: u32,
}

impl InstanceObservation for BrokenObservation {
    fn instance_ids(&self) -> Vec<u32> {
        (1..=self.instance_count).collect()
    }

    fn masked_image(&self, _instances: &[u32]) -> Result<RgbaImage> {
        Err(BgRemovalError::segmentation(format!(
            "observation {} could not be rendered",
            self.index
        )))
    }
}

impl ForegroundSegmenter for StaticSegmenter {
    fn name(&self) -> &str {
        match self.tier {
            SegmentationTier::GeneralObject => "static-general",
            SegmentationTier::PersonOnly => "static-person",
        }
    }

    fn tier(&self) -> SegmentationTier {
        self.tier
    }

    fn segment(&self, image: &DynamicImage) -> Result<Vec<ForegroundRegion>> {
        self.record_call(format!("segment {}x{}", image.width(), image.height()));

        if self.should_fail {
            return Err(BgRemovalError::segmentation("static segmenter failure"));
        }

        match self.tier {
            SegmentationTier::PersonOnly => Ok(self
                .person_mask
                .clone()
                .map(ForegroundRegion::PersonMask)
                .into_iter()
                .collect()),
            SegmentationTier::GeneralObject => {
                let source = Arc::new(image.to_rgba8());
                let regions = self
                    .observations
                    .iter()
                    .enumerate()
                    .map(|(index, masks)| {
                        let observation: Box<dyn InstanceObservation> =
                            if self.failing_observations.contains(&index) {
                                Box::new(BrokenObservation {
                                    index,
                                    instance_count: masks.len() as u32,
                                })
                            } else {
                                let instances = masks
                                    .iter()
                                    .cloned()
                                    .enumerate()
                                    .map(|(id, mask)| (id as u32 + 1, mask))
                                    .collect();
                                Box::new(MaskedInstances::new(Arc::clone(&source), instances))
                            };
                        ForegroundRegion::Instances(observation)
                    })
                    .collect();
                Ok(regions)
            },
        }
    }
}
