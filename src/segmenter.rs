//! Foreground segmentation abstraction and strategy registry
//!
//! A platform adapter (Vision, MLKit, or one of the built-in backends)
//! implements [`ForegroundSegmenter`] for exactly one [`SegmentationTier`].
//! The processor looks the adapter up by tier and never touches the vendor
//! API directly.

use crate::{
    error::{BgRemovalError, Result},
    platform::SegmentationTier,
};
use image::{imageops, DynamicImage, GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One multi-instance observation from a general segmentation request
pub trait InstanceObservation: Send {
    /// Identifiers of the instances detected in this observation
    fn instance_ids(&self) -> Vec<u32>;

    /// Source pixels with everything outside `instances` made transparent
    ///
    /// The result covers the whole frame the observation was made on; it is
    /// not cropped to the instances' extent.
    ///
    /// # Errors
    /// - Unknown instance identifiers
    /// - Adapter-specific rendering failures
    fn masked_image(&self, instances: &[u32]) -> Result<RgbaImage>;
}

/// Output of a segmentation request
pub enum ForegroundRegion {
    /// Observation with separately addressable instances
    Instances(Box<dyn InstanceObservation>),
    /// Single person mask, 255 where a person was found
    PersonMask(GrayImage),
}

impl std::fmt::Debug for ForegroundRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instances(observation) => f
                .debug_tuple("Instances")
                .field(&observation.instance_ids())
                .finish(),
            Self::PersonMask(mask) => f
                .debug_tuple("PersonMask")
                .field(&mask.dimensions())
                .finish(),
        }
    }
}

/// Capability interface implemented by platform adapters
pub trait ForegroundSegmenter: Send + Sync {
    /// Adapter name for logging
    fn name(&self) -> &str;

    /// The tier this adapter serves
    fn tier(&self) -> SegmentationTier;

    /// Run segmentation once on an orientation-corrected image
    ///
    /// General-tier adapters return `Instances` regions, person-tier adapters
    /// return at most one `PersonMask`. An empty vector means nothing was
    /// found.
    ///
    /// # Errors
    /// - The underlying segmentation service failed
    fn segment(&self, image: &DynamicImage) -> Result<Vec<ForegroundRegion>>;
}

/// Strategy table keyed by segmentation tier
#[derive(Default, Clone)]
pub struct SegmenterRegistry {
    segmenters: HashMap<SegmentationTier, Arc<dyn ForegroundSegmenter>>,
}

impl SegmenterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own tier, replacing any previous one
    pub fn register(&mut self, segmenter: Arc<dyn ForegroundSegmenter>) {
        self.segmenters.insert(segmenter.tier(), segmenter);
    }

    #[must_use]
    pub fn with(mut self, segmenter: Arc<dyn ForegroundSegmenter>) -> Self {
        self.register(segmenter);
        self
    }

    #[must_use]
    pub fn get(&self, tier: SegmentationTier) -> Option<Arc<dyn ForegroundSegmenter>> {
        self.segmenters.get(&tier).cloned()
    }

    /// Adapter for `tier`
    ///
    /// # Errors
    /// - `UnsupportedOsVersion` when nothing is registered for the tier
    pub fn select(&self, tier: SegmentationTier) -> Result<Arc<dyn ForegroundSegmenter>> {
        self.get(tier).ok_or_else(|| {
            BgRemovalError::unsupported_os(format!("no segmenter registered for tier {tier}"))
        })
    }

    #[must_use]
    pub fn tiers(&self) -> Vec<SegmentationTier> {
        let mut tiers: Vec<_> = self.segmenters.keys().copied().collect();
        tiers.sort_by_key(|tier| *tier != SegmentationTier::GeneralObject);
        tiers
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segmenters.is_empty()
    }
}

/// Observation backed by per-instance masks over a source frame
///
/// Masks may be smaller than the source (adapters that segment a downscaled
/// copy); the masked image is then rendered at the mask resolution.
pub struct MaskedInstances {
    source: Arc<RgbaImage>,
    instances: Vec<(u32, GrayImage)>,
}

impl MaskedInstances {
    #[must_use]
    pub fn new(source: Arc<RgbaImage>, instances: Vec<(u32, GrayImage)>) -> Self {
        Self { source, instances }
    }
}

impl InstanceObservation for MaskedInstances {
    fn instance_ids(&self) -> Vec<u32> {
        self.instances.iter().map(|(id, _)| *id).collect()
    }

    fn masked_image(&self, instances: &[u32]) -> Result<RgbaImage> {
        let mut selected = Vec::with_capacity(instances.len());
        for id in instances {
            let mask = self
                .instances
                .iter()
                .find(|(candidate, _)| candidate == id)
                .map(|(_, mask)| mask)
                .ok_or_else(|| BgRemovalError::segmentation(format!("unknown instance {id}")))?;
            selected.push(mask);
        }

        let Some(first) = selected.first() else {
            return Err(BgRemovalError::segmentation("no instances requested"));
        };
        let (width, height) = first.dimensions();
        if selected.iter().any(|mask| mask.dimensions() != (width, height)) {
            return Err(BgRemovalError::segmentation(
                "instance masks have mismatched dimensions",
            ));
        }

        let resized = if self.source.dimensions() == (width, height) {
            None
        } else {
            Some(imageops::resize(
                &*self.source,
                width,
                height,
                imageops::FilterType::Triangle,
            ))
        };
        let frame: &RgbaImage = resized.as_ref().unwrap_or(&*self.source);

        Ok(RgbaImage::from_fn(width, height, |x, y| {
            let coverage = selected
                .iter()
                .map(|mask| mask.get_pixel(x, y)[0])
                .max()
                .unwrap_or(0);
            let pixel = frame.get_pixel(x, y);
            let alpha = (u16::from(pixel[3]) * u16::from(coverage) / 255) as u8;
            if alpha == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([pixel[0], pixel[1], pixel[2], alpha])
            }
        }))
    }
}

/// Per-pixel component labels, 0 for background
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Observation backed by a single label image
///
/// Each instance id is a label value; any number of instances costs one
/// frame of labels.
pub struct LabeledInstances {
    source: Arc<RgbaImage>,
    labels: LabelImage,
    /// Instance labels, ascending
    ids: Vec<u32>,
}

impl LabeledInstances {
    #[must_use]
    pub fn new(source: Arc<RgbaImage>, labels: LabelImage, mut ids: Vec<u32>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self {
            source,
            labels,
            ids,
        }
    }
}

impl InstanceObservation for LabeledInstances {
    fn instance_ids(&self) -> Vec<u32> {
        self.ids.clone()
    }

    fn masked_image(&self, instances: &[u32]) -> Result<RgbaImage> {
        if instances.is_empty() {
            return Err(BgRemovalError::segmentation("no instances requested"));
        }
        if let Some(id) = instances
            .iter()
            .find(|&&id| self.ids.binary_search(&id).is_err())
        {
            return Err(BgRemovalError::segmentation(format!("unknown instance {id}")));
        }
        if self.labels.dimensions() != self.source.dimensions() {
            return Err(BgRemovalError::segmentation(
                "label image does not match the source frame",
            ));
        }

        let selected: HashSet<u32> = instances.iter().copied().collect();
        let mut masked = RgbaImage::new(self.source.width(), self.source.height());
        for ((dst, src), label) in masked
            .pixels_mut()
            .zip(self.source.pixels())
            .zip(self.labels.pixels())
        {
            if src[3] > 0 && selected.contains(&label[0]) {
                *dst = *src;
            }
        }
        Ok(masked)
    }
}
