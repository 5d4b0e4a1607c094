//! Pure Rust color-key segmenter
//!
//! For hosts without a vendor segmentation service. The background color is
//! estimated from the image border; pixels that differ from it by more than
//! the tolerance are foreground, and each 4-connected foreground component
//! large enough to survive the noise filter becomes one instance.

use crate::{
    config::ColorKeyOptions,
    error::Result,
    platform::SegmentationTier,
    segmenter::{ForegroundRegion, ForegroundSegmenter, LabelImage, LabeledInstances},
};
use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Heuristic segmenter keyed on the dominant border color
#[derive(Debug, Clone)]
pub struct ColorKeySegmenter {
    tier: SegmentationTier,
    options: ColorKeyOptions,
}

impl ColorKeySegmenter {
    /// Multi-instance adapter: one instance per foreground component
    #[must_use]
    pub fn general(options: ColorKeyOptions) -> Self {
        Self {
            tier: SegmentationTier::GeneralObject,
            options,
        }
    }

    /// Single-mask adapter: the union of all components
    #[must_use]
    pub fn person_only(options: ColorKeyOptions) -> Self {
        Self {
            tier: SegmentationTier::PersonOnly,
            options,
        }
    }

    /// Per-channel median of the outermost pixel ring
    fn estimate_background(image: &RgbaImage) -> [u8; 3] {
        let (width, height) = image.dimensions();
        let mut channels: [Vec<u8>; 3] = [Vec::new(), Vec::new(), Vec::new()];

        for (x, y, pixel) in image.enumerate_pixels() {
            let on_border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
            if on_border {
                for (channel, value) in channels.iter_mut().zip(pixel.0.iter()) {
                    channel.push(*value);
                }
            }
        }

        let mut background = [0u8; 3];
        for (slot, channel) in background.iter_mut().zip(channels.iter_mut()) {
            channel.sort_unstable();
            *slot = channel.get(channel.len() / 2).copied().unwrap_or(0);
        }
        background
    }

    fn foreground_bitmap(&self, image: &RgbaImage, background: [u8; 3]) -> GrayImage {
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            let pixel = image.get_pixel(x, y);
            if pixel[3] == 0 {
                return Luma([0]);
            }
            let distance = pixel
                .0
                .iter()
                .take(3)
                .zip(background.iter())
                .map(|(value, reference)| value.abs_diff(*reference))
                .max()
                .unwrap_or(0);
            if distance > self.options.tolerance {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// Label 4-connected components, dropping those below the minimum area
    ///
    /// Returns the label image and the surviving labels in ascending order.
    fn components(&self, bitmap: &GrayImage) -> (LabelImage, Vec<u32>) {
        let labels = connected_components(bitmap, Connectivity::Four, Luma([0u8]));

        let mut areas: HashMap<u32, u32> = HashMap::new();
        for label in labels.pixels().map(|pixel| pixel[0]).filter(|&l| l != 0) {
            *areas.entry(label).or_default() += 1;
        }

        let mut kept: Vec<u32> = areas
            .into_iter()
            .filter(|&(_, area)| area >= self.options.min_component_area)
            .map(|(label, _)| label)
            .collect();
        kept.sort_unstable();
        (labels, kept)
    }
}

impl ForegroundSegmenter for ColorKeySegmenter {
    fn name(&self) -> &str {
        "color-key"
    }

    fn tier(&self) -> SegmentationTier {
        self.tier
    }

    fn segment(&self, image: &DynamicImage) -> Result<Vec<ForegroundRegion>> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let background = Self::estimate_background(&rgba);
        let bitmap = self.foreground_bitmap(&rgba, background);
        let (labels, kept) = self.components(&bitmap);
        debug!(
            background = ?background,
            components = kept.len(),
            "color key segmentation finished"
        );

        if kept.is_empty() {
            return Ok(Vec::new());
        }

        match self.tier {
            SegmentationTier::GeneralObject => {
                let observation = LabeledInstances::new(Arc::new(rgba), labels, kept);
                Ok(vec![ForegroundRegion::Instances(Box::new(observation))])
            },
            SegmentationTier::PersonOnly => {
                let union = GrayImage::from_fn(width, height, |x, y| {
                    let label = labels.get_pixel(x, y)[0];
                    if label != 0 && kept.binary_search(&label).is_ok() {
                        Luma([255])
                    } else {
                        Luma([0])
                    }
                });
                Ok(vec![ForegroundRegion::PersonMask(union)])
            },
        }
    }
}
