//! Background removal processor
//!
//! This module provides `BackgroundRemovalProcessor`, the synchronous core
//! behind the bridge: gate on host capability, validate the URI, segment
//! with the adapter registered for the host's tier, composite, encode and
//! persist. It runs to completion on whatever thread calls it; the bridge
//! moves it off the caller's thread.

use crate::{
    compose::{blend_with_mask, combine_observations, scale_mask_to_extent, scale_to_extent},
    config::RemoverConfig,
    error::{BgRemovalError, Result},
    platform::{resolve_tier, PlatformInfo, SegmentationTier},
    segmenter::{ForegroundRegion, InstanceObservation, SegmenterRegistry},
    services::ImageIOService,
    types::{ProcessingMetadata, ProcessingTimings, RemovalOutcome},
    utils::{file_uri, ImageSource},
};
use chrono::Utc;
use image::{DynamicImage, RgbaImage};
use instant::Instant;
use tracing::{debug, info, instrument, span, warn, Level};

/// Composited image plus bookkeeping for metadata
struct Composited {
    image: RgbaImage,
    observations: usize,
    contributing: usize,
}

/// Orchestrates a single background removal call
#[derive(Clone)]
pub struct BackgroundRemovalProcessor {
    config: RemoverConfig,
    platform: PlatformInfo,
    registry: SegmenterRegistry,
}

impl BackgroundRemovalProcessor {
    /// Create a processor for a host
    ///
    /// # Errors
    /// - `InvalidConfig` when the configuration does not validate
    pub fn new(
        config: RemoverConfig,
        platform: PlatformInfo,
        registry: SegmenterRegistry,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            platform,
            registry,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RemoverConfig {
        &self.config
    }

    #[must_use]
    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    #[must_use]
    pub fn registry(&self) -> &SegmenterRegistry {
        &self.registry
    }

    /// Tier this host would use
    ///
    /// # Errors
    /// - `UnsupportedEnvironment` / `UnsupportedOsVersion`
    pub fn resolve_tier(&self) -> Result<SegmentationTier> {
        resolve_tier(&self.platform, &self.config.floors_for(self.platform.platform))
    }

    /// Remove the background of the image at `image_uri`
    ///
    /// Capability gating and URI validation happen before any decoding or
    /// segmentation, so those failures have no side effects.
    ///
    /// # Errors
    /// Every failure code of [`crate::error::ErrorCode`].
    #[instrument(
        skip(self),
        fields(
            platform = %self.platform.platform,
            os_version = %self.platform.os_version
        )
    )]
    pub fn process(&self, image_uri: &str) -> Result<RemovalOutcome> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();

        let tier = self.resolve_tier()?;
        let source = ImageSource::parse(image_uri)?;
        let segmenter = self.registry.select(tier)?;

        info!(
            tier = %tier,
            segmenter = segmenter.name(),
            source = %source,
            "Starting background removal"
        );

        let image = {
            let _span = span!(Level::DEBUG, "decode").entered();
            let start = Instant::now();
            let image = ImageIOService::load_oriented(&source)?;
            timings.image_decode_ms = start.elapsed().as_millis() as u64;
            image
        };
        let extent = (image.width(), image.height());

        let regions = {
            let _span = span!(Level::INFO, "segmentation", segmenter = segmenter.name()).entered();
            let start = Instant::now();
            let regions = segmenter.segment(&image)?;
            timings.segmentation_ms = start.elapsed().as_millis() as u64;
            debug!(regions = regions.len(), "segmentation returned");
            regions
        };

        let composited = {
            let _span = span!(Level::DEBUG, "compositing", width = extent.0, height = extent.1)
                .entered();
            let start = Instant::now();
            let composited = match tier {
                SegmentationTier::GeneralObject => Self::composite_instances(regions, extent)?,
                SegmentationTier::PersonOnly => Self::composite_person(&image, regions, extent)?,
            };
            timings.compositing_ms = start.elapsed().as_millis() as u64;
            composited
        };

        let output = Self::render(composited.image, extent)?;

        let (output_path, output_uri) = {
            let _span = span!(Level::DEBUG, "persist").entered();
            let start = Instant::now();
            let bytes = ImageIOService::encode_png(&output)?;
            let file_name =
                ImageIOService::output_file_name(&source.base_name(), self.config.output_naming);
            let output_dir = self.config.output_dir();
            // The URI must be formable before anything lands on disk
            let uri = file_uri(&output_dir.join(&file_name))?;
            let path = ImageIOService::persist(&bytes, &output_dir, &file_name)?;
            timings.image_encode_ms = start.elapsed().as_millis() as u64;
            (path, uri)
        };

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        if self.config.debug {
            info!(timings = %timings.summary(), "Stage timings");
        } else {
            debug!(timings = %timings.summary(), "Stage timings");
        }

        let metadata = ProcessingMetadata {
            tier,
            segmenter: segmenter.name().to_string(),
            observations: composited.observations,
            contributing: composited.contributing,
            timings,
            completed_at: Utc::now(),
        };

        info!(
            output = %output_uri,
            contributing = metadata.contributing,
            total_ms = metadata.timings.total_ms,
            "Background removal completed"
        );

        Ok(RemovalOutcome {
            output_path,
            output_uri,
            dimensions: extent,
            metadata,
        })
    }

    /// General path: layer every observation's masked image
    fn composite_instances(
        regions: Vec<ForegroundRegion>,
        extent: (u32, u32),
    ) -> Result<Composited> {
        let observations: Vec<Box<dyn InstanceObservation>> = regions
            .into_iter()
            .filter_map(|region| match region {
                ForegroundRegion::Instances(observation) => Some(observation),
                ForegroundRegion::PersonMask(_) => {
                    warn!("ignoring person mask returned by a general segmenter");
                    None
                },
            })
            .collect();

        if observations.is_empty() {
            return Err(BgRemovalError::NoForegroundDetected);
        }

        let composite = combine_observations(&observations, extent)?;
        if composite.skipped > 0 {
            warn!(
                skipped = composite.skipped,
                contributing = composite.contributing,
                "some observations were skipped"
            );
        }

        Ok(Composited {
            image: scale_to_extent(composite.image, extent),
            observations: observations.len(),
            contributing: composite.contributing,
        })
    }

    /// Legacy path: blend the source with the first person mask
    fn composite_person(
        image: &DynamicImage,
        regions: Vec<ForegroundRegion>,
        extent: (u32, u32),
    ) -> Result<Composited> {
        let observations = regions.len();
        let mask = regions
            .into_iter()
            .find_map(|region| match region {
                ForegroundRegion::PersonMask(mask) => Some(mask),
                ForegroundRegion::Instances(_) => None,
            })
            .ok_or(BgRemovalError::NoPersonDetected)?;

        let mask = scale_mask_to_extent(mask, extent);
        let blended = blend_with_mask(&image.to_rgba8(), &mask)?;

        Ok(Composited {
            image: blended,
            observations,
            contributing: 1,
        })
    }

    /// Final check that the composite is a concrete buffer of the source extent
    fn render(image: RgbaImage, extent: (u32, u32)) -> Result<RgbaImage> {
        let dimensions = image.dimensions();
        if dimensions.0 == 0 || dimensions.1 == 0 {
            return Err(BgRemovalError::render("composited image is empty"));
        }
        if dimensions != extent {
            return Err(BgRemovalError::render(format!(
                "composited image is {dimensions:?}, expected {extent:?}"
            )));
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::StaticSegmenter;
    use crate::error::ErrorCode;
    use crate::platform::OsVersion;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_source(dir: &TempDir, name: &str, width: u32, height: u32) -> String {
        let path = dir.path().join(name);
        RgbImage::from_pixel(width, height, Rgb([90, 120, 150]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();
        path.display().to_string()
    }

    fn left_half(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    fn processor(
        dir: &TempDir,
        platform: PlatformInfo,
        segmenter: StaticSegmenter,
    ) -> BackgroundRemovalProcessor {
        let config = RemoverConfig::builder()
            .temp_dir(dir.path().join("out"))
            .build()
            .unwrap();
        let registry = SegmenterRegistry::new().with(Arc::new(segmenter));
        BackgroundRemovalProcessor::new(config, platform, registry).unwrap()
    }

    #[test]
    fn test_general_path_writes_png() {
        let dir = TempDir::new().unwrap();
        let uri = write_source(&dir, "photo.png", 20, 10);
        let processor = processor(
            &dir,
            PlatformInfo::detect(),
            StaticSegmenter::general(vec![vec![left_half(20, 10)]]),
        );

        let outcome = processor.process(&uri).unwrap();
        assert_eq!(outcome.dimensions, (20, 10));
        assert_eq!(outcome.metadata.tier, SegmentationTier::GeneralObject);
        assert_eq!(outcome.metadata.contributing, 1);
        assert!(outcome.output_uri.starts_with("file://"));

        let written = image::open(&outcome.output_path).unwrap().to_rgba8();
        assert_eq!(written.get_pixel(2, 5)[3], 255);
        assert_eq!(written.get_pixel(17, 5)[3], 0);
    }

    #[test]
    fn test_person_path_scales_half_resolution_mask() {
        let dir = TempDir::new().unwrap();
        let uri = write_source(&dir, "person.png", 40, 30);
        let processor = processor(
            &dir,
            PlatformInfo::ios(OsVersion::new(16, 0, 0), false),
            StaticSegmenter::person(Some(left_half(20, 15))),
        );

        let outcome = processor.process(&uri).unwrap();
        assert_eq!(outcome.metadata.tier, SegmentationTier::PersonOnly);
        let written = image::open(&outcome.output_path).unwrap().to_rgba8();
        assert_eq!(written.dimensions(), (40, 30));
        assert_eq!(written.get_pixel(3, 15)[3], 255);
        assert_eq!(written.get_pixel(37, 15)[3], 0);
    }

    #[test]
    fn test_unsupported_os_skips_decode() {
        let dir = TempDir::new().unwrap();
        let segmenter = StaticSegmenter::general(Vec::new());
        let probe = segmenter.clone();
        let processor = processor(
            &dir,
            PlatformInfo::ios(OsVersion::new(13, 0, 0), false),
            segmenter,
        );

        let err = processor.process("/does/not/exist.jpg").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedOsVersion);
        assert_eq!(probe.segment_calls(), 0);
    }

    #[test]
    fn test_invalid_uri_skips_segmentation() {
        let dir = TempDir::new().unwrap();
        let segmenter = StaticSegmenter::general(vec![vec![left_half(4, 4)]]);
        let probe = segmenter.clone();
        let processor = processor(&dir, PlatformInfo::detect(), segmenter);

        let err = processor.process("http://[::1").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidUri);
        assert_eq!(probe.segment_calls(), 0);
    }

    #[test]
    fn test_empty_results_have_distinct_codes() {
        let dir = TempDir::new().unwrap();
        let uri = write_source(&dir, "empty.png", 8, 8);

        let general = processor(&dir, PlatformInfo::detect(), StaticSegmenter::general(Vec::new()));
        let person = processor(
            &dir,
            PlatformInfo::ios(OsVersion::new(15, 5, 0), false),
            StaticSegmenter::person(None),
        );

        assert_eq!(
            general.process(&uri).unwrap_err().code(),
            ErrorCode::NoForegroundDetected
        );
        assert_eq!(
            person.process(&uri).unwrap_err().code(),
            ErrorCode::NoPersonDetected
        );
    }

    #[test]
    fn test_all_observations_failing() {
        let dir = TempDir::new().unwrap();
        let uri = write_source(&dir, "broken.png", 8, 8);
        let segmenter = StaticSegmenter::general(vec![vec![left_half(8, 8)]])
            .with_failing_observation(0);
        let processor = processor(&dir, PlatformInfo::detect(), segmenter);

        assert_eq!(
            processor.process(&uri).unwrap_err().code(),
            ErrorCode::CombineFailed
        );
    }

    #[test]
    fn test_relative_output_dir_rejected_up_front() {
        let config = RemoverConfig {
            temp_dir: Some(std::path::PathBuf::from("relative_bgremove_out")),
            ..RemoverConfig::default()
        };
        let segmenter = StaticSegmenter::general(vec![vec![left_half(4, 4)]]);
        let registry = SegmenterRegistry::new().with(Arc::new(segmenter.clone()));

        let err = BackgroundRemovalProcessor::new(config, PlatformInfo::detect(), registry)
            .err()
            .unwrap();
        assert_eq!(err.code(), ErrorCode::RenderFailed);
        assert!(!std::path::Path::new("relative_bgremove_out").exists());
        assert_eq!(segmenter.segment_calls(), 0);
    }

    #[test]
    fn test_render_rejects_wrong_extent() {
        let err = BackgroundRemovalProcessor::render(RgbaImage::new(4, 4), (8, 8)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::RenderFailed);
        assert!(BackgroundRemovalProcessor::render(RgbaImage::new(8, 8), (8, 8)).is_ok());
    }
}
