//! Mask and image compositing
//!
//! All images here carry straight (non-premultiplied) alpha.

use crate::{
    error::{BgRemovalError, Result},
    segmenter::InstanceObservation,
};
use image::{imageops, GrayImage, Rgba, RgbaImage};
use tracing::{debug, warn};

/// Composite produced by [`combine_observations`]
#[derive(Debug, Clone)]
pub struct Composite {
    pub image: RgbaImage,
    /// Observations that contributed a layer
    pub contributing: usize,
    /// Observations that were skipped
    pub skipped: usize,
}

/// Resize `image` to `extent`, scaling each axis independently
#[must_use]
pub fn scale_to_extent(image: RgbaImage, extent: (u32, u32)) -> RgbaImage {
    if image.dimensions() == extent {
        return image;
    }
    debug!(from = ?image.dimensions(), to = ?extent, "scaling image to source extent");
    imageops::resize(&image, extent.0, extent.1, imageops::FilterType::Triangle)
}

/// Resize `mask` to `extent`, scaling each axis independently
#[must_use]
pub fn scale_mask_to_extent(mask: GrayImage, extent: (u32, u32)) -> GrayImage {
    if mask.dimensions() == extent {
        return mask;
    }
    debug!(from = ?mask.dimensions(), to = ?extent, "scaling mask to source extent");
    imageops::resize(&mask, extent.0, extent.1, imageops::FilterType::Triangle)
}

/// Source-over: draw `layer` on top of `base` in place
///
/// # Errors
/// - `RenderFailed` when the two images differ in size
pub fn layer_over(base: &mut RgbaImage, layer: &RgbaImage) -> Result<()> {
    if base.dimensions() != layer.dimensions() {
        return Err(BgRemovalError::render(format!(
            "cannot layer {:?} over {:?}",
            layer.dimensions(),
            base.dimensions()
        )));
    }

    imageops::overlay(base, layer, 0, 0);
    Ok(())
}

/// Layer every observation's masked image into one transparent composite
///
/// Each observation is asked for the masked image of all its instances at
/// once. Observations without instances, or whose request fails, are skipped;
/// only when none contributes does the whole combination fail.
///
/// # Errors
/// - `CombineFailed` when no observation produced a masked image
pub fn combine_observations(
    observations: &[Box<dyn InstanceObservation>],
    extent: (u32, u32),
) -> Result<Composite> {
    let mut composite: Option<RgbaImage> = None;
    let mut contributing = 0;
    let mut skipped = 0;

    for (index, observation) in observations.iter().enumerate() {
        let instances = observation.instance_ids();
        if instances.is_empty() {
            debug!(observation = index, "observation has no instances, skipping");
            skipped += 1;
            continue;
        }

        let layer = match observation.masked_image(&instances) {
            Ok(layer) => scale_to_extent(layer, extent),
            Err(e) => {
                warn!(observation = index, error = %e, "failed to extract instances, skipping");
                skipped += 1;
                continue;
            },
        };

        match composite.as_mut() {
            Some(base) => layer_over(base, &layer)?,
            None => composite = Some(layer),
        }
        contributing += 1;
    }

    let image = composite.ok_or_else(|| {
        BgRemovalError::combine(format!(
            "none of {} observations produced a masked image",
            observations.len()
        ))
    })?;

    Ok(Composite {
        image,
        contributing,
        skipped,
    })
}

/// Blend `source` against transparency using `mask` as opacity
///
/// # Errors
/// - `RenderFailed` when the mask and source differ in size
pub fn blend_with_mask(source: &RgbaImage, mask: &GrayImage) -> Result<RgbaImage> {
    if source.dimensions() != mask.dimensions() {
        return Err(BgRemovalError::render(format!(
            "mask {:?} does not match image {:?}",
            mask.dimensions(),
            source.dimensions()
        )));
    }

    let mut result = RgbaImage::new(source.width(), source.height());
    for ((dst, src), coverage) in result.pixels_mut().zip(source.pixels()).zip(mask.pixels()) {
        let alpha = (u16::from(src[3]) * u16::from(coverage[0]) / 255) as u8;
        if alpha > 0 {
            *dst = Rgba([src[0], src[1], src[2], alpha]);
        }
    }
    Ok(result)
}

/// Whether the image has both transparent and opaque pixels
#[must_use]
pub fn has_mixed_alpha(image: &RgbaImage) -> bool {
    let mut transparent = false;
    let mut opaque = false;
    for pixel in image.pixels() {
        match pixel[3] {
            0 => transparent = true,
            255 => opaque = true,
            _ => {},
        }
        if transparent && opaque {
            return true;
        }
    }
    false
}
