#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Background Remover
//!
//! Native side of a mobile `removeBackground(imageURI)` bridge. The crate
//! validates the image URI, picks a foreground segmentation strategy from the
//! host's capabilities, combines the segmentation result into a
//! transparent-background image and writes it as PNG to a temporary
//! directory, resolving with the file's URI.
//!
//! The segmentation itself is done by the platform (Apple Vision on iOS,
//! MLKit on Android). Hosts wrap those services in a
//! [`ForegroundSegmenter`] and register it for the tier it serves; the
//! crate ships a pure Rust color-key segmenter for hosts without one.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use background_remover::{BackgroundRemover, PlatformInfo, RemoverConfig};
//!
//! # async fn example() -> background_remover::Result<()> {
//! let remover = BackgroundRemover::with_color_key(
//!     RemoverConfig::default(),
//!     PlatformInfo::detect(),
//! )?;
//! let output_uri = remover.remove_background("file:///tmp/photo.jpg").await?;
//! println!("transparent image at {output_uri}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Callback-style hosts
//!
//! ```rust,no_run
//! use background_remover::{BackgroundRemover, Promise};
//!
//! # fn example(remover: &BackgroundRemover) {
//! let promise = Promise::new(
//!     |uri| println!("resolved: {uri}"),
//!     |error| eprintln!("rejected: {error}"),
//! );
//! remover.remove_background_with("file:///tmp/photo.jpg", promise);
//! # }
//! ```
//!
//! ## Failure codes
//!
//! Rejections carry the `BackgroundRemover` domain and a stable code, see
//! [`ErrorCode`].

pub mod backends;
pub mod bridge;
pub mod compose;
pub mod config;
pub mod error;
pub mod platform;
pub mod processor;
pub mod segmenter;
pub mod services;
#[cfg(feature = "subscriber")]
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::{ColorKeySegmenter, StaticSegmenter};
pub use bridge::{BackgroundRemover, BridgeResult, Promise};
pub use config::{ColorKeyOptions, OutputNaming, RemoverConfig, RemoverConfigBuilder};
pub use error::{BgRemovalError, BridgeError, ErrorCode, Result, ERROR_DOMAIN};
pub use platform::{
    resolve_tier, CapabilityFloors, HostPlatform, OsVersion, PlatformInfo, SegmentationTier,
};
pub use processor::BackgroundRemovalProcessor;
pub use segmenter::{
    ForegroundRegion, ForegroundSegmenter, InstanceObservation, LabelImage, LabeledInstances,
    MaskedInstances, SegmenterRegistry,
};
pub use services::ImageIOService;
pub use types::{ProcessingMetadata, ProcessingTimings, RemovalOutcome};
pub use utils::ImageSource;

#[cfg(feature = "subscriber")]
pub use tracing_config::{init_host_tracing, TracingConfig, TracingFormat};

/// Remove the background of `image_uri` with the built-in segmenter
///
/// Convenience for desktop hosts: uses [`PlatformInfo::detect`] and the
/// color-key segmenter on both tiers.
pub async fn remove_background(image_uri: &str, config: RemoverConfig) -> Result<String> {
    BackgroundRemover::with_color_key(config, PlatformInfo::detect())?
        .remove_background(image_uri)
        .await
}
