//! Segmentation backends shipped with the crate
//!
//! Platform adapters (Vision on iOS, MLKit on Android) live in the host
//! application and are registered through
//! [`SegmenterRegistry`](crate::segmenter::SegmenterRegistry). This module
//! provides:
//! - a color-key backend (pure Rust, for hosts without a vendor service)
//! - a static stub backend for tests

pub mod color_key;
pub mod mock;

pub use self::color_key::ColorKeySegmenter;
pub use self::mock::StaticSegmenter;
