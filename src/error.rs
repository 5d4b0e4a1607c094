//! Error types for background removal operations
//!
//! Every failure surfaced through the bridge carries the `BackgroundRemover`
//! domain and one of the stable numeric codes below, so hosts can branch on
//! the code without parsing messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error domain reported with every bridge failure
pub const ERROR_DOMAIN: &str = "BackgroundRemover";

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, BgRemovalError>;

/// Stable numeric failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorCode {
    UnsupportedOsVersion = 1,
    UnsupportedEnvironment = 2,
    InvalidUri = 3,
    ImageLoad = 4,
    NoPersonDetected = 5,
    RenderFailed = 6,
    SaveFailed = 7,
    CombineFailed = 8,
    NoForegroundDetected = 9,
}

impl ErrorCode {
    /// Numeric value as delivered to the host
    #[must_use]
    pub fn as_i32(self) -> i32 {
        i32::from(self as u8)
    }
}

/// Error types for background removal operations
#[derive(Error, Debug)]
pub enum BgRemovalError {
    /// Host OS is below every supported segmentation floor
    #[error("Unsupported OS version: {0}")]
    UnsupportedOsVersion(String),

    /// Simulator or emulator without segmentation support
    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// Image URI could not be parsed
    #[error("Invalid image URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Source image could not be read or decoded
    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    /// Person-only segmentation returned no mask
    #[error("No people detected in image")]
    NoPersonDetected,

    /// Composited image could not be rendered to a pixel buffer
    #[error("Failed to render output image: {0}")]
    RenderFailed(String),

    /// PNG encoding or file write failed
    #[error("Failed to save output image: {0}")]
    SaveFailed(String),

    /// No observation produced a usable masked image
    #[error("Failed to combine foreground instances: {0}")]
    CombineFailed(String),

    /// General segmentation returned no observations
    #[error("No foreground objects detected in image")]
    NoForegroundDetected,

    /// Segmentation adapter reported a failure of its own
    #[error("Segmentation error: {0}")]
    Segmentation(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BgRemovalError {
    pub fn unsupported_os<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedOsVersion(msg.into())
    }

    pub fn unsupported_environment<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedEnvironment(msg.into())
    }

    pub fn invalid_uri<U: Into<String>, R: Into<String>>(uri: U, reason: R) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn image_load<S: Into<String>>(msg: S) -> Self {
        Self::ImageLoad(msg.into())
    }

    pub fn render<S: Into<String>>(msg: S) -> Self {
        Self::RenderFailed(msg.into())
    }

    pub fn save<S: Into<String>>(msg: S) -> Self {
        Self::SaveFailed(msg.into())
    }

    pub fn combine<S: Into<String>>(msg: S) -> Self {
        Self::CombineFailed(msg.into())
    }

    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::Segmentation(msg.into())
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        Self::SaveFailed(format!(
            "Failed to {} '{}': {}",
            operation,
            path.as_ref().display(),
            error
        ))
    }

    /// Stable code reported across the bridge
    ///
    /// Adapter failures count as combination failures, configuration errors
    /// never reach the bridge and are reported as render failures if they do.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedOsVersion(_) => ErrorCode::UnsupportedOsVersion,
            Self::UnsupportedEnvironment(_) => ErrorCode::UnsupportedEnvironment,
            Self::InvalidUri { .. } => ErrorCode::InvalidUri,
            Self::ImageLoad(_) => ErrorCode::ImageLoad,
            Self::NoPersonDetected => ErrorCode::NoPersonDetected,
            Self::RenderFailed(_) | Self::InvalidConfig(_) => ErrorCode::RenderFailed,
            Self::SaveFailed(_) => ErrorCode::SaveFailed,
            Self::CombineFailed(_) | Self::Segmentation(_) => ErrorCode::CombineFailed,
            Self::NoForegroundDetected => ErrorCode::NoForegroundDetected,
        }
    }

    #[must_use]
    pub fn domain(&self) -> &'static str {
        ERROR_DOMAIN
    }

    /// Host capability failures, detected before any work starts
    #[must_use]
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedOsVersion(_) | Self::UnsupportedEnvironment(_)
        )
    }

    /// Bad input, the caller must supply a different image
    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, Self::InvalidUri { .. } | Self::ImageLoad(_))
    }

    /// Expected outcome for images without a salient subject
    #[must_use]
    pub fn is_detection_empty(&self) -> bool {
        matches!(self, Self::NoPersonDetected | Self::NoForegroundDetected)
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        !(self.is_environment() || self.is_input() || self.is_detection_empty())
    }
}

/// Failure record delivered to the host when a call is rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeError {
    pub domain: String,
    pub code: i32,
    pub message: String,
}

impl From<&BgRemovalError> for BridgeError {
    fn from(error: &BgRemovalError) -> Self {
        Self {
            domain: error.domain().to_string(),
            code: error.code().as_i32(),
            message: error.to_string(),
        }
    }
}

impl From<BgRemovalError> for BridgeError {
    fn from(error: BgRemovalError) -> Self {
        Self::from(&error)
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error {}: {}", self.domain, self.code, self.message)
    }
}

impl std::error::Error for BridgeError {}
