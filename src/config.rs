//! Configuration types for background removal operations

use crate::error::{BgRemovalError, Result};
use crate::platform::{CapabilityFloors, HostPlatform};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How output files are named inside the temporary directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputNaming {
    /// `<source name>.png`; calls on the same source name overwrite each other
    SourceName,
    /// `<source name>-<uuid>.png`; every call gets its own file
    #[default]
    Unique,
}

/// Tuning for the built-in color-key segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorKeyOptions {
    /// Per-channel distance from the background color that counts as foreground (1-255)
    pub tolerance: u8,
    /// Components with fewer pixels are treated as noise
    pub min_component_area: u32,
}

impl Default for ColorKeyOptions {
    fn default() -> Self {
        Self {
            tolerance: 40,
            min_component_area: 64,
        }
    }
}

/// Configuration for background removal operations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoverConfig {
    /// Output directory (None = system temp dir)
    pub temp_dir: Option<PathBuf>,

    pub output_naming: OutputNaming,

    /// Capability floors (None = defaults for the host platform)
    pub floors: Option<CapabilityFloors>,

    pub color_key: ColorKeyOptions,

    /// Enable debug mode (per-stage timings logged at info level)
    pub debug: bool,
}

impl RemoverConfig {
    #[must_use]
    pub fn builder() -> RemoverConfigBuilder {
        RemoverConfigBuilder::new()
    }

    /// Load configuration from a JSON document
    ///
    /// # Errors
    /// - Malformed JSON or unknown enum values
    /// - Values rejected by [`RemoverConfig::validate`]
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BgRemovalError::invalid_config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    ///
    /// # Errors
    /// - File cannot be read
    /// - See [`RemoverConfig::from_json_str`]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BgRemovalError::invalid_config(format!(
                "Failed to read config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Validate configuration parameters
    ///
    /// # Errors
    /// - Zero color-key tolerance
    /// - Relative `temp_dir`
    /// - `temp_dir` pointing at an existing regular file
    pub fn validate(&self) -> Result<()> {
        if self.color_key.tolerance == 0 {
            return Err(BgRemovalError::invalid_config(
                "Color key tolerance must be 1-255",
            ));
        }

        if let Some(dir) = &self.temp_dir {
            if !dir.is_absolute() {
                return Err(BgRemovalError::invalid_config(format!(
                    "Output directory '{}' must be an absolute path",
                    dir.display()
                )));
            }
            if dir.is_file() {
                return Err(BgRemovalError::invalid_config(format!(
                    "Output directory '{}' is a file",
                    dir.display()
                )));
            }
        }

        Ok(())
    }

    /// Directory outputs are written to
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Floors for the host, honoring the override
    #[must_use]
    pub fn floors_for(&self, platform: HostPlatform) -> CapabilityFloors {
        self.floors
            .unwrap_or_else(|| CapabilityFloors::for_platform(platform))
    }
}

/// Builder for `RemoverConfig`
pub struct RemoverConfigBuilder {
    config: RemoverConfig,
}

impl RemoverConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RemoverConfig::default(),
        }
    }

    #[must_use]
    pub fn temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn output_naming(mut self, naming: OutputNaming) -> Self {
        self.config.output_naming = naming;
        self
    }

    #[must_use]
    pub fn floors(mut self, floors: CapabilityFloors) -> Self {
        self.config.floors = Some(floors);
        self
    }

    #[must_use]
    pub fn color_key_tolerance(mut self, tolerance: u8) -> Self {
        self.config.color_key.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn min_component_area(mut self, area: u32) -> Self {
        self.config.color_key.min_component_area = area;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// See [`RemoverConfig::validate`]
    pub fn build(self) -> Result<RemoverConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for RemoverConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::OsVersion;

    #[test]
    fn test_default_config() {
        let config = RemoverConfig::default();
        assert_eq!(config.output_naming, OutputNaming::Unique);
        assert!(config.temp_dir.is_none());
        assert_eq!(config.output_dir(), std::env::temp_dir());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = RemoverConfig::builder()
            .temp_dir("/tmp/bgremove")
            .output_naming(OutputNaming::SourceName)
            .color_key_tolerance(25)
            .min_component_area(10)
            .debug(true)
            .build()
            .unwrap();

        assert_eq!(config.output_dir(), PathBuf::from("/tmp/bgremove"));
        assert_eq!(config.output_naming, OutputNaming::SourceName);
        assert_eq!(config.color_key.tolerance, 25);
        assert_eq!(config.color_key.min_component_area, 10);
        assert!(config.debug);
    }

    #[test]
    fn test_zero_tolerance_rejected() {
        let result = RemoverConfig::builder().color_key_tolerance(0).build();
        assert!(matches!(result, Err(BgRemovalError::InvalidConfig(_))));
    }

    #[test]
    fn test_temp_dir_must_not_be_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = RemoverConfig::builder().temp_dir(file.path()).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_relative_temp_dir_rejected() {
        let result = RemoverConfig::builder().temp_dir("rel_out").build();
        assert!(matches!(result, Err(BgRemovalError::InvalidConfig(_))));

        let err = RemoverConfig::from_json_str(r#"{"temp_dir": "out"}"#).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::RenderFailed);
    }

    #[test]
    fn test_from_json() {
        let config = RemoverConfig::from_json_str(
            r#"{
                "output_naming": "source_name",
                "floors": {
                    "general_object": {"major": 18, "minor": 0, "patch": 0},
                    "person_only": {"major": 16, "minor": 0, "patch": 0},
                    "reject_simulator": false
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.output_naming, OutputNaming::SourceName);
        let floors = config.floors_for(HostPlatform::Ios);
        assert_eq!(floors.general_object, OsVersion::new(18, 0, 0));
        assert!(!floors.reject_simulator);
        assert_eq!(config.color_key, ColorKeyOptions::default());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(RemoverConfig::from_json_str("{not json").is_err());
        assert!(RemoverConfig::from_json_str(r#"{"output_naming": "random"}"#).is_err());
    }

    #[test]
    fn test_floors_default_per_platform() {
        let config = RemoverConfig::default();
        assert_eq!(
            config.floors_for(HostPlatform::Ios),
            CapabilityFloors::for_platform(HostPlatform::Ios)
        );
    }
}
