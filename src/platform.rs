//! Host capability description and segmentation tier selection

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dotted OS version, e.g. `17.2.1` on iOS or `34` (API level) on Android
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl OsVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for OsVersion {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(BgRemovalError::invalid_config("empty OS version"));
        }

        let mut parts = [0u32; 3];
        for (index, component) in trimmed.split('.').enumerate() {
            let slot = parts.get_mut(index).ok_or_else(|| {
                BgRemovalError::invalid_config(format!("too many components in OS version '{s}'"))
            })?;
            *slot = component.parse().map_err(|_| {
                BgRemovalError::invalid_config(format!("invalid OS version '{s}'"))
            })?;
        }

        let [major, minor, patch] = parts;
        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPlatform {
    Ios,
    Android,
    Other,
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ios => write!(f, "ios"),
            Self::Android => write!(f, "android"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// What the host reports about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub platform: HostPlatform,
    pub os_version: OsVersion,
    /// Running in a simulator or emulator
    pub simulated: bool,
}

impl PlatformInfo {
    #[must_use]
    pub fn new(platform: HostPlatform, os_version: OsVersion, simulated: bool) -> Self {
        Self {
            platform,
            os_version,
            simulated,
        }
    }

    /// Description of a desktop or server process
    #[must_use]
    pub fn detect() -> Self {
        Self::new(HostPlatform::Other, OsVersion::default(), false)
    }

    #[must_use]
    pub fn ios(os_version: OsVersion, simulated: bool) -> Self {
        Self::new(HostPlatform::Ios, os_version, simulated)
    }

    #[must_use]
    pub fn android(api_level: u32, simulated: bool) -> Self {
        Self::new(HostPlatform::Android, OsVersion::new(api_level, 0, 0), simulated)
    }
}

/// Segmentation capability, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationTier {
    /// Multi-instance foreground segmentation (people, animals, objects)
    GeneralObject,
    /// Single-mask person segmentation
    PersonOnly,
}

impl fmt::Display for SegmentationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeneralObject => write!(f, "general_object"),
            Self::PersonOnly => write!(f, "person_only"),
        }
    }
}

/// Minimum OS versions for each tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFloors {
    pub general_object: OsVersion,
    pub person_only: OsVersion,
    /// Fail fast when running under a simulator
    pub reject_simulator: bool,
}

impl CapabilityFloors {
    #[must_use]
    pub fn for_platform(platform: HostPlatform) -> Self {
        match platform {
            HostPlatform::Ios => Self {
                general_object: OsVersion::new(17, 0, 0),
                person_only: OsVersion::new(15, 0, 0),
                reject_simulator: true,
            },
            HostPlatform::Android => Self {
                general_object: OsVersion::new(24, 0, 0),
                person_only: OsVersion::new(21, 0, 0),
                reject_simulator: false,
            },
            HostPlatform::Other => Self {
                general_object: OsVersion::default(),
                person_only: OsVersion::default(),
                reject_simulator: false,
            },
        }
    }
}

/// Pick the highest tier the host supports
///
/// # Errors
/// - `UnsupportedEnvironment` when simulated and the floors reject simulators
/// - `UnsupportedOsVersion` when below the person-only floor
pub fn resolve_tier(info: &PlatformInfo, floors: &CapabilityFloors) -> Result<SegmentationTier> {
    if info.simulated && floors.reject_simulator {
        return Err(BgRemovalError::unsupported_environment(format!(
            "background removal is not available in the {} simulator",
            info.platform
        )));
    }

    if info.os_version >= floors.general_object {
        Ok(SegmentationTier::GeneralObject)
    } else if info.os_version >= floors.person_only {
        Ok(SegmentationTier::PersonOnly)
    } else {
        Err(BgRemovalError::unsupported_os(format!(
            "{} {} is below the minimum supported version {}",
            info.platform, info.os_version, floors.person_only
        )))
    }
}
