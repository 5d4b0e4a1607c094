//! Image URI validation
//!
//! Hosts pass either a `file://` URL, a bare filesystem path, or a
//! platform URI such as `content://` (Android) or `ph://` (iOS photo
//! library). Only the first two can be read by this crate; the others parse
//! but fail to load.

use crate::error::{BgRemovalError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use url::{ParseError, Url};

/// Fallback base name when the URI has no usable last segment
const DEFAULT_BASE_NAME: &str = "image";

/// A parsed image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Local file
    File(PathBuf),
    /// URI with a scheme this crate cannot read
    Foreign(Url),
}

impl ImageSource {
    /// Parse a host-supplied image URI
    ///
    /// # Errors
    /// - `InvalidUri` for empty strings, NUL bytes, malformed URLs and
    ///   `file:` URLs that do not map to a local path
    pub fn parse(uri: &str) -> Result<Self> {
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return Err(BgRemovalError::invalid_uri(uri, "empty URI"));
        }
        if trimmed.contains('\0') {
            return Err(BgRemovalError::invalid_uri(uri, "URI contains a NUL byte"));
        }

        match Url::parse(trimmed) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Self::File)
                .map_err(|()| BgRemovalError::invalid_uri(uri, "file URL is not a local path")),
            // Windows drive letters parse as one-letter schemes
            Ok(url) if url.scheme().len() == 1 => Ok(Self::File(PathBuf::from(trimmed))),
            Ok(url) => Ok(Self::Foreign(url)),
            Err(ParseError::RelativeUrlWithoutBase) => Ok(Self::File(PathBuf::from(trimmed))),
            Err(e) => Err(BgRemovalError::invalid_uri(uri, e.to_string())),
        }
    }

    /// Local path, if the source is a file
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Foreign(_) => None,
        }
    }

    /// Last path component including any extension, e.g. `photo.jpg`
    #[must_use]
    pub fn base_name(&self) -> String {
        let name = match self {
            Self::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            Self::Foreign(url) => url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(ToString::to_string),
        };
        name.filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_NAME.to_string())
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Foreign(url) => write!(f, "{url}"),
        }
    }
}

/// `file://` URL for a written output
///
/// # Errors
/// - `SaveFailed` when the path is not absolute
pub fn file_uri(path: &Path) -> Result<String> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| {
            BgRemovalError::save(format!(
                "cannot build a file URL for '{}'",
                path.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_file_url() {
        let source = ImageSource::parse("file:///tmp/photos/cat%20one.jpg").unwrap();
        assert_eq!(
            source,
            ImageSource::File(PathBuf::from("/tmp/photos/cat one.jpg"))
        );
        assert_eq!(source.base_name(), "cat one.jpg");
    }

    #[test]
    fn test_bare_path() {
        let source = ImageSource::parse("/var/mobile/image.heic").unwrap();
        assert_eq!(source.path(), Some(Path::new("/var/mobile/image.heic")));
        assert_eq!(source.base_name(), "image.heic");
    }

    #[test]
    fn test_foreign_scheme_parses() {
        let source = ImageSource::parse("content://media/external/images/42").unwrap();
        assert!(matches!(source, ImageSource::Foreign(_)));
        assert!(source.path().is_none());
        assert_eq!(source.base_name(), "42");
    }

    #[test]
    fn test_unparseable_uris() {
        for uri in ["", "   ", "http://[::1", "file://[bad/x.png", "a\0b"] {
            let err = ImageSource::parse(uri).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidUri, "{uri:?}");
        }
    }

    #[test]
    fn test_base_name_fallback() {
        let source = ImageSource::parse("file:///").unwrap();
        assert_eq!(source.base_name(), "image");
    }

    #[test]
    fn test_file_uri() {
        let uri = file_uri(Path::new("/tmp/out/photo.jpg.png")).unwrap();
        assert_eq!(uri, "file:///tmp/out/photo.jpg.png");
        assert!(file_uri(Path::new("relative.png")).is_err());
    }
}
