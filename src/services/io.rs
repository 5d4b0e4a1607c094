//! Image I/O operations service
//!
//! This module separates file I/O operations from business logic,
//! making the pipeline testable without touching the filesystem.

use crate::{
    config::OutputNaming,
    error::{BgRemovalError, Result},
    utils::ImageSource,
};
use image::{metadata::Orientation, DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Decode the image a source refers to, honoring EXIF orientation
    ///
    /// The returned pixels are in display orientation, not sensor orientation.
    ///
    /// # Errors
    /// - `ImageLoad` for unreadable files, unknown formats, corrupt data and
    ///   sources this crate cannot read
    pub fn load_oriented(source: &ImageSource) -> Result<DynamicImage> {
        let path = source.path().ok_or_else(|| {
            BgRemovalError::image_load(format!("cannot read '{source}': unsupported URI scheme"))
        })?;
        Self::load_oriented_path(path)
    }

    /// Decode a local file, honoring EXIF orientation
    ///
    /// # Errors
    /// - `ImageLoad` for unreadable files, unknown formats and corrupt data
    pub fn load_oriented_path<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();
        let load_error = |stage: &str, e: &dyn std::fmt::Display| {
            BgRemovalError::image_load(format!("{} '{}': {}", stage, path_ref.display(), e))
        };

        // Content sniffing first; the extension is only a fallback
        let reader = ImageReader::open(path_ref)
            .map_err(|e| load_error("failed to open", &e))?
            .with_guessed_format()
            .map_err(|e| load_error("failed to read", &e))?;
        if reader.format().is_none() {
            return Err(load_error("unrecognized image format in", &"no known signature"));
        }

        let mut decoder = reader
            .into_decoder()
            .map_err(|e| load_error("failed to decode", &e))?;
        let orientation = decoder.orientation().unwrap_or_else(|e| {
            log::debug!(
                "No usable orientation metadata in {}: {}",
                path_ref.display(),
                e
            );
            Orientation::NoTransforms
        });

        let mut image =
            DynamicImage::from_decoder(decoder).map_err(|e| load_error("failed to decode", &e))?;
        if orientation != Orientation::NoTransforms {
            log::debug!("Applying {:?} to {}", orientation, path_ref.display());
            image.apply_orientation(orientation);
        }

        if image.width() == 0 || image.height() == 0 {
            return Err(load_error("empty image in", &"zero-sized frame"));
        }
        Ok(image)
    }

    /// Encode an RGBA image as PNG
    ///
    /// # Errors
    /// - `SaveFailed` when encoding fails
    pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| BgRemovalError::save(format!("PNG encoding failed: {e}")))?;
        Ok(buffer)
    }

    /// Output file name for a source base name
    ///
    /// The `.png` extension is appended, so `photo.jpg` becomes
    /// `photo.jpg.png` (or `photo.jpg-<uuid>.png` with unique naming).
    #[must_use]
    pub fn output_file_name(base_name: &str, naming: OutputNaming) -> String {
        match naming {
            OutputNaming::SourceName => format!("{base_name}.png"),
            OutputNaming::Unique => format!("{}-{}.png", base_name, Uuid::new_v4()),
        }
    }

    /// Write encoded bytes to `dir/file_name`, creating `dir` if needed
    ///
    /// Existing files with the same name are overwritten.
    ///
    /// # Errors
    /// - `SaveFailed` when the directory cannot be created or the write fails
    pub fn persist(bytes: &[u8], dir: &Path, file_name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .map_err(|e| BgRemovalError::file_io_error("create output directory", dir, &e))?;

        let path = dir.join(file_name);
        std::fs::write(&path, bytes)
            .map_err(|e| BgRemovalError::file_io_error("write output image", &path, &e))?;

        log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use image::{Rgb, RgbImage, Rgba};
    use tempfile::TempDir;

    #[test]
    fn test_load_by_content_not_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("actually_png.jpg");
        let image = RgbImage::from_pixel(6, 4, Rgb([1, 2, 3]));
        image.save_with_format(&path, ImageFormat::Png).unwrap();

        let loaded = ImageIOService::load_oriented_path(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (6, 4));
    }

    /// Baseline JPEG with an APP1 Exif segment carrying `orientation`
    fn jpeg_with_orientation(width: u32, height: u32, orientation: u8) -> Vec<u8> {
        let mut encoded = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])))
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)
            .unwrap();

        // Big-endian TIFF header, one IFD entry: 0x0112 SHORT x1
        let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
        app1.extend_from_slice(b"Exif\0\0");
        app1.extend_from_slice(&[0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]);
        app1.extend_from_slice(&[0x00, 0x01]);
        app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
        app1.extend_from_slice(&[0x00, orientation, 0x00, 0x00]);
        app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let mut bytes = encoded[..2].to_vec();
        bytes.extend_from_slice(&app1);
        bytes.extend_from_slice(&encoded[2..]);
        bytes
    }

    #[test]
    fn test_load_applies_exif_rotation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rotated.jpg");
        std::fs::write(&path, jpeg_with_orientation(16, 8, 6)).unwrap();

        let loaded = ImageIOService::load_oriented_path(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (8, 16));
    }

    #[test]
    fn test_load_upright_exif_keeps_extent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upright.jpg");
        std::fs::write(&path, jpeg_with_orientation(16, 8, 1)).unwrap();

        let loaded = ImageIOService::load_oriented_path(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (16, 8));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ImageIOService::load_oriented_path("/definitely/not/here.png").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ImageLoad);
    }

    #[test]
    fn test_load_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"this is not an image").unwrap();

        let err = ImageIOService::load_oriented_path(&path).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ImageLoad);
    }

    #[test]
    fn test_load_foreign_source() {
        let source = ImageSource::parse("content://media/images/1").unwrap();
        let err = ImageIOService::load_oriented(&source).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ImageLoad);
    }

    #[test]
    fn test_encode_png_keeps_alpha() {
        let mut image = RgbaImage::from_pixel(3, 3, Rgba([10, 20, 30, 255]));
        image.put_pixel(1, 1, Rgba([0, 0, 0, 0]));

        let bytes = ImageIOService::encode_png(&image).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_output_file_names() {
        assert_eq!(
            ImageIOService::output_file_name("photo.jpg", OutputNaming::SourceName),
            "photo.jpg.png"
        );

        let a = ImageIOService::output_file_name("photo.jpg", OutputNaming::Unique);
        let b = ImageIOService::output_file_name("photo.jpg", OutputNaming::Unique);
        assert!(a.starts_with("photo.jpg-"));
        assert!(a.ends_with(".png"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_persist_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");

        let path = ImageIOService::persist(b"png", &nested, "out.png").unwrap();
        assert_eq!(path, nested.join("out.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"png");
    }

    #[test]
    fn test_persist_into_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = ImageIOService::persist(b"png", file.path(), "out.png").unwrap_err();
        assert_eq!(err.code(), ErrorCode::SaveFailed);
    }
}
