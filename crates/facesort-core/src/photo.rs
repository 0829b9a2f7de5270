//! Photo decoding.

use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("decoding {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Decode a photo into RGB8, honoring its EXIF orientation.
pub fn load_photo(path: &Path) -> Result<RgbImage, PhotoError> {
    let io_err = |source| PhotoError::Io {
        path: path.display().to_string(),
        source,
    };
    let decode_err = |source| PhotoError::Decode {
        path: path.display().to_string(),
        source,
    };

    let mut decoder = ImageReader::open(path)
        .map_err(io_err)?
        .with_guessed_format()
        .map_err(io_err)?
        .into_decoder()
        .map_err(decode_err)?;
    let orientation = decoder.orientation().map_err(decode_err)?;

    let mut image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    image.apply_orientation(orientation);

    Ok(image.into_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        RgbImage::from_pixel(6, 4, Rgb([10, 20, 30])).save(&path).unwrap();

        let image = load_photo(&path).unwrap();
        assert_eq!(image.dimensions(), (6, 4));
        assert_eq!(image.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_load_ignores_extension() {
        // Format is sniffed from content, not the file name.
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("a.png");
        RgbImage::new(2, 2).save(&png).unwrap();
        let renamed = dir.path().join("photo.dat");
        std::fs::rename(&png, &renamed).unwrap();

        assert!(load_photo(&renamed).is_ok());
    }

    #[test]
    fn test_load_garbage_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(matches!(load_photo(&path), Err(PhotoError::Decode { .. })));
    }

    #[test]
    fn test_load_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.jpg");

        assert!(matches!(load_photo(&path), Err(PhotoError::Io { .. })));
    }
}
