//! Image measurement and reduction used for IIIF derivatives.

use bytes::Bytes;
use image::{ImageFormat, imageops::FilterType};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageTransformError {
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("could not encode reduced image: {0}")]
    Encode(String),
    #[error("downscale factor must be at least 1")]
    InvalidFactor,
}

pub trait ImageTransform {
    /// Natural `(width, height)` of the encoded image.
    fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), ImageTransformError>;

    /// Reduce both sides by an integer `factor`.
    fn downscale(&self, bytes: &[u8], factor: u32) -> Result<Bytes, ImageTransformError>;
}

/// [`ImageTransform`] backed by the `image` crate. Reduced images are
/// re-encoded in the format they were read from.
#[derive(Clone, Copy, Debug, Default)]
pub struct RasterTransform;

impl ImageTransform for RasterTransform {
    fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), ImageTransformError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|err| ImageTransformError::Decode(err.to_string()))?;
        reader
            .into_dimensions()
            .map_err(|err| ImageTransformError::Decode(err.to_string()))
    }

    fn downscale(&self, bytes: &[u8], factor: u32) -> Result<Bytes, ImageTransformError> {
        if factor == 0 {
            return Err(ImageTransformError::InvalidFactor);
        }
        let format: ImageFormat =
            image::guess_format(bytes).map_err(|err| ImageTransformError::Decode(err.to_string()))?;
        let img = image::load_from_memory_with_format(bytes, format)
            .map_err(|err| ImageTransformError::Decode(err.to_string()))?;

        let width = img.width().div_ceil(factor);
        let height = img.height().div_ceil(factor);
        let reduced = img.resize_exact(width, height, FilterType::Triangle);

        let mut out = Cursor::new(Vec::new());
        reduced
            .write_to(&mut out, format)
            .map_err(|err| ImageTransformError::Encode(err.to_string()))?;
        Ok(Bytes::from(out.into_inner()))
    }
}
