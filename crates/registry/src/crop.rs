//! Image crop engine.
//!
//! Turns a user-selected image and a crop rectangle into a fixed-size JPEG
//! plus a renderable preview, entirely in memory.
//!
//! Rendering follows canvas semantics: the output is always exactly
//! `rect.width × rect.height`, pixels of the rectangle that fall outside the
//! source stay black, and a rectangle with no pixels produces no image data.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::DynamicImage;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops;
use thiserror::Error;

use badge_core::{CropRect, Zoom};

/// JPEG quality of every cropped photo (0-100).
pub const CROP_JPEG_QUALITY: u8 = 90;

/// Content type of every cropped photo.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Errors from the crop pipeline. Both are local and never reach a remote
/// service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CropError {
    /// The source image could not be read or decoded.
    #[error("could not load image: {0}")]
    ImageLoad(String),
    /// Encoding produced no data.
    #[error("could not encode image: {0}")]
    Encode(String),
}

/// The image the user picked, held by value.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage {
    bytes: Vec<u8>,
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl SourceImage {
    /// Wrap raw file bytes (any format the decoder recognizes).
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Read a base64 `data:` URL, as produced by a browser file reader.
    ///
    /// # Errors
    ///
    /// Returns [`CropError::ImageLoad`] if the URL is not a base64 data URL.
    pub fn from_data_url(url: &str) -> Result<Self, CropError> {
        let (header, payload) = url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
            .ok_or_else(|| CropError::ImageLoad("not a data URL".to_string()))?;

        if !header.ends_with(";base64") {
            return Err(CropError::ImageLoad(
                "data URL is not base64 encoded".to_string(),
            ));
        }

        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| CropError::ImageLoad(e.to_string()))?;

        Ok(Self { bytes })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode the image.
    ///
    /// # Errors
    ///
    /// Returns [`CropError::ImageLoad`] if the bytes are not a supported image.
    pub fn decode(&self) -> Result<DynamicImage, CropError> {
        image::load_from_memory(&self.bytes).map_err(|e| CropError::ImageLoad(e.to_string()))
    }
}

/// Crop rectangle and zoom as reported by the interactive cropper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropGeometry {
    pub rect: CropRect,
    pub zoom: Zoom,
}

impl CropGeometry {
    #[must_use]
    pub const fn new(rect: CropRect, zoom: Zoom) -> Self {
        Self { rect, zoom }
    }
}

/// A cropped, encoded photo and its preview.
///
/// Both are derived from the same bytes in one call and cannot be set
/// separately.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedPhoto {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    preview: String,
}

impl std::fmt::Debug for EncodedPhoto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedPhoto")
            .field("len", &self.bytes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl EncodedPhoto {
    /// JPEG bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// `data:image/jpeg;base64,…` URL of [`Self::bytes`].
    #[must_use]
    pub fn preview(&self) -> &str {
        &self.preview
    }
}

/// The photo part of a draft: the geometry and what was rendered from it.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoArtifact {
    geometry: CropGeometry,
    photo: EncodedPhoto,
}

impl PhotoArtifact {
    /// Crop `source` with `geometry` and keep both together.
    ///
    /// # Errors
    ///
    /// Propagates [`crop`] errors.
    pub fn render(source: &SourceImage, geometry: CropGeometry) -> Result<Self, CropError> {
        let photo = crop(source, geometry.rect)?;
        Ok(Self { geometry, photo })
    }

    #[must_use]
    pub const fn geometry(&self) -> CropGeometry {
        self.geometry
    }

    #[must_use]
    pub const fn photo(&self) -> &EncodedPhoto {
        &self.photo
    }
}

/// Crop `rect` out of `source` and encode it as JPEG.
///
/// # Errors
///
/// - [`CropError::ImageLoad`] if the source cannot be decoded.
/// - [`CropError::Encode`] if the rectangle is empty or encoding fails.
pub fn crop(source: &SourceImage, rect: CropRect) -> Result<EncodedPhoto, CropError> {
    let image = source.decode()?;
    render(&image, rect)
}

/// Crop an already-decoded image.
///
/// # Errors
///
/// Returns [`CropError::Encode`] if the rectangle is empty or encoding fails.
pub fn render(image: &DynamicImage, rect: CropRect) -> Result<EncodedPhoto, CropError> {
    if rect.is_empty() {
        return Err(CropError::Encode("crop area is empty".to_string()));
    }

    // crop_imm clamps to the source bounds; the canvas keeps the requested size.
    let visible = image
        .crop_imm(rect.x, rect.y, rect.width, rect.height)
        .to_rgb8();
    let mut canvas = RgbImage::new(rect.width, rect.height);
    imageops::replace(&mut canvas, &visible, 0, 0);

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, CROP_JPEG_QUALITY)
        .encode_image(&canvas)
        .map_err(|e| CropError::Encode(e.to_string()))?;

    if bytes.is_empty() {
        return Err(CropError::Encode("encoder produced no data".to_string()));
    }

    let preview = format!("data:{JPEG_CONTENT_TYPE};base64,{}", BASE64.encode(&bytes));

    Ok(EncodedPhoto {
        bytes,
        width: rect.width,
        height: rect.height,
        preview,
    })
}
