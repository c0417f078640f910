//! Crop geometry chosen interactively by the user.

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`CropRect`] or [`Zoom`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CropRectError {
    /// Width or height is larger than the allowed output size.
    #[error("crop rectangle must be at most {max}x{max} pixels (got {width}x{height})")]
    TooLarge {
        /// Maximum allowed edge length.
        max: u32,
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The rectangle extends past `u32` coordinates.
    #[error("crop rectangle overflows pixel coordinates")]
    Overflow,
    /// Zoom is outside the supported range.
    #[error("zoom must be between {min} and {max} (got {value})")]
    ZoomOutOfRange {
        /// Minimum zoom.
        min: f32,
        /// Maximum zoom.
        max: f32,
        /// Requested zoom.
        value: f32,
    },
}

/// A crop rectangle in the source image's own pixel coordinate space.
///
/// A zero-area rectangle is representable; the crop engine reports it as an
/// encode failure, the same way an empty canvas produces no image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCropRect")]
pub struct CropRect {
    /// Left edge, in source pixels.
    pub x: u32,
    /// Top edge, in source pixels.
    pub y: u32,
    /// Width, in source pixels.
    pub width: u32,
    /// Height, in source pixels.
    pub height: u32,
}

impl CropRect {
    /// Largest edge length the crop engine will render.
    pub const MAX_EDGE: u32 = 4096;

    /// Build a rectangle, checking the size limit and coordinate overflow.
    ///
    /// # Errors
    ///
    /// Returns [`CropRectError::TooLarge`] or [`CropRectError::Overflow`].
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Result<Self, CropRectError> {
        if width > Self::MAX_EDGE || height > Self::MAX_EDGE {
            return Err(CropRectError::TooLarge {
                max: Self::MAX_EDGE,
                width,
                height,
            });
        }

        if x.checked_add(width).is_none() || y.checked_add(height).is_none() {
            return Err(CropRectError::Overflow);
        }

        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Build a square rectangle (aspect ratio 1).
    ///
    /// # Errors
    ///
    /// Same as [`CropRect::new`].
    pub fn square(x: u32, y: u32, size: u32) -> Result<Self, CropRectError> {
        Self::new(x, y, size, size)
    }

    /// Returns true if width equals height.
    #[must_use]
    pub const fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Returns true if the rectangle covers no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Unchecked wire form of a [`CropRect`].
#[derive(Deserialize)]
struct RawCropRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl TryFrom<RawCropRect> for CropRect {
    type Error = CropRectError;

    fn try_from(raw: RawCropRect) -> Result<Self, Self::Error> {
        Self::new(raw.x, raw.y, raw.width, raw.height)
    }
}

/// Zoom factor of the interactive cropper.
///
/// The cropper already folds zoom into the pixel rectangle it reports; the
/// factor is kept alongside so the crop can be reopened where the user left it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Zoom(f32);

impl Zoom {
    /// Smallest zoom (image fits the crop area).
    pub const MIN: f32 = 1.0;
    /// Largest zoom offered by the cropper.
    pub const MAX: f32 = 3.0;

    /// Validate a zoom factor.
    ///
    /// # Errors
    ///
    /// Returns [`CropRectError::ZoomOutOfRange`] if `value` is not finite or
    /// outside `MIN..=MAX`.
    pub fn new(value: f32) -> Result<Self, CropRectError> {
        if !value.is_finite() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(CropRectError::ZoomOutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                value,
            });
        }
        Ok(Self(value))
    }

    /// Returns the factor.
    #[must_use]
    pub const fn get(self) -> f32 {
        self.0
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<f32> for Zoom {
    type Error = CropRectError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Zoom> for f32 {
    fn from(zoom: Zoom) -> Self {
        zoom.0
    }
}
