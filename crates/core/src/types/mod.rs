//! Core types for the badge registry.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod crop;
pub mod email;
pub mod id;
pub mod photo_path;

pub use crop::{CropRect, CropRectError, Zoom};
pub use email::{Email, EmailError};
pub use id::*;
pub use photo_path::{PhotoPath, PhotoPathError};
