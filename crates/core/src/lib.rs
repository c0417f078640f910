//! Badge Registry Core - Shared types library.
//!
//! This crate provides common types used across all badge registry components:
//! - `registry` - Registration pipeline library and HTTP server
//! - `cli` - Command-line tools for migrations and allow-list management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, storage keys and crop geometry

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
