//! Badge Registry - registration pipeline for allow-listed users.
//!
//! Allow-listed users sign in through a one-time emailed link, then submit a
//! name, a country and a square-cropped photo, and manage their own
//! submissions.
//!
//! # Architecture
//!
//! - [`page`] - the registration page: authorization gate, submission, list
//!   sync and edit/delete flows, generic over [`services::Backend`]
//! - [`crop`] - in-memory crop and JPEG encode of the selected photo
//! - [`services`] - contracts for identity, allow-list, storage and
//!   persistence, plus the session identity and email adapters
//! - [`db`], [`storage`] - `PostgreSQL` and filesystem adapters
//! - [`routes`], [`middleware`] - the axum HTTP surface
//!
//! The page core never touches HTTP; the server binary builds one page per
//! request over a [`backend::RequestBackend`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod crop;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod page;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

pub use config::RegistryConfig;
pub use page::RegistrationPage;
pub use state::AppState;
