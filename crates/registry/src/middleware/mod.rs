//! HTTP middleware and extractors.

pub mod auth;
pub mod session;

pub use auth::{ClientKind, GateRejection, PageEntry, admit};
pub use session::create_session_layer;
