//! Domain models for the registration pipeline.
//!
//! These are validated domain objects, separate from database row types.

pub mod registration;
pub mod session;

pub use registration::{
    AllowListEntry, ListItem, NewRegistration, Registration, RegistrationUpdate,
};
pub use session::keys as session_keys;
