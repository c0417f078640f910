//! Session-related types.

/// Session keys for authentication data.
pub mod keys {
    /// Key for the signed-in, normalized email address.
    pub const SESSION_EMAIL: &str = "session_email";
}
