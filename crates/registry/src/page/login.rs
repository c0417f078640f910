//! Login entry point: request a one-time sign-in link.

use thiserror::Error;

use badge_core::{Email, EmailError};

use super::REGISTER_PATH;
use crate::services::{IdentityError, IdentityProvider};

/// Shown once the link has been handed to the identity service.
pub const LINK_SENT_TEXT: &str = "Login link sent. Check your email.";

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Enter your email address.")]
    MissingEmail,
    #[error("Enter a valid email address.")]
    InvalidEmail(#[from] EmailError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// The login form.
pub struct LoginPage<'a, I> {
    identity: &'a I,
    message: Option<String>,
}

impl<'a, I: IdentityProvider> LoginPage<'a, I> {
    #[must_use]
    pub const fn new(identity: &'a I) -> Self {
        Self {
            identity,
            message: None,
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Send a login link that lands on the registration page.
    ///
    /// # Errors
    ///
    /// Returns a [`LoginError`] for a blank or malformed address (no remote
    /// call is made) or an identity service failure.
    pub async fn send_link(&mut self, raw_email: &str) -> Result<(), LoginError> {
        let result = self.dispatch(raw_email).await;
        self.message = Some(match &result {
            Ok(()) => LINK_SENT_TEXT.to_string(),
            Err(err) => err.to_string(),
        });
        result
    }

    async fn dispatch(&self, raw_email: &str) -> Result<(), LoginError> {
        let trimmed = raw_email.trim();
        if trimmed.is_empty() {
            return Err(LoginError::MissingEmail);
        }
        let email = Email::parse_normalized(trimmed)?;

        self.identity.sign_in_with_link(&email, REGISTER_PATH).await?;
        tracing::info!(email = %email, "login link requested");
        Ok(())
    }
}
