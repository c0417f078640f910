//! Session-backed identity with one-time email login links.
//!
//! The signed-in email lives in the tower-sessions session. Login links carry
//! a random 32-byte token; only its SHA-256 hash is stored, and a link works
//! once within [`LOGIN_LINK_TTL_MINUTES`].

use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tower_sessions::Session;

use badge_core::Email;

use super::{EmailService, IdentityError, IdentityProvider};
use crate::db::LoginLinkRepository;
use crate::models::session_keys;
use crate::page::REGISTER_PATH;

/// Minutes a login link stays valid.
pub const LOGIN_LINK_TTL_MINUTES: i64 = 15;

/// Path that consumes a login link.
pub const VERIFY_PATH: &str = "/auth/verify";

/// How login links reach the user.
#[derive(Debug, Clone)]
pub enum LinkDelivery {
    /// Send by email.
    Smtp(EmailService),
    /// Write the link to the log (development without SMTP).
    Log,
}

/// Generate a login token: 32 random bytes, hex-encoded.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hex SHA-256 of a token, as stored.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Keep only same-site absolute paths as post-login targets.
fn safe_redirect(target: &str) -> &str {
    if target.starts_with('/') && !target.starts_with("//") {
        target
    } else {
        REGISTER_PATH
    }
}

/// Identity for one request.
#[derive(Clone)]
pub struct SessionIdentity<'a> {
    session: Session,
    pool: &'a PgPool,
    delivery: &'a LinkDelivery,
    base_url: &'a str,
}

impl std::fmt::Debug for SessionIdentity<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIdentity")
            .field("delivery", &self.delivery)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl<'a> SessionIdentity<'a> {
    #[must_use]
    pub const fn new(
        session: Session,
        pool: &'a PgPool,
        delivery: &'a LinkDelivery,
        base_url: &'a str,
    ) -> Self {
        Self {
            session,
            pool,
            delivery,
            base_url,
        }
    }

    /// Consume a login link and start a session for its email.
    ///
    /// Returns the path to continue to, or `None` if the token is unknown,
    /// used or expired.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Session` if the link store or session fails.
    pub async fn complete_sign_in(&self, token: &str) -> Result<Option<String>, IdentityError> {
        let link = LoginLinkRepository::new(self.pool)
            .consume(&hash_token(token))
            .await
            .map_err(|e| IdentityError::Session(e.to_string()))?;

        let Some(link) = link else {
            tracing::info!("login link rejected");
            return Ok(None);
        };

        // New session id on privilege change.
        self.session
            .cycle_id()
            .await
            .map_err(|e| IdentityError::Session(e.to_string()))?;
        self.session
            .insert(session_keys::SESSION_EMAIL, link.email.as_str())
            .await
            .map_err(|e| IdentityError::Session(e.to_string()))?;

        tracing::info!(email = %link.email, "signed in with login link");
        Ok(Some(safe_redirect(&link.redirect_to).to_string()))
    }
}

impl IdentityProvider for SessionIdentity<'_> {
    async fn current_email(&self) -> Result<Option<String>, IdentityError> {
        self.session
            .get::<String>(session_keys::SESSION_EMAIL)
            .await
            .map_err(|e| IdentityError::Session(e.to_string()))
    }

    async fn sign_in_with_link(&self, email: &Email, redirect_to: &str) -> Result<(), IdentityError> {
        let token = generate_token();
        let expires_at = chrono::Utc::now() + chrono::Duration::minutes(LOGIN_LINK_TTL_MINUTES);

        LoginLinkRepository::new(self.pool)
            .create(email, &hash_token(&token), safe_redirect(redirect_to), expires_at)
            .await
            .map_err(|e| IdentityError::LinkDelivery(e.to_string()))?;

        let link = format!(
            "{}{VERIFY_PATH}?token={token}",
            self.base_url.trim_end_matches('/')
        );

        match self.delivery {
            LinkDelivery::Smtp(mailer) => mailer
                .send_login_link(email, &link, LOGIN_LINK_TTL_MINUTES)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "login link email failed");
                    IdentityError::LinkDelivery("Could not send login link.".to_string())
                }),
            LinkDelivery::Log => {
                tracing::info!(email = %email, link = %link, "login link (SMTP not configured)");
                Ok(())
            }
        }
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.session
            .flush()
            .await
            .map_err(|e| IdentityError::Session(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_hash_is_stable_and_differs_from_token() {
        let token = "abc";
        assert_eq!(hash_token(token), hash_token(token));
        assert_eq!(
            hash_token(token),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_safe_redirect_rejects_offsite_targets() {
        assert_eq!(safe_redirect("/register"), "/register");
        assert_eq!(safe_redirect("https://evil.example"), REGISTER_PATH);
        assert_eq!(safe_redirect("//evil.example"), REGISTER_PATH);
    }
}
