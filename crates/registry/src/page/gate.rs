//! Authorization gate.
//!
//! Decides on page entry whether the user may use the page at all. The gate
//! is an explicit state machine; [`run`] steps it until a terminal state and
//! reports the [`GateOutcome`].
//!
//! ```text
//! Start -> ResolvingSession -> SessionFound -> CheckingAllowlist -> Allowed
//!                  |                                 |  |
//!                  v                                 |  +-> LookupError (halt)
//!           Unauthenticated <------------------------+
//!                  |                  NotAllowed (sign out)
//!                  v
//!           redirect to login
//! ```

use badge_core::Email;

use super::state::Redirect;
use crate::services::{AllowList, IdentityProvider};

/// Gate states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Start,
    ResolvingSession,
    SessionFound(Email),
    CheckingAllowlist(Email),
    Unauthenticated,
    /// Allow-list row absent or inactive; the two are indistinguishable.
    NotAllowed,
    LookupError(String),
    Allowed {
        email: Email,
        default_country: Option<String>,
    },
}

/// How a gate run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The user may use the page.
    Ready {
        email: Email,
        default_country: Option<String>,
    },
    /// The user is sent elsewhere.
    Redirect(Redirect),
    /// The allow-list could not be read; the page stops with this message.
    Halted(String),
}

impl GateOutcome {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Step the gate from [`GateState::Start`] to an outcome.
pub async fn run<B>(backend: &B) -> GateOutcome
where
    B: IdentityProvider + AllowList,
{
    let mut state = GateState::Start;

    loop {
        tracing::trace!(?state, "gate step");
        state = match state {
            GateState::Start => GateState::ResolvingSession,
            GateState::ResolvingSession => resolve_session(backend).await,
            GateState::SessionFound(email) => GateState::CheckingAllowlist(email),
            GateState::CheckingAllowlist(email) => check_allowlist(backend, email).await,
            GateState::Unauthenticated => {
                return GateOutcome::Redirect(Redirect::Login);
            }
            GateState::NotAllowed => {
                if let Err(err) = backend.sign_out().await {
                    tracing::warn!(error = %err, "sign out of disallowed session failed");
                }
                return GateOutcome::Redirect(Redirect::Login);
            }
            GateState::LookupError(message) => {
                return GateOutcome::Halted(message);
            }
            GateState::Allowed {
                email,
                default_country,
            } => {
                return GateOutcome::Ready {
                    email,
                    default_country,
                };
            }
        };
    }
}

async fn resolve_session<B: IdentityProvider>(backend: &B) -> GateState {
    match backend.current_email().await {
        Ok(Some(raw)) => match Email::parse_normalized(&raw) {
            Ok(email) => GateState::SessionFound(email),
            Err(err) => {
                tracing::warn!(error = %err, "session holds an invalid email");
                GateState::Unauthenticated
            }
        },
        Ok(None) => GateState::Unauthenticated,
        Err(err) => {
            tracing::warn!(error = %err, "could not resolve session");
            GateState::Unauthenticated
        }
    }
}

async fn check_allowlist<B: AllowList>(backend: &B, email: Email) -> GateState {
    match backend.find_by_email(&email).await {
        Ok(Some(entry)) if entry.active => GateState::Allowed {
            email,
            default_country: entry.default_country,
        },
        Ok(_) => {
            tracing::info!(email = %email, "session not on the allow-list");
            GateState::NotAllowed
        }
        Err(err) => {
            tracing::error!(error = %err, "allow-list lookup failed");
            GateState::LookupError(err.message)
        }
    }
}
