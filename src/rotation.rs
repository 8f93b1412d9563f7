//! Rotating authentication tokens
//!
//! An auth session keeps its id for its whole life, while the auth token the
//! client presents alongside the id changes on a timer. Each session holds a random
//! `secret` and a generation `counter`; the token for a generation is
//!
//! ```text
//! auth_token(counter) = base64url(SHA-256(secret || decimal(counter)))
//! ```
//!
//! Validation accepts the current token, and for a short grace window after a
//! rotation also the immediately previous one. That covers a client whose request
//! crossed a rotation it had not observed yet. A captured token is therefore useful
//! for at most `auth_timeout + grace_period`.

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::utils::crypto::{generate_session_key, sha256_base64url, tokens_match};

/// Persisted rotation state of an auth session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    pub secret: String,
    pub counter: u64,
    /// Time of the last rotation. `None` until the first save.
    pub rotation_start: Option<DateTime<Utc>>,
}

/// How a presented token was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Matched the current generation
    Current,
    /// Matched the current generation and the rotation timeout has passed;
    /// the next save rotates
    RotationDue,
    /// Matched the previous generation inside the grace window
    Grace,
}

impl RotationState {
    /// Fresh state with a new random secret at generation zero
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Randomness`] if the secret cannot be generated.
    pub fn generate() -> Result<Self, SessionError> {
        Ok(Self {
            secret: generate_session_key()?,
            counter: 0,
            rotation_start: None,
        })
    }

    /// Token for the current generation
    #[must_use]
    pub fn auth_token(&self) -> String {
        derive_token(&self.secret, self.counter)
    }

    /// Token for the previous generation, if there is one
    #[must_use]
    pub fn previous_auth_token(&self) -> Option<String> {
        self.counter
            .checked_sub(1)
            .map(|counter| derive_token(&self.secret, counter))
    }

    /// Token for the generation after the current one
    ///
    /// This is what the client holds once a pending rotation has been saved.
    #[must_use]
    pub fn next_auth_token(&self) -> String {
        derive_token(&self.secret, self.counter.saturating_add(1))
    }

    /// Check a presented token against this state
    ///
    /// The state itself is not modified; the caller records a pending rotation
    /// when [`Validation::RotationDue`] comes back and applies it with
    /// [`RotationState::rotate_on_save`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AuthenticationFailed`] if the token is neither the
    /// current one nor the previous one presented within the grace window.
    pub fn validate(
        &self,
        presented: &str,
        auth_timeout: Duration,
        grace_period: Duration,
        now: DateTime<Utc>,
    ) -> Result<Validation, SessionError> {
        // A never-saved state has no rotation clock yet: rotation is not due.
        let start = self.rotation_start.unwrap_or(now);

        if tokens_match(presented, &self.auth_token()) {
            if past_deadline(start, auth_timeout, now) {
                debug!(
                    "Auth token generation {} older than {}s, rotation pending",
                    self.counter,
                    auth_timeout.num_seconds()
                );
                return Ok(Validation::RotationDue);
            }
            return Ok(Validation::Current);
        }

        if let Some(previous) = self.previous_auth_token() {
            if tokens_match(presented, &previous) && within_window(start, grace_period, now) {
                debug!(
                    "Accepted previous auth token generation {} within grace window",
                    self.counter - 1
                );
                return Ok(Validation::Grace);
            }
        }

        warn!("Rejected auth token for generation {}", self.counter);
        Err(SessionError::AuthenticationFailed(
            "invalid authentication token".to_string(),
        ))
    }

    /// Apply save-time rotation
    ///
    /// On the first save ever, or when a rotation is pending, the rotation clock
    /// restarts at `now`; a pending rotation also advances the generation. Returns
    /// `true` if the externally visible token changed.
    pub fn rotate_on_save(&mut self, pending: bool, now: DateTime<Utc>) -> bool {
        if pending {
            self.counter = self.counter.saturating_add(1);
            self.rotation_start = Some(now);
            return true;
        }
        if self.rotation_start.is_none() {
            self.rotation_start = Some(now);
        }
        false
    }
}

/// `true` while `now` is strictly before `start + span`; an unrepresentable deadline is never reached
fn within_window(start: DateTime<Utc>, span: Duration, now: DateTime<Utc>) -> bool {
    !start
        .checked_add_signed(span)
        .is_some_and(|deadline| now >= deadline)
}

/// `true` once `now` is later than `start + span`; an unrepresentable deadline is never reached
fn past_deadline(start: DateTime<Utc>, span: Duration, now: DateTime<Utc>) -> bool {
    start.checked_add_signed(span).is_some_and(|deadline| now > deadline)
}

fn derive_token(secret: &str, counter: u64) -> String {
    sha256_base64url(format!("{secret}{counter}").as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(counter: u64, started_ago: Duration) -> RotationState {
        RotationState {
            secret: "test-secret".to_string(),
            counter,
            rotation_start: Some(Utc::now() - started_ago),
        }
    }

    fn t() -> Duration {
        Duration::minutes(10)
    }

    fn g() -> Duration {
        Duration::minutes(1)
    }

    #[test]
    fn test_token_is_hash_of_secret_and_counter() {
        let s = state(3, Duration::zero());
        assert_eq!(s.auth_token(), sha256_base64url(b"test-secret3"));
        assert_eq!(s.previous_auth_token(), Some(sha256_base64url(b"test-secret2")));
    }

    #[test]
    fn test_previous_token_clamped_at_zero() {
        let s = state(0, Duration::zero());
        assert_eq!(s.previous_auth_token(), None);
    }

    #[test]
    fn test_current_token_before_timeout() {
        let s = state(2, Duration::minutes(5));
        let result = s.validate(&s.auth_token(), t(), g(), Utc::now()).unwrap();
        assert_eq!(result, Validation::Current);
    }

    #[test]
    fn test_current_token_after_timeout_is_rotation_due() {
        let s = state(2, Duration::minutes(11));
        let result = s.validate(&s.auth_token(), t(), g(), Utc::now()).unwrap();
        assert_eq!(result, Validation::RotationDue);
    }

    #[test]
    fn test_previous_token_within_grace() {
        let s = state(2, Duration::seconds(30));
        let previous = s.previous_auth_token().unwrap();
        assert_eq!(
            s.validate(&previous, t(), g(), Utc::now()).unwrap(),
            Validation::Grace
        );
    }

    #[test]
    fn test_previous_token_after_grace_rejected() {
        let s = state(2, Duration::seconds(90));
        let previous = s.previous_auth_token().unwrap();
        let err = s.validate(&previous, t(), g(), Utc::now()).unwrap_err();
        assert!(err.is_authentication_failure());
    }

    #[test]
    fn test_grace_window_excludes_its_end() {
        let start = Utc::now();
        let s = RotationState {
            secret: "test-secret".to_string(),
            counter: 2,
            rotation_start: Some(start),
        };
        let previous = s.previous_auth_token().unwrap();

        let just_inside = start + g() - Duration::milliseconds(1);
        assert_eq!(
            s.validate(&previous, t(), g(), just_inside).unwrap(),
            Validation::Grace
        );
        assert!(s.validate(&previous, t(), g(), start + g()).is_err());
    }

    #[test]
    fn test_next_token_matches_token_after_rotation() {
        let mut s = state(4, Duration::minutes(11));
        let next = s.next_auth_token();
        assert_ne!(next, s.auth_token());
        s.rotate_on_save(true, Utc::now());
        assert_eq!(s.auth_token(), next);
    }

    #[test]
    fn test_two_generations_stale_rejected() {
        let s = state(2, Duration::zero());
        let stale = derive_token(&s.secret, 0);
        assert!(s.validate(&stale, t(), g(), Utc::now()).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let s = state(1, Duration::zero());
        assert!(s.validate("not-a-token", t(), g(), Utc::now()).is_err());
        assert!(s.validate("", t(), g(), Utc::now()).is_err());
    }

    #[test]
    fn test_unsaved_state_not_due() {
        let s = RotationState {
            secret: "x".into(),
            counter: 0,
            rotation_start: None,
        };
        assert_eq!(
            s.validate(&s.auth_token(), Duration::zero(), g(), Utc::now())
                .unwrap(),
            Validation::Current
        );
    }

    #[test]
    fn test_rotate_on_save() {
        let now = Utc::now();
        let mut s = RotationState {
            secret: "x".into(),
            counter: 0,
            rotation_start: None,
        };

        // First save stamps the clock without rotating
        assert!(!s.rotate_on_save(false, now));
        assert_eq!(s.counter, 0);
        assert_eq!(s.rotation_start, Some(now));

        // Later saves without a pending rotation keep the clock
        let later = now + Duration::minutes(3);
        assert!(!s.rotate_on_save(false, later));
        assert_eq!(s.rotation_start, Some(now));

        // Pending rotation advances the generation
        assert!(s.rotate_on_save(true, later));
        assert_eq!(s.counter, 1);
        assert_eq!(s.rotation_start, Some(later));
    }

    #[test]
    fn test_generate_uses_fresh_secret() {
        let a = RotationState::generate().unwrap();
        let b = RotationState::generate().unwrap();
        assert_ne!(a.secret, b.secret);
        assert_eq!(a.counter, 0);
        assert!(a.rotation_start.is_none());
    }
}
