//! Tokens and token carriers
//!
//! A [`Token`] is an opaque string handed to the client: either the session id or
//! the rotating auth token. How it travels (cookie, query string, header) is up
//! to a [`TokenCarrier`]; the session layer never looks at transport framing.

pub mod cookie;

pub use cookie::CookieCarrier;

use base64::{engine::general_purpose, Engine as _};
use chrono::Duration;
use std::fmt;

use crate::utils::crypto::KEY_SIZE;

/// Opaque session id or auth token
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn empty() -> Self {
        Self(String::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token could have been issued by this crate
    ///
    /// Issued tokens are base64url encodings of [`KEY_SIZE`] bytes. Anything
    /// longer, or with characters outside the URL-safe alphabet, cannot name an
    /// entry and is treated like an absent token.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= general_purpose::URL_SAFE.encode([0u8; KEY_SIZE]).len()
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'='))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Transport that carries a token between requests
pub trait TokenCarrier {
    /// Token presented by the client, empty if there is none
    fn get_token(&self) -> Token;

    /// Hand `token` to the client for `ttl`. An empty token removes it.
    fn set_token(&mut self, token: &Token, ttl: Duration);

    /// Remove the token from the client
    fn remove(&mut self) {
        self.set_token(&Token::empty(), Duration::zero());
    }
}
