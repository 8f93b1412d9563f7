use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{HttpRequest, HttpResponseBuilder};
use chrono::Duration;

use super::{Token, TokenCarrier};

/// Suffix of the cookie carrying the session id
pub const SESSION_COOKIE_SUFFIX: &str = "_session";
/// Suffix of the cookie carrying the auth token
pub const AUTH_COOKIE_SUFFIX: &str = "_auth";

/// Options for cookie creation
#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
        }
    }
}

/// Cookie-backed [`TokenCarrier`]
///
/// Reads the token from the request's cookie of the given name and queues
/// `Set-Cookie` values, which [`CookieCarrier::apply`] attaches to the response.
/// Only the most recent `set_token` per carrier is sent.
#[derive(Debug, Clone)]
pub struct CookieCarrier {
    name: String,
    incoming: Option<String>,
    outgoing: Option<Cookie<'static>>,
    options: CookieOptions,
}

impl CookieCarrier {
    #[must_use]
    pub fn from_request(name: impl Into<String>, req: &HttpRequest, options: CookieOptions) -> Self {
        let name = name.into();
        let incoming = req.cookie(&name).map(|c| c.value().to_string());
        Self {
            name,
            incoming,
            outgoing: None,
            options,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie queued by the last `set_token`/`remove`, if any
    #[must_use]
    pub fn pending_cookie(&self) -> Option<&Cookie<'static>> {
        self.outgoing.as_ref()
    }

    /// Attach the queued cookie to a response
    pub fn apply(&mut self, response: &mut HttpResponseBuilder) {
        if let Some(cookie) = self.outgoing.take() {
            response.cookie(cookie);
        }
    }

    fn build_cookie(&self, value: String, max_age: CookieDuration) -> Cookie<'static> {
        Cookie::build(self.name.clone(), value)
            .http_only(self.options.http_only)
            .secure(self.options.secure)
            .same_site(self.options.same_site)
            .path(self.options.path.clone())
            .max_age(max_age)
            .finish()
    }
}

impl TokenCarrier for CookieCarrier {
    fn get_token(&self) -> Token {
        self.incoming.clone().map(Token::new).unwrap_or_default()
    }

    fn set_token(&mut self, token: &Token, ttl: Duration) {
        let cookie = if token.is_empty() || ttl <= Duration::zero() {
            self.build_cookie(String::new(), CookieDuration::ZERO)
        } else {
            self.build_cookie(token.as_str().to_string(), max_age_for(ttl))
        };
        self.outgoing = Some(cookie);
    }
}

/// Cookie max-age for a positive ttl, rounded up to whole seconds
fn max_age_for(ttl: Duration) -> CookieDuration {
    let secs = ttl.num_seconds();
    if Duration::try_seconds(secs).is_some_and(|whole| ttl > whole) {
        CookieDuration::seconds(secs.saturating_add(1))
    } else {
        CookieDuration::seconds(secs)
    }
}
