//! Cookie-bound sessions
//!
//! [`CookieSession`] binds a plain [`Session`] to the `<name>_session` cookie,
//! which carries the id token. [`AuthCookieSession`] binds an auth session to two
//! cookies: `<name>_session` for the id token and `<name>_auth` for the rotating
//! auth token.

use actix_web::{HttpRequest, HttpResponseBuilder};
use chrono::Duration;
use log::debug;

use crate::error::SessionError;
use crate::session::{Session, SessionManager};
use crate::token::cookie::{CookieOptions, AUTH_COOKIE_SUFFIX, SESSION_COOKIE_SUFFIX};
use crate::token::{CookieCarrier, Token, TokenCarrier};

#[derive(Debug)]
pub struct CookieSession {
    session: Session,
    id_token: Token,
    id_cookie: CookieCarrier,
}

impl CookieSession {
    /// Open the plain session named by the request's session cookie
    ///
    /// # Errors
    ///
    /// Propagates store and randomness failures.
    pub fn open(
        name: &str,
        manager: &SessionManager,
        req: &HttpRequest,
        options: &CookieOptions,
    ) -> Result<Self, SessionError> {
        let id_cookie =
            CookieCarrier::from_request(format!("{name}{SESSION_COOKIE_SUFFIX}"), req, options.clone());
        let (session, id_token) = manager.open_session(&id_cookie.get_token())?;
        Ok(Self {
            session,
            id_token,
            id_cookie,
        })
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Save the session and re-issue the id cookie with `timeout` as its lifetime
    ///
    /// # Errors
    ///
    /// Propagates [`Session::save`] failures; the cookie is not touched then.
    pub fn save(&mut self, timeout: Duration) -> Result<(), SessionError> {
        self.session.save(timeout)?;
        self.id_cookie.set_token(&self.id_token, timeout);
        Ok(())
    }

    /// Terminate the stored session and continue under a new, empty one
    ///
    /// # Errors
    ///
    /// Propagates store and randomness failures.
    pub fn renew(&mut self) -> Result<(), SessionError> {
        self.session.save(Duration::zero())?;
        self.session.clear();
        self.id_token = self.session.recreate()?;
        Ok(())
    }

    pub fn remove_cookie(&mut self) {
        self.id_cookie.remove();
    }

    /// Attach the queued cookie to a response
    pub fn apply(&mut self, response: &mut HttpResponseBuilder) {
        self.id_cookie.apply(response);
    }
}

#[derive(Debug)]
pub struct AuthCookieSession {
    session: Session,
    id_token: Token,
    id_cookie: CookieCarrier,
    auth_cookie: CookieCarrier,
    id_changed: bool,
}

impl AuthCookieSession {
    /// Open the auth session named by the request's cookies
    ///
    /// The manager's configured auth timeout drives rotation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AuthenticationFailed`] if the auth cookie does not
    /// validate, and propagates store and randomness failures.
    pub fn open(
        name: &str,
        manager: &SessionManager,
        req: &HttpRequest,
        options: &CookieOptions,
    ) -> Result<Self, SessionError> {
        let id_cookie =
            CookieCarrier::from_request(format!("{name}{SESSION_COOKIE_SUFFIX}"), req, options.clone());
        let auth_cookie =
            CookieCarrier::from_request(format!("{name}{AUTH_COOKIE_SUFFIX}"), req, options.clone());

        let presented_id = id_cookie.get_token();
        let (session, id_token, _) = manager.open_session_with_auth(
            &presented_id,
            &auth_cookie.get_token(),
            manager.config().auth_timeout,
        )?;

        Ok(Self {
            id_changed: id_token != presented_id,
            session,
            id_token,
            id_cookie,
            auth_cookie,
        })
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Save the session and re-issue both cookies with `timeout` as their lifetime
    ///
    /// A request accepted with the previous auth token leaves the cookies alone
    /// unless the id changed: the client already holds the newer pair from the
    /// response that rotated it.
    ///
    /// # Errors
    ///
    /// Propagates [`Session::save`] failures; cookies are not touched then.
    pub fn save(&mut self, timeout: Duration) -> Result<(), SessionError> {
        self.session.save(timeout)?;

        if self.session.in_grace_period() && !self.id_changed {
            debug!("Request inside grace window, leaving cookies unchanged");
            return Ok(());
        }

        self.id_cookie.set_token(&self.id_token, timeout);
        let auth_token = self.session.auth_token().unwrap_or_default();
        self.auth_cookie.set_token(&auth_token, timeout);
        Ok(())
    }

    /// Terminate the stored session and continue under a new, empty one
    ///
    /// The old entry is written expired, values are cleared and the id is
    /// regenerated. The next [`AuthCookieSession::save`] persists the new entry and
    /// hands the new id to the client.
    ///
    /// # Errors
    ///
    /// Propagates store and randomness failures.
    pub fn renew(&mut self) -> Result<(), SessionError> {
        self.session.save(Duration::zero())?;
        self.session.clear();
        self.id_token = self.session.recreate()?;
        self.id_changed = true;
        Ok(())
    }

    /// Remove both cookies from the client
    pub fn remove_cookies(&mut self) {
        self.id_cookie.remove();
        self.auth_cookie.remove();
    }

    /// Attach the queued cookies to a response
    pub fn apply(&mut self, response: &mut HttpResponseBuilder) {
        self.id_cookie.apply(response);
        self.auth_cookie.apply(response);
    }
}
