//! Salvo middleware that loads and saves sessions around each request

use salvo_core::http::cookie::time::Duration;
use salvo_core::http::cookie::{self, Cookie};
use salvo_core::prelude::*;
use std::sync::Arc;

use crate::config::SameSite;
use crate::engine::{SaveOutcome, SessionEngine};
use crate::session::{Session, SessionOptions};
use crate::store::KeyValueStore;

pub(crate) const SESSION_KEY: &str = "salvo.redis.session";

/// Session middleware for Salvo
///
/// Reads the session token from the cookie named after the session, puts the
/// [`Session`] into the depot, and after the rest of the chain has run saves it
/// if it was modified, or removes it if it was destroyed.
pub struct SessionHandler<S: KeyValueStore> {
    engine: Arc<SessionEngine<S>>,
    name: String,
}

impl<S: KeyValueStore> SessionHandler<S> {
    /// Create a handler for the session (and cookie) called `name`
    pub fn new<N: Into<String>>(engine: SessionEngine<S>, name: N) -> Self {
        Self {
            engine: Arc::new(engine),
            name: name.into(),
        }
    }

    /// The engine behind this handler
    pub fn engine(&self) -> &SessionEngine<S> {
        &self.engine
    }

    /// Get the session token from the request cookie
    fn token_from_request(&self, req: &Request) -> Option<String> {
        let cookie_value = req.cookie(&self.name)?;
        let value = cookie_value.value();

        // Cookies may arrive URL encoded
        match urlencoding::decode(value) {
            Ok(d) => Some(d.into_owned()),
            Err(_) => Some(value.to_string()),
        }
    }

    /// Build the cookie carrying a freshly minted token
    fn session_cookie(&self, token: String, options: &SessionOptions) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.name.clone(), token))
            .path(options.path.clone())
            .http_only(options.http_only)
            .secure(options.secure);

        if let Some(domain) = options.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        if options.max_age > 0 {
            cookie_builder = cookie_builder.max_age(Duration::seconds(options.max_age));
        }

        if let Some(same_site) = options.same_site {
            cookie_builder = cookie_builder.same_site(match same_site {
                SameSite::Strict => cookie::SameSite::Strict,
                SameSite::Lax => cookie::SameSite::Lax,
                SameSite::None => cookie::SameSite::None,
            });
        }

        cookie_builder.build()
    }

    /// Build a cookie that makes the client drop its token
    fn removal_cookie(&self, options: &SessionOptions) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.name.clone(), ""))
            .path(options.path.clone())
            .max_age(Duration::ZERO);

        if let Some(domain) = options.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        cookie_builder.build()
    }
}

impl<S: KeyValueStore> Clone for SessionHandler<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            name: self.name.clone(),
        }
    }
}

#[async_trait]
impl<S: KeyValueStore> Handler for SessionHandler<S> {
    async fn handle(&self, req: &mut Request, depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
        let token = self.token_from_request(req);
        let session = match self.engine.fetch_or_create(token.as_deref(), &self.name).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Failed to load session: {}", e);
                self.engine.new_session(&self.name)
            }
        };

        depot.insert(SESSION_KEY, session);

        ctrl.call_next(req, depot, res).await;

        // Handlers may have taken the session out of the depot
        let Ok(mut session) = depot.remove::<Session>(SESSION_KEY) else {
            return;
        };

        if session.should_destroy() {
            if let Err(e) = self.engine.remove(&mut session).await {
                tracing::error!("Failed to destroy session: {}", e);
            }
            res.add_cookie(self.removal_cookie(session.options()));
            return;
        }

        if !session.is_modified() {
            return;
        }

        match self.engine.persist(&mut session).await {
            Ok(SaveOutcome::Token(token)) => {
                res.add_cookie(self.session_cookie(token, session.options()));
            }
            Ok(SaveOutcome::Clear) => {
                res.add_cookie(self.removal_cookie(session.options()));
            }
            Err(e) => {
                tracing::error!("Failed to save session: {}", e);
            }
        }
    }
}
