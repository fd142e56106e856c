//! Cached session state. The store is the single source of truth for "who is
//! logged in" and the only writer of that state: `login`, `logout`,
//! `check_auth` and `refresh` are the four operations that may mutate it.
//! Balances held here are a read-through cache of server truth and are
//! re-fetched after any balance-mutating action.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::gateway::{Balances, Currency, Gateway, GatewayError, SessionResponse, SigninRequest};
use crate::policy;

/// The client's view of the authenticated identity.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
    pub balances: Balances,
}

impl From<SessionResponse> for Session {
    fn from(response: SessionResponse) -> Self {
        Self {
            user_id: response.user_id,
            email: response.email,
            email_verified: response.email_verified,
            balances: response.balances,
        }
    }
}

/// Holds at most one active session per client context.
pub struct SessionStore {
    gateway: Arc<Gateway>,
    state: RwLock<Option<Session>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            state: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Submit credentials; on success the in-memory session is replaced with
    /// the returned identity. On failure local state is left unchanged.
    ///
    /// # Errors
    /// Returns the gateway error, carrying the backend's message when there
    /// is one (e.g. invalid credentials).
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, GatewayError> {
        let request = SigninRequest {
            email: policy::normalize_email(email),
            password: password.expose_secret().to_string(),
        };
        let response = self.gateway.signin(&request).await?;
        let session = Session::from(response);
        *self.state.write().await = Some(session.clone());
        Ok(session)
    }

    /// Terminate the session. Local state is cleared unconditionally, even if
    /// the remote call fails, so the client is never stranded in a
    /// false-authenticated state; the remote failure is logged for
    /// diagnostics. Idempotent.
    pub async fn logout(&self) {
        if let Err(err) = self.gateway.logout().await {
            warn!("Remote logout failed, clearing local session anyway: {err}");
        }
        *self.state.write().await = None;
    }

    /// Rehydrate the session from the server-held cookie, typically at
    /// application start. Never fails: any error collapses to an
    /// unauthenticated state.
    pub async fn check_auth(&self) -> Option<Session> {
        match self.gateway.me().await {
            Ok(response) => {
                let session = Session::from(response);
                *self.state.write().await = Some(session.clone());
                Some(session)
            }
            Err(err) => {
                debug!("Session check failed: {err}");
                *self.state.write().await = None;
                None
            }
        }
    }

    /// Re-fetch profile and balance fields after a mutating action. Does not
    /// alter the authentication flag: on failure the cached session stays as
    /// it was.
    ///
    /// # Errors
    /// Returns the gateway error when the fetch fails.
    pub async fn refresh(&self) -> Result<Session, GatewayError> {
        let response = self.gateway.me().await?;
        let session = Session::from(response);
        *self.state.write().await = Some(session.clone());
        Ok(session)
    }

    pub async fn current(&self) -> Option<Session> {
        self.state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Cached balance for a currency; zero when unauthenticated.
    pub async fn cached_balance(&self, currency: Currency) -> f64 {
        self.state
            .read()
            .await
            .as_ref()
            .map_or(0.0, |session| session.balances.get(currency))
    }
}
