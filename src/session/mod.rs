//! Session state: the token pair, the identity decoded from it, and the
//! lifecycle around both (restore, login, register, logout).
//!
//! The current session is an immutable snapshot behind an atomic swap. The
//! [`SessionStore`] is the only writer; the gateway reads through a
//! [`SessionHandle`] and therefore always sees either no session or one
//! complete, unexpired pair. Identity comes purely from decoding the access
//! token; there is no whoami round-trip and no refresh flow.

pub mod claims;
pub mod storage;

pub use claims::Claims;
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenPair, TokenStorage};

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::gateway::{Gateway, GatewayError};

/// An authenticated session: the token pair plus the claims decoded from the
/// access token.
#[derive(Debug, Clone)]
pub struct Session {
    pub tokens: TokenPair,
    pub claims: Claims,
}

impl Session {
    /// Build a snapshot from a pair, if the access token decodes.
    pub(crate) fn from_pair(tokens: TokenPair) -> Option<Self> {
        let claims = claims::decode(&tokens.access)?;
        Some(Self { tokens, claims })
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.claims.is_expired(now)
    }
}

/// Shared, cheap-to-clone view of the current session.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<ArcSwapOption<Session>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. An expired token reads as signed out, so identity
    /// only ever exists alongside a live access token.
    pub fn current(&self) -> Option<Arc<Session>> {
        let session = self.inner.load_full()?;
        if session.is_expired(Utc::now().timestamp()) {
            debug!("Access token has expired; reading session as signed out");
            return None;
        }
        Some(session)
    }

    /// Access token to sign the next request with, if a session is live.
    pub fn access_token(&self) -> Option<String> {
        self.current().map(|session| session.tokens.access.clone())
    }

    pub(crate) fn install(&self, session: Session) {
        self.inner.store(Some(Arc::new(session)));
    }

    pub(crate) fn clear(&self) {
        self.inner.store(None);
    }
}

/// Credentials for `POST /token/`.
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Registration form for `POST /users/register/`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Profile as the user endpoints return it.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Owns the session lifecycle. Storage is injected so tests and embedders
/// can substitute their own backend.
pub struct SessionStore {
    storage: Arc<dyn TokenStorage>,
    handle: SessionHandle,
    gateway: Gateway,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn TokenStorage>, handle: SessionHandle, gateway: Gateway) -> Self {
        Self {
            storage,
            handle,
            gateway,
        }
    }

    /// The read handle shared with the gateway and other components.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Rehydrate the session from persisted tokens.
    ///
    /// An expired or undecodable access token purges storage and leaves the
    /// store signed out. Never fails: any broken state degrades to no
    /// session.
    pub fn restore(&self) -> Option<Claims> {
        let Some(pair) = self.storage.load() else {
            self.handle.clear();
            return None;
        };

        match Session::from_pair(pair) {
            Some(session) if !session.is_expired(Utc::now().timestamp()) => {
                debug!(subject = %session.claims.subject(), "Restored session");
                let claims = session.claims.clone();
                self.handle.install(session);
                Some(claims)
            }
            Some(_) => {
                warn!("Stored access token has expired; signing out");
                self.storage.clear();
                self.handle.clear();
                None
            }
            None => {
                warn!("Stored access token is not decodable; signing out");
                self.storage.clear();
                self.handle.clear();
                None
            }
        }
    }

    /// Exchange credentials for a token pair and install the session.
    ///
    /// On any failure the previous session state is left untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<Claims, ClientError> {
        let request = LoginRequest { username, password };
        let pair: TokenPair = self
            .gateway
            .post("/token/", &request)
            .await
            .map_err(|e| match e {
                // Only a 401 actually means bad credentials; an outage must
                // not read as a typo.
                GatewayError::Status { status: 401, detail } => ClientError::Unauthorized(
                    detail.unwrap_or_else(|| "Invalid username or password".to_string()),
                ),
                other => ClientError::from_gateway(other, "Login failed"),
            })?;

        let Some(session) = Session::from_pair(pair) else {
            return Err(ClientError::Server(
                "Login succeeded but the access token could not be decoded".to_string(),
            ));
        };

        if let Err(e) = self.storage.save(&session.tokens) {
            warn!(error = %e, "Failed to persist tokens; the session will not survive a restart");
        }

        let claims = session.claims.clone();
        info!(subject = %claims.subject(), "Signed in");
        self.handle.install(session);
        Ok(claims)
    }

    /// Create an account. No session is established; callers sign in
    /// afterwards with the new credentials.
    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, ClientError> {
        let profile: UserProfile = self
            .gateway
            .post("/users/register/", registration)
            .await
            .map_err(|e| ClientError::from_gateway(e, "An error occurred during registration"))?;

        info!(username = %profile.username, "Account created");
        Ok(profile)
    }

    /// Drop the session and the stored tokens. Safe to call repeatedly.
    pub fn logout(&self) {
        self.storage.clear();
        self.handle.clear();
        info!("Signed out");
    }

    /// Claims of the current session, if one is live.
    pub fn identity(&self) -> Option<Claims> {
        self.handle.current().map(|session| session.claims.clone())
    }
}
