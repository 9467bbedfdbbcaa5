//! Auth store: session token and signed-in user.
//!
//! The token lives in a [`TokenSlot`] shared with the API client, so a
//! successful login immediately authorizes subsequent task requests.

use parking_lot::Mutex;
use taskdesk_proto::auth::{LoginRequest, User};
use tracing::{debug, info, warn};

use super::{Operation, RequestPhase};
use crate::api::{ApiError, AuthApi, TokenSlot};

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token, never empty.
    pub token: String,
    /// The signed-in user, once known.
    pub user: Option<User>,
}

/// Snapshot of the auth store, excluding the token itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// The signed-in user, once known.
    pub user: Option<User>,
    /// `true` while a request is in flight.
    pub loading: bool,
    /// Message of the most recent failure.
    pub error: Option<String>,
    /// The most recent operation and its phase.
    pub last_request: Option<(Operation, RequestPhase)>,
}

/// What a failed request does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnFailure {
    Keep,
    ClearSession,
}

struct Inner {
    state: AuthState,
    epoch: u64,
}

/// Owned auth store backed by an [`AuthApi`].
pub struct AuthStore<A> {
    api: A,
    token: TokenSlot,
    inner: Mutex<Inner>,
}

impl<A: AuthApi> AuthStore<A> {
    /// Creates an anonymous store. `token` must be the slot `api` reads from.
    pub fn new(api: A, token: TokenSlot) -> Self {
        Self {
            api,
            token,
            inner: Mutex::new(Inner {
                state: AuthState::default(),
                epoch: 0,
            }),
        }
    }

    /// The API this store issues requests through.
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.inner.lock().state.clone()
    }

    /// The current bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.get()
    }

    /// The current session, if a token is held.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        let token = self.token.get()?;
        let user = self.inner.lock().state.user.clone();
        Some(Session { token, user })
    }

    /// Whether a non-empty token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_present()
    }

    /// Seeds the session from a token held elsewhere (flag, env).
    pub fn restore(&self, token: Option<String>) {
        self.token.set(token);
        debug!(authenticated = self.token.is_present(), "session restored");
    }

    /// Signs in and stores the returned token and user.
    ///
    /// A failed login records the error and leaves any existing session as it was.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the request.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let epoch = self.begin(Operation::Login);
        let result = self.api.login(&request).await;
        self.finish(
            epoch,
            Operation::Login,
            &result,
            OnFailure::Keep,
            |state, token, response| {
                token.set(Some(response.token.clone()));
                state.user = Some(response.user.clone());
                info!(username = %response.user.username, "signed in");
            },
        );
        result.map(|response| response.user)
    }

    /// Clears the session. Requests still in flight will not restore it.
    pub fn logout(&self) {
        let mut inner = self.inner.lock();
        self.token.clear();
        inner.state = AuthState::default();
        inner.epoch += 1;
        info!("signed out");
    }

    /// Re-hydrates the user from the stored token.
    ///
    /// Fails without a request when no token is held. Any failure clears
    /// the session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a token, otherwise
    /// the [`ApiError`] from the request.
    pub async fn fetch_current_user(&self) -> Result<User, ApiError> {
        let epoch = self.begin(Operation::CurrentUser);
        let result = if self.token.is_present() {
            self.api.current_user().await
        } else {
            Err(ApiError::Unauthenticated)
        };
        self.finish(
            epoch,
            Operation::CurrentUser,
            &result,
            OnFailure::ClearSession,
            |state, _, user| {
                state.user = Some(user.clone());
            },
        );
        result
    }

    /// Exchanges the token for a fresh one. Failure clears the session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a token, otherwise
    /// the [`ApiError`] from the request.
    pub async fn refresh_token(&self) -> Result<(), ApiError> {
        let epoch = self.begin(Operation::Refresh);
        let result = if self.token.is_present() {
            self.api.refresh_token().await
        } else {
            Err(ApiError::Unauthenticated)
        };
        self.finish(
            epoch,
            Operation::Refresh,
            &result,
            OnFailure::ClearSession,
            |_, token, response| {
                token.set(Some(response.token.clone()));
            },
        );
        result.map(|_| ())
    }

    /// Creates an account and returns the server's response text.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the request.
    pub async fn register(&self, user: &serde_json::Value) -> Result<String, ApiError> {
        let epoch = self.begin(Operation::Register);
        let result = self.api.register(user).await;
        self.finish(epoch, Operation::Register, &result, OnFailure::Keep, |_, _, _| {});
        result
    }

    fn begin(&self, op: Operation) -> u64 {
        let mut inner = self.inner.lock();
        inner.state.loading = true;
        inner.state.last_request = Some((op, RequestPhase::Pending));
        debug!(?op, "auth request issued");
        inner.epoch
    }

    /// Applies a resolved request unless a logout happened since `begin`.
    ///
    /// The epoch check and every token write happen under one lock.
    fn finish<T>(
        &self,
        epoch: u64,
        op: Operation,
        result: &Result<T, ApiError>,
        on_failure: OnFailure,
        apply: impl FnOnce(&mut AuthState, &TokenSlot, &T),
    ) {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            debug!(?op, "discarding response issued before logout");
            return;
        }
        let state = &mut inner.state;
        state.loading = false;
        match result {
            Ok(value) => {
                apply(state, &self.token, value);
                state.error = None;
                state.last_request = Some((op, RequestPhase::Succeeded));
            }
            Err(e) => {
                let message = e.to_string();
                warn!(?op, error = %message, "auth request failed");
                if on_failure == OnFailure::ClearSession {
                    self.token.clear();
                    state.user = None;
                    warn!("session cleared");
                }
                state.error = Some(message.clone());
                state.last_request = Some((op, RequestPhase::Failed(message)));
            }
        }
    }
}
