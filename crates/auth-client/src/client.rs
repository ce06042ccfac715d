//! Authenticated client facade
//!
//! The only entry point page code uses. Attaches the current credential to
//! every call, passes non-401 outcomes straight through, and routes a first
//! 401 through the `RefreshCoordinator`. The retried request never goes back
//! to the coordinator, so one logical request is refreshed at most once.

use std::sync::{Arc, Mutex, PoisonError};

use common::Secret;
use session::{Credential, CredentialStore, Endpoints, UserProfile};
use tracing::{debug, info, instrument, warn};
use transport::{ApiRequest, RawResponse, Transport};

use crate::classify::{Classified, classify_outcome};
use crate::coordinator::RefreshCoordinator;
use crate::error::{Error, Result};

/// Authenticated request client for one session.
pub struct AuthClient {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    coordinator: RefreshCoordinator,
    endpoints: Endpoints,
    profile: Mutex<Option<UserProfile>>,
}

impl AuthClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        endpoints: Endpoints,
    ) -> Self {
        let coordinator =
            RefreshCoordinator::new(transport.clone(), store.clone(), endpoints.clone());
        Self {
            transport,
            store,
            coordinator,
            endpoints,
            profile: Mutex::new(None),
        }
    }

    pub fn credential_store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Profile of the signed-in user, if `login` succeeded.
    pub fn profile(&self) -> Option<UserProfile> {
        self.profile
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register a listener for forced logout (refresh rejected).
    pub fn on_session_ended<F>(&self, listener: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.coordinator.on_session_ended(listener);
    }

    /// Sign in and start a new session.
    ///
    /// A refresh still running for an earlier session can't overwrite the
    /// new credential.
    pub async fn login(&self, email: &str, password: &Secret<String>) -> Result<UserProfile> {
        let session = session::login(
            self.transport.as_ref(),
            &self.endpoints,
            email,
            password.expose(),
        )
        .await
        .map_err(|e| match e {
            session::Error::InvalidCredentials(msg) => Error::Auth(msg),
            other => Error::Transport(other.to_string()),
        })?;

        self.coordinator.begin_session(session.credential);
        *self.profile.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(session.profile.clone());
        Ok(session.profile)
    }

    /// Sign out: tell the backend, then end the session locally whatever it answered.
    pub async fn logout(&self) -> Result<()> {
        let profile = self
            .profile
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let result = match &profile {
            Some(p) => session::logout(self.transport.as_ref(), &self.endpoints, &p.user_id)
                .await
                .map_err(|e| Error::Transport(e.to_string())),
            None => Ok(()),
        };
        self.coordinator.terminate("signed out");
        result
    }

    /// Tear the session down without contacting the backend.
    ///
    /// Queued callers fail with `SessionEnded`; later calls short-circuit.
    pub fn end_session(&self, reason: &str) {
        info!(reason, "ending session");
        self.coordinator.terminate(reason);
    }

    /// Issue `request` with the session's credential.
    ///
    /// Returns the response for 2xx. A 401 triggers (or joins) one refresh
    /// and a single retry; a 401 on that retry is `Auth`. An empty credential
    /// store short-circuits to `SessionEnded` without touching the transport.
    #[instrument(
        skip_all,
        fields(request_id = %uuid::Uuid::new_v4(), method = %request.method, path = %request.path)
    )]
    pub async fn call(&self, request: ApiRequest) -> Result<RawResponse> {
        let result = self.call_once_refreshed(request).await;
        match &result {
            Ok(_) => crate::metrics::record_call("success"),
            Err(e) => {
                debug!(error = %e, "call failed");
                crate::metrics::record_call(e.label());
            }
        }
        result
    }

    async fn call_once_refreshed(&self, request: ApiRequest) -> Result<RawResponse> {
        let Some(credential) = self.store.get() else {
            return Err(Error::SessionEnded("no active session".to_string()));
        };

        match classify_outcome(self.send_with(&request, &credential).await) {
            Classified::Done(response) => return Ok(response),
            Classified::Failed(e) => return Err(e),
            Classified::Expired => {}
        }

        if self.endpoints.is_refresh(&request.path) {
            return Err(Error::Auth("refresh endpoint refused the credential".to_string()));
        }

        let fresh = self.coordinator.fresh_credential(&credential).await?;
        debug!("retrying with refreshed credential");
        match classify_outcome(self.send_with(&request, &fresh).await) {
            Classified::Done(response) => Ok(response),
            Classified::Failed(e) => Err(e),
            Classified::Expired => {
                warn!("credential rejected again after refresh");
                Err(Error::Auth("credential rejected after refresh".to_string()))
            }
        }
    }

    async fn send_with(
        &self,
        request: &ApiRequest,
        credential: &Credential,
    ) -> transport::Result<RawResponse> {
        let mut request = request.clone();
        request.set_bearer(credential.token())?;
        self.transport.send(request).await
    }
}
