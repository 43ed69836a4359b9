//! Authorization-aware request dispatch.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every domain call goes through `AuthorizedClient::request`. It reads the
//! current credential from the session store, attaches it as a bearer token,
//! and turns the response into a typed `ApiError` outcome. A 401 clears the
//! session and publishes an `AuthorizationFailure`; navigation back to the
//! login screen is left to whoever composes the client with a view layer.
//!
//! CONCURRENCY
//! ===========
//! Requests are independent: nothing is queued or serialized, and nothing is
//! retried here. Two concurrent 401s both clear the session (idempotent) and
//! both publish a failure, so listeners must tolerate repeats.

#[cfg(test)]
#[path = "authorized_test.rs"]
mod authorized_test;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::error::{ApiError, classify_status};
use super::transport::{ApiRequest, HttpTransport, Transport, TransportError, TransportResponse};
use crate::state::session::SessionStore;

const FAILURE_CHANNEL_CAPACITY: usize = 16;

/// Raised once per request answered with 401. Carries no data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthorizationFailure;

/// Request wrapper that attaches credentials and interprets authorization failures.
pub struct AuthorizedClient<T = HttpTransport> {
    transport: T,
    session: SessionStore,
    failures: broadcast::Sender<AuthorizationFailure>,
}

impl<T: Transport> AuthorizedClient<T> {
    pub fn new(transport: T, session: SessionStore) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self { transport, session, failures }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Subscribe to authorization-failure events.
    #[must_use]
    pub fn subscribe_failures(&self) -> broadcast::Receiver<AuthorizationFailure> {
        self.failures.subscribe()
    }

    /// Send an authorized request and decode its JSON payload.
    ///
    /// An empty 2xx body decodes as `Value::Null`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Unauthorized`] on 401, after the session has been cleared.
    /// - [`ApiError::ClientError`] / [`ApiError::ServerError`] on other failures.
    /// - [`ApiError::NetworkError`] on transport failure, timeout, or a body
    ///   that is not valid JSON.
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let bearer = self.session.token();
        let response = self.dispatch(method.clone(), path, body, bearer).await?;
        if response.status == 401 {
            self.session.clear();
            // Nobody listening is fine; the typed error still reaches the caller.
            let _ = self.failures.send(AuthorizationFailure);
            warn!(%method, path, "request unauthorized; session cleared");
            return Err(ApiError::Unauthorized);
        }
        decode_payload(&method, path, response)
    }

    /// Send a request without credentials, for sign-in and sign-up.
    ///
    /// A 401 here means "wrong credentials", not "session expired": it is
    /// reported as `ClientError { status: 401 }` and the session is untouched.
    ///
    /// # Errors
    ///
    /// Same as [`Self::request`], except 401 never yields `Unauthorized`.
    pub async fn request_public(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let response = self.dispatch(method.clone(), path, body, None).await?;
        if response.status == 401 {
            return Err(ApiError::ClientError {
                status: 401,
                message: super::error::error_message(401, &response.body),
            });
        }
        decode_payload(&method, path, response)
    }

    /// Typed form of [`Self::request`].
    ///
    /// # Errors
    ///
    /// As [`Self::request`]; a payload that does not match `R` is a
    /// [`ApiError::NetworkError`].
    pub async fn request_json<B, R>(&self, method: Method, path: &str, body: Option<&B>) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let body = encode_body(body)?;
        let value = self.request(method, path, body).await?;
        decode_typed(path, value)
    }

    /// Typed form of [`Self::request_public`].
    ///
    /// # Errors
    ///
    /// As [`Self::request_public`].
    pub async fn public_json<B, R>(&self, method: Method, path: &str, body: Option<&B>) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let body = encode_body(body)?;
        let value = self.request_public(method, path, body).await?;
        decode_typed(path, value)
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        bearer: Option<String>,
    ) -> Result<TransportResponse, ApiError> {
        let request = ApiRequest { method: method.clone(), path: path.to_owned(), body, bearer };
        match self.transport.send(request).await {
            Ok(response) => {
                debug!(%method, path, status = response.status, "request completed");
                Ok(response)
            }
            Err(e) => {
                warn!(%method, path, error = %e, "request failed before a response");
                Err(network_error(e))
            }
        }
    }
}

fn network_error(e: TransportError) -> ApiError {
    ApiError::NetworkError(e.to_string())
}

fn decode_payload(method: &Method, path: &str, response: TransportResponse) -> Result<Value, ApiError> {
    if !(200..300).contains(&response.status) {
        debug!(%method, path, status = response.status, "request rejected");
        return Err(classify_status(response.status, &response.body));
    }
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body)
        .map_err(|e| ApiError::NetworkError(format!("malformed response body from {path}: {e}")))
}

fn encode_body<B: Serialize + ?Sized>(body: Option<&B>) -> Result<Option<Value>, ApiError> {
    body.map(serde_json::to_value)
        .transpose()
        .map_err(|e| ApiError::invalid_input(format!("request body could not be encoded: {e}")))
}

fn decode_typed<R: DeserializeOwned>(path: &str, value: Value) -> Result<R, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::NetworkError(format!("unexpected response shape from {path}: {e}")))
}
