//! HTTP gateway for the MintFiat backend. These wrappers centralize request
//! setup, status handling and error-body parsing so flow and session code
//! never touch raw responses. Session auth is cookie-based: the client keeps
//! a cookie store and the backend sets the session cookie on signin.

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{Instrument, info_span};
use url::Url;

mod error;
mod types;

pub use error::GatewayError;
pub use types::{
    Balances, CompleteRegistrationRequest, Currency, DispatchAck, SendFiatRequest, SessionResponse,
    SigninRequest, SignupRequest, TransactionOtpRequest, UpdatePasswordRequest,
    VerifyEmailOtpRequest,
};

/// Extract a display message from a structured error body.
///
/// The backend returns either `{"message": "..."}` or
/// `{"errors": [{"path": "...", "msg": "..."}]}`; the latter is rendered as
/// comma-joined `"path: msg"` strings.
fn api_error_message(body: &Value) -> String {
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    body.get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|entry| {
                    let path = entry.get("path").and_then(Value::as_str)?;
                    let msg = entry.get("msg").and_then(Value::as_str)?;
                    Some(format!("{path}: {msg}"))
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// Turn a non-success response into an `Api` error with the backend message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    // Non-JSON error bodies still map to an Api error; the message is empty
    // and user_message() falls back to the generic one.
    let body: Value = response.json().await.unwrap_or(Value::Null);
    Err(GatewayError::Api {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

/// Client for the MintFiat HTTP API.
pub struct Gateway {
    client: Client,
    base_url: Url,
}

impl Gateway {
    /// Build a gateway for the given API base URL.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be parsed, has no host, or the
    /// underlying client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| GatewayError::Parse(format!("Invalid API base URL: {err}")))?;
        if base_url.host().is_none() {
            return Err(GatewayError::Parse(
                "Invalid API base URL: no host specified".to_string(),
            ));
        }
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .cookie_store(true)
            .build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|err| GatewayError::Parse(format!("Invalid endpoint path {path}: {err}")))
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let url = self.endpoint(path)?;
        let span = info_span!("gateway.post", http.method = "POST", url = %url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .instrument(span)
            .await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|err| GatewayError::Parse(format!("Invalid response payload: {err}")))
    }

    async fn post_json_empty<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(path)?;
        let span = info_span!("gateway.post", http.method = "POST", url = %url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .instrument(span)
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Stage an email for registration; the backend emails a one-time code.
    ///
    /// # Errors
    /// Returns an error if the request fails or the backend rejects the email.
    pub async fn signup(&self, request: &SignupRequest) -> Result<DispatchAck, GatewayError> {
        self.post_json("/auth/signup", request).await
    }

    /// Validate the signup one-time code.
    ///
    /// # Errors
    /// Returns an error if the code is wrong or expired.
    pub async fn verify_email_otp(
        &self,
        request: &VerifyEmailOtpRequest,
    ) -> Result<(), GatewayError> {
        self.post_json_empty("/auth/verify-otp/verify-email", request)
            .await
    }

    /// Finalize registration with the chosen password and optional referral.
    ///
    /// # Errors
    /// Returns an error if the request fails or registration cannot complete.
    pub async fn complete_registration(
        &self,
        request: &CompleteRegistrationRequest,
    ) -> Result<(), GatewayError> {
        self.post_json_empty("/auth/complete-registration", request)
            .await
    }

    /// Credential login; on success the backend sets the session cookie.
    ///
    /// # Errors
    /// Returns an error if the credentials are rejected or the request fails.
    pub async fn signin(&self, request: &SigninRequest) -> Result<SessionResponse, GatewayError> {
        self.post_json("/auth/signin", request).await
    }

    /// Terminate the server-side session.
    ///
    /// # Errors
    /// Returns an error if the request fails; callers treat this as
    /// best-effort and clear local state regardless.
    pub async fn logout(&self) -> Result<(), GatewayError> {
        let url = self.endpoint("/auth/logout")?;
        let span = info_span!("gateway.logout", http.method = "POST", url = %url);
        let response = self.client.post(url).send().instrument(span).await?;
        check_status(response).await?;
        Ok(())
    }

    /// Rehydrate the session from the cookie.
    ///
    /// # Errors
    /// Returns an error if there is no active session or the request fails.
    pub async fn me(&self) -> Result<SessionResponse, GatewayError> {
        let url = self.endpoint("/auth/me")?;
        let span = info_span!("gateway.me", http.method = "GET", url = %url);
        let response = self.client.get(url).send().instrument(span).await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|err| GatewayError::Parse(format!("Invalid session payload: {err}")))
    }

    /// Stage a password change; the backend emails a one-time code.
    ///
    /// # Errors
    /// Returns an error if the old password is rejected or the request fails.
    pub async fn update_password(
        &self,
        request: &UpdatePasswordRequest,
    ) -> Result<DispatchAck, GatewayError> {
        self.post_json("/auth/update-password", request).await
    }

    /// Validate the one-time code for a staged transactional action. Only on
    /// success does the backend apply the underlying mutation.
    ///
    /// # Errors
    /// Returns an error if the code is wrong or expired.
    pub async fn verify_transaction_otp(
        &self,
        request: &TransactionOtpRequest,
    ) -> Result<(), GatewayError> {
        self.post_json_empty("/auth/verify-otp/transaction", request)
            .await
    }

    /// Stage a fiat transfer; the backend emails a one-time code.
    ///
    /// # Errors
    /// Returns an error if the transfer is rejected or the request fails.
    pub async fn send_fiat(&self, request: &SendFiatRequest) -> Result<DispatchAck, GatewayError> {
        self.post_json("/users/assets/send/fiat", request).await
    }
}
