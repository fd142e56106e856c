//! Step-up verification flow. Sensitive actions (fiat transfer, password
//! change, registration) are staged locally, the backend is asked to dispatch
//! a one-time code to the user's email, and only a validated code finalizes
//! the action server-side. The flow is an explicit state machine so invalid
//! combinations (e.g. validating before dispatch) are unrepresentable, and a
//! cancelled flow refuses every later transition so a late response cannot
//! revive it.

use secrecy::{ExposeSecret, SecretString};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use crate::gateway::{
    CompleteRegistrationRequest, Currency, Gateway, GatewayError, SendFiatRequest, SignupRequest,
    TransactionOtpRequest, UpdatePasswordRequest, VerifyEmailOtpRequest,
};
use crate::policy;
use crate::session::{Session, SessionStore};

pub mod code;

pub use code::{CODE_LEN, CodeEntry};

/// Validity window of a dispatched code, also shown to the user.
pub const OTP_VALIDITY: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepUpState {
    /// Staged and locally validated, not yet acknowledged by the backend.
    AwaitingDispatch,
    /// A code has been dispatched; the validity window is running.
    AwaitingCode,
    /// A code submission is in flight.
    Validating,
    /// The backend finalized the action.
    Completed,
    /// Dispatch was rejected; the staged payload is retained for correction.
    Failed,
    /// The user dismissed the flow; the staged action is discarded.
    Cancelled,
    /// The validity window elapsed; only a re-dispatch leaves this state.
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    PasswordChange,
    FundTransfer,
    Registration,
}

/// A sensitive action's input payload held locally while awaiting dispatch
/// and validation, not yet applied server-side.
#[derive(Clone, Debug)]
pub enum StagedAction {
    PasswordChange {
        old_password: SecretString,
        new_password: SecretString,
    },
    FundTransfer {
        receiver_id: String,
        currency: Currency,
        amount: f64,
    },
    Registration {
        email: String,
        password: SecretString,
        referral_id: Option<String>,
    },
}

impl StagedAction {
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::PasswordChange { .. } => ActionKind::PasswordChange,
            Self::FundTransfer { .. } => ActionKind::FundTransfer,
            Self::Registration { .. } => ActionKind::Registration,
        }
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    /// A local precondition failed; no network call was made.
    #[error("{0}")]
    Validation(String),

    /// Submission attempted with empty slots; no network call was made.
    #[error("OTP code is incomplete")]
    IncompleteCode,

    /// The validity window elapsed before submission.
    #[error("OTP code has expired, request a new one")]
    Expired,

    /// The flow is not in a state that allows the requested transition.
    #[error("Action is not available in the current state")]
    InvalidState,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// One staged sensitive action and its verification state.
#[derive(Debug)]
pub struct StepUpFlow {
    state: StepUpState,
    action: StagedAction,
    /// Registered email the code is delivered to and validated against.
    email: String,
    code: CodeEntry,
    dispatched_at: Option<Instant>,
    last_error: Option<String>,
}

impl StepUpFlow {
    fn new(action: StagedAction, email: String) -> Self {
        Self {
            state: StepUpState::AwaitingDispatch,
            action,
            email,
            code: CodeEntry::new(),
            dispatched_at: None,
            last_error: None,
        }
    }

    /// Stage a fiat transfer after checking the amount against the cached
    /// balance for the selected currency.
    ///
    /// # Errors
    /// Returns a validation error before any network call when the recipient
    /// is missing or the amount is not positive or exceeds the cached balance.
    pub fn stage_transfer(
        session: &Session,
        receiver_id: &str,
        currency: Currency,
        amount: f64,
    ) -> Result<Self, FlowError> {
        let receiver_id = receiver_id.trim();
        if receiver_id.is_empty() {
            return Err(FlowError::Validation("Recipient is required".to_string()));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(FlowError::Validation(
                "Quantity must be a positive number".to_string(),
            ));
        }
        if !policy::valid_transfer_amount(amount, session.balances.get(currency)) {
            return Err(FlowError::Validation(
                "Quantity exceeds available balance".to_string(),
            ));
        }
        Ok(Self::new(
            StagedAction::FundTransfer {
                receiver_id: receiver_id.to_string(),
                currency,
                amount,
            },
            session.email.clone(),
        ))
    }

    /// Stage a password change after checking the composite password policy
    /// and the confirmation value.
    ///
    /// # Errors
    /// Returns a validation error before any network call when the new
    /// password fails the policy or the confirmation does not match.
    pub fn stage_password_change(
        session: &Session,
        old_password: SecretString,
        new_password: SecretString,
        confirm: &SecretString,
    ) -> Result<Self, FlowError> {
        if !policy::valid_password(new_password.expose_secret()) {
            return Err(FlowError::Validation(
                "Password must be 10-128 characters with an uppercase letter, a lowercase letter and a digit".to_string(),
            ));
        }
        if new_password.expose_secret() != confirm.expose_secret() {
            return Err(FlowError::Validation("Passwords do not match".to_string()));
        }
        Ok(Self::new(
            StagedAction::PasswordChange {
                old_password,
                new_password,
            },
            session.email.clone(),
        ))
    }

    /// Stage a registration. The email is staged for dispatch; the password
    /// is only sent at completion, after the code validates.
    ///
    /// # Errors
    /// Returns a validation error before any network call when the email or
    /// password is invalid or the confirmation does not match.
    pub fn stage_registration(
        email: &str,
        password: SecretString,
        confirm: &SecretString,
        referral_id: Option<String>,
    ) -> Result<Self, FlowError> {
        let email = policy::normalize_email(email);
        if !policy::valid_email(&email) {
            return Err(FlowError::Validation("Invalid email address".to_string()));
        }
        if !policy::valid_password(password.expose_secret()) {
            return Err(FlowError::Validation(
                "Password must be 10-128 characters with an uppercase letter, a lowercase letter and a digit".to_string(),
            ));
        }
        if password.expose_secret() != confirm.expose_secret() {
            return Err(FlowError::Validation("Passwords do not match".to_string()));
        }
        Ok(Self::new(
            StagedAction::Registration {
                email: email.clone(),
                password,
                referral_id,
            },
            email,
        ))
    }

    #[must_use]
    pub fn state(&self) -> StepUpState {
        self.state
    }

    #[must_use]
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    /// The retained payload, so a rejected dispatch can be corrected without
    /// re-entering everything.
    #[must_use]
    pub fn staged(&self) -> &StagedAction {
        &self.action
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn code_entry(&self) -> &CodeEntry {
        &self.code
    }

    /// Enter a character into the focused code slot; only accepted while a
    /// code is awaited.
    pub fn enter_digit(&mut self, input: char) {
        if self.state == StepUpState::AwaitingCode {
            self.code.push(input);
        }
    }

    /// Enter a character into a specific code slot; only accepted while a
    /// code is awaited.
    pub fn set_code_slot(&mut self, index: usize, input: char) {
        if self.state == StepUpState::AwaitingCode {
            self.code.set_slot(index, input);
        }
    }

    /// Reset the code slots, e.g. before re-typing.
    pub fn clear_code(&mut self) {
        if self.state == StepUpState::AwaitingCode {
            self.code.clear();
        }
    }

    /// Time left in the validity window, once a code has been dispatched.
    #[must_use]
    pub fn remaining_validity(&self, now: Instant) -> Option<Duration> {
        self.dispatched_at
            .map(|at| OTP_VALIDITY.saturating_sub(now.duration_since(at)))
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.dispatched_at
            .is_some_and(|at| now.duration_since(at) > OTP_VALIDITY)
    }

    /// Ask the backend to dispatch the one-time code for the staged action.
    /// On acknowledgment the validity window starts; on rejection the flow
    /// moves to `Failed` with the payload retained and may be re-dispatched.
    ///
    /// # Errors
    /// Returns `InvalidState` outside `AwaitingDispatch`/`Failed`, or the
    /// gateway error when dispatch is rejected.
    pub async fn dispatch(&mut self, gateway: &Gateway) -> Result<(), FlowError> {
        match self.state {
            StepUpState::AwaitingDispatch | StepUpState::Failed => {}
            _ => return Err(FlowError::InvalidState),
        }
        let result = match &self.action {
            StagedAction::FundTransfer {
                receiver_id,
                currency,
                amount,
            } => {
                gateway
                    .send_fiat(&SendFiatRequest {
                        receiver_id: receiver_id.clone(),
                        currency: *currency,
                        amount: *amount,
                    })
                    .await
            }
            StagedAction::PasswordChange {
                old_password,
                new_password,
            } => {
                gateway
                    .update_password(&UpdatePasswordRequest {
                        old_password: old_password.expose_secret().to_string(),
                        new_password: new_password.expose_secret().to_string(),
                    })
                    .await
            }
            StagedAction::Registration { email, .. } => {
                gateway
                    .signup(&SignupRequest {
                        email: email.clone(),
                    })
                    .await
            }
        };
        match result {
            Ok(ack) => {
                info!(
                    kind = ?self.action.kind(),
                    status = %ack.dispatch_status,
                    "One-time code dispatched"
                );
                self.state = StepUpState::AwaitingCode;
                self.dispatched_at = Some(Instant::now());
                self.code.clear();
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                self.state = StepUpState::Failed;
                self.last_error = Some(err.user_message());
                Err(err.into())
            }
        }
    }

    /// Request a fresh code while one is awaited or after expiry. Restarts
    /// the validity window. The resend cooldown is enforced server-side; a
    /// rate-limited resend surfaces like any dispatch rejection.
    ///
    /// # Errors
    /// Returns `InvalidState` outside `AwaitingCode`/`Expired`, or the
    /// gateway error when the re-dispatch is rejected.
    pub async fn resend(&mut self, gateway: &Gateway) -> Result<(), FlowError> {
        match self.state {
            StepUpState::AwaitingCode | StepUpState::Expired => {
                self.state = StepUpState::AwaitingDispatch;
                self.dispatch(gateway).await
            }
            _ => Err(FlowError::InvalidState),
        }
    }

    /// Submit the collected code. On success the backend finalizes the staged
    /// action, the payload is cleared, and the session store is refreshed
    /// exactly once. On a rejected code the flow stays open within its window
    /// with the slots cleared.
    ///
    /// # Errors
    /// Returns `IncompleteCode` or `Expired` without any network call,
    /// `InvalidState` when no code is awaited, or the gateway error when the
    /// backend rejects the code.
    pub async fn submit_code(
        &mut self,
        gateway: &Gateway,
        store: &SessionStore,
    ) -> Result<(), FlowError> {
        if self.state != StepUpState::AwaitingCode {
            return Err(FlowError::InvalidState);
        }
        let Some(code) = self.code.code() else {
            self.last_error = Some("OTP code is incomplete".to_string());
            return Err(FlowError::IncompleteCode);
        };
        if self.is_expired(Instant::now()) {
            self.state = StepUpState::Expired;
            self.last_error = Some("OTP code has expired, request a new one".to_string());
            return Err(FlowError::Expired);
        }
        self.state = StepUpState::Validating;
        match self.finalize(gateway, &code).await {
            Ok(()) => {
                self.state = StepUpState::Completed;
                self.clear_payload();
                self.code.clear();
                self.last_error = None;
                if store.is_authenticated().await {
                    if let Err(err) = store.refresh().await {
                        // The action already finalized server-side; a failed
                        // refresh only leaves the cached balances stale.
                        warn!("Session refresh after finalization failed: {err}");
                    }
                }
                Ok(())
            }
            Err(err) => {
                self.state = StepUpState::AwaitingCode;
                self.code.clear();
                self.last_error = Some(err.user_message());
                Err(err.into())
            }
        }
    }

    async fn finalize(&self, gateway: &Gateway, code: &str) -> Result<(), GatewayError> {
        match &self.action {
            StagedAction::Registration {
                email,
                password,
                referral_id,
            } => {
                gateway
                    .verify_email_otp(&VerifyEmailOtpRequest {
                        email: email.clone(),
                        otp: code.to_string(),
                    })
                    .await?;
                gateway
                    .complete_registration(&CompleteRegistrationRequest {
                        email: email.clone(),
                        password: password.expose_secret().to_string(),
                        referral_id: referral_id.clone(),
                    })
                    .await
            }
            StagedAction::PasswordChange { .. } | StagedAction::FundTransfer { .. } => {
                gateway
                    .verify_transaction_otp(&TransactionOtpRequest {
                        email: self.email.clone(),
                        otp: code.to_string(),
                    })
                    .await
            }
        }
    }

    /// Dismiss the flow and discard the staged action. In-flight responses
    /// cannot revive a cancelled flow: every transition checks the state
    /// first. No-op once completed.
    pub fn cancel(&mut self) {
        if self.state == StepUpState::Completed {
            return;
        }
        self.state = StepUpState::Cancelled;
        self.clear_payload();
        self.code.clear();
        self.last_error = None;
    }

    fn clear_payload(&mut self) {
        match &mut self.action {
            StagedAction::FundTransfer {
                receiver_id,
                amount,
                ..
            } => {
                receiver_id.clear();
                *amount = 0.0;
            }
            StagedAction::PasswordChange {
                old_password,
                new_password,
            } => {
                *old_password = SecretString::default();
                *new_password = SecretString::default();
            }
            StagedAction::Registration { password, .. } => {
                *password = SecretString::default();
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate_dispatch(&mut self, by: Duration) {
        self.dispatched_at = self.dispatched_at.and_then(|at| at.checked_sub(by));
    }
}
