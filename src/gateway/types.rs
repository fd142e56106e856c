//! Request and response payloads for the MintFiat API. Several of these carry
//! credentials or one-time codes, so they must never be logged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fiat currencies tracked per account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
}

impl fmt::Display for Currency {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        };
        write!(formatter, "{code}")
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

/// Per-currency balances as reported by the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct Balances {
    #[serde(default)]
    pub usd: f64,
    #[serde(default)]
    pub eur: f64,
    #[serde(default)]
    pub gbp: f64,
}

impl Balances {
    #[must_use]
    pub fn get(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Usd => self.usd,
            Currency::Eur => self.eur,
            Currency::Gbp => self.gbp,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SignupRequest {
    pub email: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerifyEmailOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRegistrationRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_id: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct TransactionOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFiatRequest {
    pub receiver_id: String,
    pub currency: Currency,
    pub amount: f64,
}

/// Acknowledgment that a one-time code was dispatched to the user's email.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchAck {
    pub accepted: bool,
    #[serde(default)]
    pub dispatch_status: String,
}

/// Identity and profile fields returned by signin and session rehydration.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub balances: Balances,
}
