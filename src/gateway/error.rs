//! Error surface for gateway calls.

use thiserror::Error;

/// Errors returned by the remote action gateway.
///
/// `Api` carries the backend's structured error message; everything else is a
/// transport or decoding problem and is collapsed to a generic message before
/// it reaches the user.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend rejected the request and returned a structured error body.
    #[error("Request failed ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a usable response.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("Response error: {0}")]
    Parse(String),
}

impl GatewayError {
    /// HTTP status of an API rejection, when there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for direct display.
    ///
    /// API rejections surface the backend's message; transport and decoding
    /// failures fall back to a generic message so internals never leak into
    /// notifications.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            _ => "Something went wrong".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_surfaces_backend_message() {
        let err = GatewayError::Api {
            status: 400,
            message: "Invalid credentials".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid credentials");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn empty_api_message_falls_back() {
        let err = GatewayError::Api {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.user_message(), "Something went wrong");
    }

    #[test]
    fn parse_error_falls_back() {
        let err = GatewayError::Parse("bad json".to_string());
        assert_eq!(err.user_message(), "Something went wrong");
        assert_eq!(err.status(), None);
    }
}
