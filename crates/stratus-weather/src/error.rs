//! Weather service error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Unauthorized: API credential rejected")]
    Unauthorized { body: String },

    #[error("City not recognized: {0}")]
    InvalidCity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream API error (status {status})")]
    Upstream { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed upstream payload: {0}")]
    Decode(String),
}

impl WeatherError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized { .. } => {
                "The API key was rejected. Check your credential.".to_string()
            }
            Self::InvalidCity(city) => format!("No location matches \"{}\".", city),
            Self::NotFound(_) => "The requested resource was not found.".to_string(),
            Self::Upstream { status, .. } => {
                format!("The weather service returned an error (status {}).", status)
            }
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Decode(_) => "The weather service sent an unreadable response.".to_string(),
        }
    }

    /// Whether the failure was a credential rejection.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Whether a later attempt could plausibly succeed.
    ///
    /// Server-side failures and transport errors are transient; credential
    /// and input problems are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
