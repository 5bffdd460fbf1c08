use thiserror::Error;

/// Failures that can end a catalog load.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, connect, timeout, body read).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP error! status: {status}")]
    Request { status: u16 },

    /// The body was not valid JSON.
    #[error("invalid JSON in response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Request { status } => Some(*status),
            _ => None,
        }
    }

    /// Short text meant for the error banner.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Network(_) => concat!(
                "Could not reach the character service. ",
                "Check your connection and retry."
            )
            .to_string(),
            FetchError::Request { status } => {
                format!("Could not load characters (HTTP status {status}).")
            }
            FetchError::Parse(_) => {
                "The character service returned an unreadable response.".to_string()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid endpoint {url:?}: {reason}")]
    Endpoint { url: String, reason: String },

    #[error("invalid user agent {0:?}: not a valid header value")]
    UserAgent(String),
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        ConfigError::Figment(Box::new(value))
    }
}
