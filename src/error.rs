use thiserror::Error;

/// Everything that can go wrong while handling a user action.
///
/// None of these are fatal: the session shows them in the status line and
/// waits for the next action.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Please enter a YouTube link.")]
    Validation,

    #[error("Please search for a link before trying to download.")]
    Precondition,

    /// Non-success reply. Carries the `error` field of the JSON body when the
    /// service sent one.
    #[error("service error: {}", .0.as_deref().unwrap_or("no details"))]
    Service(Option<String>),

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("could not save settings: {0}")]
    Settings(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Network(format!("invalid reply from server: {}", err))
    }
}
