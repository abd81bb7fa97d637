use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The document store rejected or failed a read/write.
    #[error("store error: {0}")]
    Store(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A geocoding, reverse-geocoding or nearby-search provider failed.
    #[error("geocoding failed: {0}")]
    Geocode(String),

    #[error("could not determine location: {0}")]
    Geolocation(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn invalid<S: Into<String>>(s: S) -> Self {
        Self::InvalidInput(s.into())
    }

    /// The message shown to the user when this error surfaces from an operation.
    ///
    /// Nothing is retried; the caller keeps whatever it was displaying before.
    pub fn notice(&self) -> Notice {
        let message = match self {
            Self::Store(_) | Self::Io(_) | Self::Json(_) => "Could not save your changes.",
            Self::NotFound(_) => "That item no longer exists.",
            Self::InvalidInput(msg) => return Notice(msg.clone()),
            Self::Geocode(_) => "Could not look up that location.",
            Self::Geolocation(_) => "Could not determine your current location.",
            Self::Http(_) => "Network request failed.",
            Self::Config(_) => "The app is misconfigured.",
        };
        Notice(message.to_string())
    }
}

/// A user-visible message an operation failure was converted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice(pub String);

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Error> for Notice {
    fn from(e: Error) -> Self {
        tracing::warn!("operation failed: {}", e);
        e.notice()
    }
}
