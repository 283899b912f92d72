//! Client-side data layer for the single-page frontend.
//!
//! [`ApiClient`] speaks the REST API, [`ClientCache`] holds the fetched
//! collections and refetches them after mutations, and [`filter`] derives
//! the searchable, sorted views and summary statistics shown on screen.

mod api;
mod cache;
pub mod filter;

pub use api::*;
pub use cache::*;
pub use filter::StatusFilter;

/// Error raised by client-side API calls.
#[derive(Debug)]
pub enum ClientError {
    /// The server base URL could not be parsed
    InvalidUrl(String),
    /// Transport or decoding failure
    Http(reqwest::Error),
    /// The server answered with an error envelope
    Api {
        status: u16,
        code: String,
        message: String,
    },
}

impl ClientError {
    /// HTTP status of an API error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::InvalidUrl(_) => None,
            ClientError::Http(err) => err.status().map(|s| s.as_u16()),
            ClientError::Api { status, .. } => Some(*status),
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::InvalidUrl(url) => write!(f, "Invalid base URL: {}", url),
            ClientError::Http(err) => write!(f, "HTTP error: {}", err),
            ClientError::Api {
                status,
                code,
                message,
            } => write!(f, "{} {}: {}", status, code, message),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Http(err) => Some(err),
            ClientError::InvalidUrl(_) | ClientError::Api { .. } => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err)
    }
}
