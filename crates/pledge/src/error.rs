//! A stock rejection reason for callers that do not carry their own error
//! type.

use thiserror::Error;

/// Plain-text rejection reason.
///
/// The engine is generic over the rejection type; this is the off-the-shelf
/// choice when all a caller needs is a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Reason(pub String);

impl Reason {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for Reason {
    fn from(message: &str) -> Self {
        Self(message.to_owned())
    }
}

impl From<String> for Reason {
    fn from(message: String) -> Self {
        Self(message)
    }
}
