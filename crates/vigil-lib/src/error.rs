//! Error types at the library boundaries

use crate::models::Category;
use thiserror::Error;

/// Rejection of client-submitted input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("message text is empty")]
    Empty,

    #[error("message text exceeds {max} characters")]
    TooLarge { max: usize },

    #[error("registration lists more than {max} capabilities")]
    TooManyCapabilities { max: usize },

    #[error("unrecognized message kind: {0}")]
    UnknownKind(String),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl InputError {
    /// Machine-readable reason code returned to clients
    pub fn code(&self) -> &'static str {
        match self {
            InputError::Empty => "EMPTY_MESSAGE",
            InputError::TooLarge { .. } => "PAYLOAD_TOO_LARGE",
            InputError::TooManyCapabilities { .. } => "TOO_MANY_CAPABILITIES",
            InputError::UnknownKind(_) => "UNKNOWN_KIND",
            InputError::Malformed(_) => "MALFORMED_BODY",
        }
    }
}

/// Failure to read one category during snapshot capture
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("{category} monitor unavailable: {reason}")]
    Unavailable { category: Category, reason: String },

    #[error("{category} monitor panicked during read")]
    Panicked { category: Category },
}

impl SourceError {
    pub fn category(&self) -> Category {
        match self {
            SourceError::Unavailable { category, .. } | SourceError::Panicked { category } => {
                *category
            }
        }
    }
}

/// Snapshot capture failure
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no category could be read ({} failures)", .0.len())]
    NoCategories(Vec<SourceError>),
}
