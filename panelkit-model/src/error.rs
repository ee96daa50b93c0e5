use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    EmptyReference,
    InvalidReference { reference: String, reason: String },
    UnsupportedScheme { reference: String, scheme: String },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::EmptyReference => write!(f, "empty media reference"),
            ModelError::InvalidReference { reference, reason } => {
                write!(f, "invalid media reference {reference}: {reason}")
            }
            ModelError::UnsupportedScheme { reference, scheme } => write!(
                f,
                "unsupported scheme {scheme:?} in media reference {reference}"
            ),
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
