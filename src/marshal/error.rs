//! Error types for marshaling.

use thiserror::Error;

use crate::model::ModelError;

/// Errors that abort marshaling of one declaration.
#[derive(Error, Debug)]
pub enum MarshalError {
    /// No rule maps the type, e.g. `wchar_t` or a member pointer.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A conversion ran but produced no expression.
    #[error("Marshaling '{0}' produced no expression")]
    UnresolvedMarshal(String),

    /// Native feature acknowledged but not implemented, e.g. array copies.
    #[error("Not implemented: {0}")]
    Unimplemented(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl MarshalError {
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::UnsupportedType(what.into())
    }

    /// Returns `true` if no marshaling rule exists for the type.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedType(_))
    }
}
