//! Unified error type for the native-bridge library.
//!
//! Wraps the per-area errors so callers can use a single [`Error`] and `?`
//! across model loading, configuration and generation.

use thiserror::Error;

use crate::config::ConfigError;
use crate::emit::GenerateError;
use crate::marshal::MarshalError;
use crate::model::ModelError;

/// Unified error type for all native-bridge operations.
///
/// # Example
///
/// ```ignore
/// use native_bridge::{GeneratorOptions, Library, Result};
///
/// fn bindings(model: &str) -> Result<String> {
///     let library = Library::from_file(model)?;
///     let units = native_bridge::generate_source(&library, &GeneratorOptions::default())?;
///     Ok(units.into_iter().map(|u| u.source).collect())
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Error reading or resolving the declaration model.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// No marshaling rule applies.
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// Declaration generation failed.
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// Invalid generator options.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A [`Result`] type alias using the unified [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` if this is a model error.
    pub fn is_model(&self) -> bool {
        matches!(self, Self::Model(_))
    }

    /// Returns `true` if this is a marshaling error.
    pub fn is_marshal(&self) -> bool {
        matches!(self, Self::Marshal(_))
    }

    /// Returns `true` if this is a generation error.
    pub fn is_generate(&self) -> bool {
        matches!(self, Self::Generate(_))
    }

    /// Returns `true` if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` if this is an I/O error.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Returns `true` if no marshaling rule exists for a type involved.
    pub fn is_unsupported(&self) -> bool {
        match self {
            Self::Marshal(e) => e.is_unsupported(),
            Self::Generate(e) => e.is_unsupported(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        let err: Error = MarshalError::unsupported("wchar_t").into();
        assert!(err.is_marshal());
        assert!(err.is_unsupported());
        assert!(!err.is_model());

        let err: Error = GenerateError::Unimplemented("union U".into()).into();
        assert!(err.is_generate());
        assert!(!err.is_unsupported());
    }
}
