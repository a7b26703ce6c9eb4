//! Error types for model lookups and loading.

use thiserror::Error;

use super::library::{ClassId, EnumId, TemplateId, TypedefId};

/// Errors raised while reading the declaration model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unknown class {0}")]
    MissingClass(ClassId),

    #[error("Unknown enumeration {0}")]
    MissingEnum(EnumId),

    #[error("Unknown typedef {0}")]
    MissingTypedef(TypedefId),

    #[error("Unknown class template {0}")]
    MissingTemplate(TemplateId),

    #[error("Cyclic inheritance through class '{class}'")]
    CyclicInheritance { class: String },

    #[error("Typedef chain never resolves: {0}")]
    CyclicTypedef(String),

    #[error("Invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read model: {0}")]
    Io(#[from] std::io::Error),
}
