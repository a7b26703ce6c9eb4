//! Convenient re-exports for common usage patterns.
//!
//! # Example
//!
//! ```ignore
//! use native_bridge::prelude::*;
//!
//! let library = Library::from_json(&model)?;
//! let options = GeneratorOptions::new("Geometry");
//! let overrides = TypeOverrides::from_templates(options.overrides.clone());
//! let units = Generator::new(&library, &options, &overrides).generate();
//! ```

// Unified error handling
pub use crate::error::{Error, Result};

pub use crate::config::{ConfigError, GeneratorOptions};
pub use crate::emit::{CallSite, Diagnostic, GenerateError, GeneratedUnit, Generator, Receiver};
pub use crate::marshal::{
    FnOverride, MarshalContext, MarshalError, Marshaled, Marshaller, TemplateOverride,
    TypeOverride, TypeOverrides,
};
pub use crate::model::{
    Class, ClassId, ClassKind, Enumeration, Field, Function, Library, Method, MethodKind,
    ModelError, Namespace, Parameter, ParameterUsage, Primitive, QualifiedType, TranslationUnit,
    Type, TypedefDecl,
};
pub use crate::{generate_source, generate_with_overrides};
