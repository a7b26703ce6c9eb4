//! Marshaling backend of a C/C++ to C# binding generator.
//!
//! Given a model of native declarations (classes, functions, enums and
//! typedefs produced by a header parser), this library decides how every
//! value crosses the native/managed boundary and writes the C# source that
//! performs the crossing: layout mirrors, `DllImport` entry points, wrapper
//! methods and properties.
//!
//! # Quick Start
//!
//! ```ignore
//! use native_bridge::prelude::*;
//!
//! let library = Library::from_file("geometry.json")?;
//! let options = GeneratorOptions::from_file("bridge.toml")?;
//! for unit in native_bridge::generate_source(&library, &options)? {
//!     std::fs::write(format!("{}.cs", unit.name), &unit.source)?;
//! }
//! ```
//!
//! # Modules
//!
//! - [`model`] - Native declaration and type model
//! - [`marshal`] - Dual-direction marshalers and the type-override registry
//! - [`emit`] - C# declaration emitter
//! - [`config`] - Generator options
//!
//! # Feature Flags
//!
//! - `logging` - Enable library-level tracing (consumers provide their own subscriber)
//! - `cli` - Enable the command-line interface binary
//! - `full` - Enable all features

pub mod config;
pub mod emit;
mod logging;
pub mod marshal;
pub mod model;
pub mod prelude;

mod error;

// Re-export the unified error type
pub use error::{Error, Result};

pub use config::{ConfigError, GeneratorOptions};
pub use emit::{CallSite, Diagnostic, GenerateError, GeneratedUnit, Generator, Receiver};
pub use marshal::{
    FnOverride, MarshalContext, MarshalError, Marshaled, Marshaller, TemplateOverride,
    TypeOverride, TypeOverrides,
};
pub use model::{Library, ModelError};

/// Generate C# bindings for every translation unit of a library.
///
/// Type overrides declared in `options` are registered before generation.
/// Declarations that cannot be generated are reported in each unit's
/// diagnostics rather than failing the whole run.
pub fn generate_source(library: &Library, options: &GeneratorOptions) -> Result<Vec<GeneratedUnit>> {
    let overrides = TypeOverrides::from_templates(options.overrides.iter().cloned());
    generate_with_overrides(library, options, &overrides)
}

/// Like [`generate_source`], with a caller-built override registry.
///
/// Fails only when a namespace refers to a declaration missing from the
/// library.
pub fn generate_with_overrides(
    library: &Library,
    options: &GeneratorOptions,
    overrides: &TypeOverrides,
) -> Result<Vec<GeneratedUnit>> {
    for unit in library.units() {
        check_references(library, &unit.root)?;
    }
    Ok(Generator::new(library, options, overrides).generate())
}

fn check_references(library: &Library, namespace: &model::Namespace) -> Result<()> {
    for &id in &namespace.classes {
        library.class(id)?;
    }
    for &id in &namespace.enums {
        library.enumeration(id)?;
    }
    for &id in &namespace.typedefs {
        library.typedef(id)?;
    }
    for nested in &namespace.namespaces {
        check_references(library, nested)?;
    }
    Ok(())
}
