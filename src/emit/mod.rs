//! C# declaration emitter.
//!
//! Drives both marshaling directions while writing whole translation units:
//! enums, delegates, classes with their layout mirrors and call sites, and
//! free functions.
//!
//! # Module Organization
//!
//! - [`writer`]: Indenting code writer
//! - [`ident`]: Identifier escaping and calling-convention mapping
//! - [`type_printer`]: Managed and native type spellings
//! - [`call`]: Extern declarations and call-site generation
//! - [`class`]: Class bodies, constructors, properties and methods
//! - [`unit`]: Translation units, namespaces, enums, delegates and free functions

mod call;
mod class;
pub mod ident;
pub mod type_printer;
mod unit;
pub mod writer;

use std::fmt;

use thiserror::Error;

use crate::config::GeneratorOptions;
use crate::logging::{info, warn};
use crate::marshal::{MarshalError, Marshaller, TypeOverrides};
use crate::model::{Library, ModelError, TranslationUnit};

use ident::Naming;
use type_printer::TypePrinter;

pub use call::{CallSite, Receiver};

/// Errors that abort generation of one declaration.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// Declaration kind acknowledged but not generated, e.g. unions.
    #[error("Not implemented: {0}")]
    Unimplemented(String),

    #[error("Formatting failed: {0}")]
    Fmt(#[from] fmt::Error),
}

impl GenerateError {
    /// Returns `true` if no marshaling rule exists for a type involved.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Marshal(e) if e.is_unsupported())
    }
}

/// A declaration that was omitted from the output, and why.
#[derive(Debug)]
pub struct Diagnostic {
    /// Native qualified name of the failing declaration.
    pub declaration: String,
    pub error: GenerateError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.declaration, self.error)
    }
}

/// Generated source for one translation unit.
#[derive(Debug)]
pub struct GeneratedUnit {
    pub name: String,
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

pub(crate) type Diagnostics = Vec<Diagnostic>;

pub(crate) fn record(diagnostics: &mut Diagnostics, declaration: String, error: GenerateError) {
    warn!(declaration = %declaration, error = %error, "declaration skipped");
    diagnostics.push(Diagnostic { declaration, error });
}

/// Generates C# bindings for a library.
pub struct Generator<'a> {
    pub(crate) library: &'a Library,
    pub(crate) options: &'a GeneratorOptions,
    pub(crate) overrides: &'a TypeOverrides,
    pub(crate) naming: Naming,
}

impl<'a> Generator<'a> {
    pub fn new(
        library: &'a Library,
        options: &'a GeneratorOptions,
        overrides: &'a TypeOverrides,
    ) -> Self {
        Self {
            library,
            options,
            overrides,
            naming: Naming::new(options.library_namespace()),
        }
    }

    pub fn marshaller(&self) -> Marshaller<'_> {
        Marshaller::new(self.library, self.overrides, &self.naming)
    }

    pub fn printer(&self) -> TypePrinter<'_> {
        TypePrinter::new(self.library, self.overrides, &self.naming)
    }

    /// Generate every translation unit of the library.
    pub fn generate(&self) -> Vec<GeneratedUnit> {
        self.library
            .units()
            .iter()
            .map(|unit| self.generate_unit(unit))
            .collect()
    }

    pub fn generate_unit(&self, unit: &TranslationUnit) -> GeneratedUnit {
        let mut diagnostics = Diagnostics::new();
        let source = self.emit_unit(unit, &mut diagnostics);
        info!(
            unit = %unit.name,
            diagnostics = diagnostics.len(),
            "translation unit generated"
        );
        GeneratedUnit {
            name: unit.name.clone(),
            source,
            diagnostics,
        }
    }
}
