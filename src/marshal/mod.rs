//! Type-directed marshaling between native and managed representations.
//!
//! Each direction is a single exhaustive match over [`Type`]. A marshal call
//! receives an immutable [`MarshalContext`] describing the site and returns a
//! [`Marshaled`] accumulator that the caller splices into its output.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for marshaling
//! - [`overrides`]: Registry of custom per-type strategies
//! - [`to_managed`]: Native to managed direction
//! - [`to_native`]: Managed to native direction, including by-value class flattening

mod error;
mod overrides;
mod to_managed;
mod to_native;

pub use error::MarshalError;
pub use overrides::{FnOverride, OverrideKey, TemplateOverride, TypeOverride, TypeOverrides};

use crate::emit::ident::Naming;
use crate::emit::type_printer::TypePrinter;
use crate::model::{Function, Library, Method, Parameter, QualifiedType, Type};

/// Description of one marshaling site.
///
/// Created by the emitter for a single return value, parameter, field or
/// property accessor and dropped once its [`Marshaled`] output is spliced.
#[derive(Debug, Clone)]
pub struct MarshalContext<'a> {
    /// The value being converted: the native storage location when
    /// marshaling to managed, the managed expression when marshaling to
    /// native.
    pub value: String,
    /// Temporary the converted value is bound to at the call site. Cleanup
    /// statements refer to this name.
    pub arg_name: String,
    /// Declared type at the site, before any typedef is stripped.
    pub declared: &'a QualifiedType,
    pub parameter: Option<&'a Parameter>,
    pub function: Option<&'a Function>,
    pub method: Option<&'a Method>,
    pub param_index: usize,
    /// Next free temporary-name index.
    pub cursor: u32,
}

impl<'a> MarshalContext<'a> {
    /// Context reading the native value stored at `return_var_name`.
    pub fn to_managed(return_var_name: impl Into<String>, declared: &'a QualifiedType) -> Self {
        Self {
            value: return_var_name.into(),
            arg_name: String::new(),
            declared,
            parameter: None,
            function: None,
            method: None,
            param_index: 0,
            cursor: 0,
        }
    }

    /// Context converting the managed value `parameter_name`, bound to
    /// `arg_name` at the call site.
    pub fn to_native(
        parameter_name: impl Into<String>,
        arg_name: impl Into<String>,
        declared: &'a QualifiedType,
    ) -> Self {
        Self {
            value: parameter_name.into(),
            arg_name: arg_name.into(),
            declared,
            parameter: None,
            function: None,
            method: None,
            param_index: 0,
            cursor: 0,
        }
    }

    pub fn with_parameter(mut self, parameter: &'a Parameter, index: usize) -> Self {
        self.parameter = Some(parameter);
        self.param_index = index;
        self
    }

    pub fn with_function(mut self, function: &'a Function) -> Self {
        self.function = Some(function);
        self
    }

    pub fn with_method(mut self, method: &'a Method) -> Self {
        self.function = Some(&method.function);
        self.method = Some(method);
        self
    }

    pub fn with_cursor(mut self, cursor: u32) -> Self {
        self.cursor = cursor;
        self
    }
}

/// Output of one marshal call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marshaled {
    /// Statements that must run before the expression is evaluated.
    pub before: Vec<String>,
    /// Converted expression; empty when nothing needs to be produced.
    pub expr: String,
    /// Statements that must run after the native call returns.
    pub cleanup: Vec<String>,
    /// Next free temporary-name index after this call.
    pub cursor: u32,
    /// Whether the converted type is passed by value.
    pub is_value_type: bool,
}

impl Marshaled {
    pub fn empty(cursor: u32) -> Self {
        Self {
            cursor,
            ..Self::default()
        }
    }

    pub fn expr(expr: impl Into<String>, cursor: u32) -> Self {
        Self {
            expr: expr.into(),
            cursor,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.expr.is_empty()
    }
}

/// One call-site argument: the generated name, the parameter it came from,
/// and the marshal output used to produce it.
#[derive(Debug, Clone)]
pub struct ParamMarshal<'a> {
    pub name: String,
    pub param: &'a Parameter,
    pub marshaled: Option<Marshaled>,
}

/// Dual-direction marshaler over one library.
///
/// The native to managed direction lives in `to_managed.rs`, the managed to
/// native direction in `to_native.rs`.
pub struct Marshaller<'a> {
    pub(crate) library: &'a Library,
    pub(crate) overrides: &'a TypeOverrides,
    pub(crate) naming: &'a Naming,
}

impl<'a> Marshaller<'a> {
    pub fn new(library: &'a Library, overrides: &'a TypeOverrides, naming: &'a Naming) -> Self {
        Self {
            library,
            overrides,
            naming,
        }
    }

    pub(crate) fn printer(&self) -> TypePrinter<'a> {
        TypePrinter::new(self.library, self.overrides, self.naming)
    }

    /// Native spelling of a type, used in error messages.
    pub(crate) fn describe(&self, ty: &Type) -> String {
        self.printer().describe(ty)
    }

    /// Whether the declared type at a site is a pointer once typedefs are
    /// stripped.
    pub(crate) fn declared_is_pointer(&self, ctx: &MarshalContext<'_>) -> Result<bool, MarshalError> {
        Ok(self.library.is_pointer(&ctx.declared.ty)?)
    }
}
