//! Native declaration and type model consumed by the marshaling engine.
//!
//! The model is produced by an external header parser; this crate only reads
//! it. It can be built programmatically with the `add_*` builders on
//! [`Library`] or loaded from JSON with [`Library::from_json`].

mod decls;
mod error;
mod library;
mod types;

pub use decls::{
    BaseClassSpecifier, Class, ClassKind, ClassLayout, ClassTemplate, EnumItem, Enumeration, Field,
    Function, Method, MethodConversion, MethodKind, Namespace, Parameter, ParameterKind,
    ParameterUsage, TranslationUnit, TypedefDecl, Variable,
};
pub use error::ModelError;
pub use library::{ClassId, EffectiveField, EnumId, Library, TemplateId, TypedefId};
pub use types::{
    ArraySize, CallingConvention, FunctionType, PointerKind, Primitive, QualifiedType, Qualifiers,
    Type,
};
