//! Type nodes of the native model.
//!
//! Types form a closed sum: every consumer matches exhaustively, so adding a
//! new kind is a compile error everywhere it is not yet handled.

use serde::{Deserialize, Serialize};

use super::library::{ClassId, EnumId, TemplateId, TypedefId};

/// Builtin native scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Primitive {
    Void,
    Bool,
    Char,
    WideChar,
    Int8,
    #[serde(rename = "uint8")]
    UInt8,
    Int16,
    #[serde(rename = "uint16")]
    UInt16,
    Int32,
    #[serde(rename = "uint32")]
    UInt32,
    Int64,
    #[serde(rename = "uint64")]
    UInt64,
    Float,
    Double,
}

impl Primitive {
    /// Every primitive kind, in declaration order.
    pub const ALL: [Primitive; 14] = [
        Primitive::Void,
        Primitive::Bool,
        Primitive::Char,
        Primitive::WideChar,
        Primitive::Int8,
        Primitive::UInt8,
        Primitive::Int16,
        Primitive::UInt16,
        Primitive::Int32,
        Primitive::UInt32,
        Primitive::Int64,
        Primitive::UInt64,
        Primitive::Float,
        Primitive::Double,
    ];

    /// Returns `true` for kinds whose bits are shared verbatim by both sides.
    pub fn is_identity_marshaled(&self) -> bool {
        !matches!(self, Primitive::Void | Primitive::WideChar)
    }

    /// Returns `true` for character kinds (`char`, `wchar_t`).
    pub fn is_character(&self) -> bool {
        matches!(self, Primitive::Char | Primitive::WideChar)
    }
}

/// `const` / `volatile` qualifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Qualifiers {
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub is_volatile: bool,
}

/// A type together with its qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedType {
    pub ty: Type,
    #[serde(default)]
    pub qualifiers: Qualifiers,
}

impl QualifiedType {
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            qualifiers: Qualifiers::default(),
        }
    }

    pub fn constant(ty: Type) -> Self {
        Self {
            ty,
            qualifiers: Qualifiers {
                is_const: true,
                is_volatile: false,
            },
        }
    }
}

impl From<Type> for QualifiedType {
    fn from(ty: Type) -> Self {
        Self::new(ty)
    }
}

/// How a pointer-like type refers to its pointee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PointerKind {
    #[default]
    Pointer,
    LValueReference,
    RValueReference,
}

/// Array extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArraySize {
    Constant(u64),
    Variable,
    Incomplete,
}

/// Native calling conventions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallingConvention {
    #[default]
    Default,
    C,
    StdCall,
    ThisCall,
    FastCall,
}

/// Signature of a native function type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionType {
    pub return_type: Box<QualifiedType>,
    #[serde(default)]
    pub params: Vec<QualifiedType>,
    #[serde(default)]
    pub calling_convention: CallingConvention,
}

/// A native type node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Type {
    Primitive(Primitive),
    Pointer {
        pointee: Box<QualifiedType>,
        #[serde(default)]
        kind: PointerKind,
    },
    Array {
        element: Box<QualifiedType>,
        size: ArraySize,
    },
    Function(FunctionType),
    Typedef(TypedefId),
    Enum(EnumId),
    Tag(ClassId),
    TemplateSpecialization {
        template: TemplateId,
        #[serde(default)]
        args: Vec<QualifiedType>,
    },
    TemplateParameter(String),
    MemberPointer,
}

impl Type {
    pub fn primitive(kind: Primitive) -> Self {
        Type::Primitive(kind)
    }

    /// Plain `T*` over the given pointee.
    pub fn pointer_to(pointee: impl Into<QualifiedType>) -> Self {
        Type::Pointer {
            pointee: Box::new(pointee.into()),
            kind: PointerKind::Pointer,
        }
    }

    /// `T&` over the given pointee.
    pub fn reference_to(pointee: impl Into<QualifiedType>) -> Self {
        Type::Pointer {
            pointee: Box::new(pointee.into()),
            kind: PointerKind::LValueReference,
        }
    }

    /// Returns `true` for pointers and references, without walking typedefs.
    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer { .. })
    }

    /// Returns `true` for `void`, without walking typedefs.
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Void))
    }

    /// Pointee of a pointer, without walking typedefs.
    pub fn pointee(&self) -> Option<&QualifiedType> {
        match self {
            Type::Pointer { pointee, .. } => Some(pointee),
            _ => None,
        }
    }
}
