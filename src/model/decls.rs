//! Declarations of the native model.
//!
//! Declarations are produced by an external parser and only read by the
//! engine. Names come in two flavours: `name` is the managed-facing
//! identifier, `original_name` is the native spelling used for field
//! offsets, entry points and diagnostics.

use serde::{Deserialize, Serialize};

use super::library::{ClassId, EnumId, TypedefId};
use super::types::{CallingConvention, Primitive, QualifiedType, Type};

/// Copy semantics of a class at the managed boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassKind {
    /// Copied by content (`struct`).
    ValueType,
    /// Represented by a handle to native-owned storage (`class`).
    #[default]
    RefType,
}

/// One entry of a class's base list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseClassSpecifier {
    pub ty: Type,
    /// Byte offset of the base subobject inside the derived class.
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub original_name: String,
    pub ty: QualifiedType,
    /// Byte offset relative to the declaring class.
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: impl Into<QualifiedType>, offset: u32) -> Self {
        let name = name.into();
        Self {
            original_name: name.clone(),
            name,
            ty: ty.into(),
            offset,
            ignore: false,
            comment: None,
        }
    }
}

/// Data-flow direction of a parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterUsage {
    #[default]
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterKind {
    #[default]
    Regular,
    /// Pointer to the caller-provided aggregate return slot. Never emitted
    /// as a managed parameter; its presence is carried by
    /// [`Function::has_hidden_struct_return`].
    HiddenStructureReturn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: QualifiedType,
    #[serde(default)]
    pub usage: ParameterUsage,
    #[serde(default)]
    pub kind: ParameterKind,
    /// Parameter added by the model rather than written in native source.
    #[serde(default)]
    pub synthesized: bool,
    #[serde(default)]
    pub ignore: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: impl Into<QualifiedType>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            usage: ParameterUsage::In,
            kind: ParameterKind::Regular,
            synthesized: false,
            ignore: false,
        }
    }

    pub fn with_usage(mut self, usage: ParameterUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn is_in(&self) -> bool {
        self.usage == ParameterUsage::In
    }

    /// Parameters that appear in the managed signature and the extern.
    pub fn is_generated(&self) -> bool {
        !self.ignore && self.kind == ParameterKind::Regular
    }
}

/// A class-level (static) variable exported by mangled symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub original_name: String,
    pub ty: QualifiedType,
    pub mangled: String,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLayout {
    /// Native size in bytes.
    pub size: u32,
    #[serde(default)]
    pub has_virtual_bases: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    pub original_name: String,
    #[serde(default)]
    pub namespace: Vec<String>,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_union: bool,
    #[serde(default)]
    pub is_incomplete: bool,
    #[serde(default)]
    pub is_opaque: bool,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub bases: Vec<BaseClassSpecifier>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub layout: ClassLayout,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub debug_text: Option<String>,
}

impl Class {
    pub fn new(name: impl Into<String>, kind: ClassKind, size: u32) -> Self {
        let name = name.into();
        Self {
            original_name: name.clone(),
            name,
            namespace: Vec::new(),
            kind,
            is_abstract: false,
            is_union: false,
            is_incomplete: false,
            is_opaque: false,
            ignore: false,
            bases: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            variables: Vec::new(),
            layout: ClassLayout {
                size,
                has_virtual_bases: false,
            },
            comment: None,
            debug_text: None,
        }
    }

    pub fn is_value_type(&self) -> bool {
        self.kind == ClassKind::ValueType
    }

    pub fn is_ref_type(&self) -> bool {
        self.kind == ClassKind::RefType
    }

    /// Managed dotted name, e.g. `Geometry.Point`.
    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name, ".")
    }

    /// Native spelling, e.g. `geometry::point`.
    pub fn native_qualified_name(&self) -> String {
        qualify(&self.namespace, &self.original_name, "::")
    }

    /// First base in declaration order; the only one that materializes as
    /// managed inheritance.
    pub fn primary_base(&self) -> Option<&BaseClassSpecifier> {
        self.bases.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumItem {
    pub name: String,
    pub value: i64,
    #[serde(default)]
    pub explicit_value: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumeration {
    pub name: String,
    pub original_name: String,
    #[serde(default)]
    pub namespace: Vec<String>,
    #[serde(default)]
    pub items: Vec<EnumItem>,
    #[serde(default = "default_underlying")]
    pub underlying: Primitive,
    #[serde(default)]
    pub is_flags: bool,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_underlying() -> Primitive {
    Primitive::Int32
}

impl Enumeration {
    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name, ".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedefDecl {
    pub name: String,
    pub original_name: String,
    #[serde(default)]
    pub namespace: Vec<String>,
    pub ty: QualifiedType,
    #[serde(default)]
    pub ignore: bool,
}

impl TypedefDecl {
    pub fn new(name: impl Into<String>, ty: impl Into<QualifiedType>) -> Self {
        let name = name.into();
        Self {
            original_name: name.clone(),
            name,
            namespace: Vec::new(),
            ty: ty.into(),
            ignore: false,
        }
    }

    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name, ".")
    }

    pub fn native_qualified_name(&self) -> String {
        qualify(&self.namespace, &self.original_name, "::")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTemplate {
    pub name: String,
    pub original_name: String,
    #[serde(default)]
    pub namespace: Vec<String>,
    pub templated_class: ClassId,
}

impl ClassTemplate {
    pub fn native_qualified_name(&self) -> String {
        qualify(&self.namespace, &self.original_name, "::")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub original_name: String,
    pub mangled: String,
    pub return_type: QualifiedType,
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default)]
    pub calling_convention: CallingConvention,
    #[serde(default)]
    pub has_hidden_struct_return: bool,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub debug_text: Option<String>,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: impl Into<QualifiedType>) -> Self {
        let name = name.into();
        Self {
            original_name: name.clone(),
            mangled: name.clone(),
            name,
            return_type: return_type.into(),
            params: Vec::new(),
            calling_convention: CallingConvention::Default,
            has_hidden_struct_return: false,
            ignore: false,
            comment: None,
            debug_text: None,
        }
    }

    pub fn with_param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Parameters that take part in the generated signatures.
    pub fn generated_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| p.is_generated())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodKind {
    #[default]
    Normal,
    Constructor,
    CopyConstructor,
    MoveConstructor,
    Destructor,
}

/// How a free function was turned into a class member, if at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodConversion {
    #[default]
    None,
    /// First native parameter becomes the receiver.
    FunctionToInstanceMethod,
    FunctionToStaticMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    #[serde(flatten)]
    pub function: Function,
    #[serde(default)]
    pub kind: MethodKind,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub conversion: MethodConversion,
}

impl Method {
    pub fn new(function: Function, kind: MethodKind) -> Self {
        Self {
            function,
            kind,
            is_static: false,
            conversion: MethodConversion::None,
        }
    }

    pub fn is_constructor(&self) -> bool {
        matches!(
            self.kind,
            MethodKind::Constructor | MethodKind::CopyConstructor | MethodKind::MoveConstructor
        )
    }

    pub fn is_copy_or_move_constructor(&self) -> bool {
        matches!(
            self.kind,
            MethodKind::CopyConstructor | MethodKind::MoveConstructor
        )
    }

    /// Whether the native entry point takes the object pointer implicitly.
    pub fn has_receiver(&self) -> bool {
        !self.is_static && self.conversion == MethodConversion::None
    }

    /// Whether the managed wrapper is an instance member.
    pub fn is_instance(&self) -> bool {
        !self.is_static && self.conversion != MethodConversion::FunctionToStaticMethod
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enums: Vec<EnumId>,
    #[serde(default)]
    pub typedefs: Vec<TypedefId>,
    #[serde(default)]
    pub classes: Vec<ClassId>,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub namespaces: Vec<Namespace>,
}

impl Namespace {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.enums.is_empty()
            && self.typedefs.is_empty()
            && self.classes.is_empty()
            && self.functions.is_empty()
            && self.namespaces.iter().all(Namespace::is_empty)
    }
}

/// One parsed header and the declarations it contributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub name: String,
    #[serde(default)]
    pub root: Namespace,
}

impl TranslationUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: Namespace::default(),
        }
    }
}

fn qualify(namespace: &[String], name: &str, separator: &str) -> String {
    let mut out = String::new();
    for segment in namespace {
        out.push_str(segment);
        out.push_str(separator);
    }
    out.push_str(name);
    out
}
