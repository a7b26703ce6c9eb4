//! Spelling of native types in generated C#.
//!
//! A type is printed in one of two contexts: the managed surface seen by
//! binding users, or the native surface used by `Internal` layouts and
//! extern signatures.

use crate::marshal::{MarshalError, TypeOverrides};
use crate::model::{
    ArraySize, ClassId, Library, Parameter, ParameterUsage, PointerKind, Primitive, QualifiedType,
    Type,
};

use super::ident::Naming;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePrintContext {
    Managed,
    Native,
}

/// C# keyword for a primitive kind.
pub fn primitive_name(kind: Primitive) -> &'static str {
    match kind {
        Primitive::Void => "void",
        Primitive::Bool => "bool",
        Primitive::Char | Primitive::Int8 => "sbyte",
        Primitive::WideChar => "char",
        Primitive::UInt8 => "byte",
        Primitive::Int16 => "short",
        Primitive::UInt16 => "ushort",
        Primitive::Int32 => "int",
        Primitive::UInt32 => "uint",
        Primitive::Int64 => "long",
        Primitive::UInt64 => "ulong",
        Primitive::Float => "float",
        Primitive::Double => "double",
    }
}

fn native_primitive_spelling(kind: Primitive) -> &'static str {
    match kind {
        Primitive::Void => "void",
        Primitive::Bool => "bool",
        Primitive::Char => "char",
        Primitive::WideChar => "wchar_t",
        Primitive::Int8 => "int8_t",
        Primitive::UInt8 => "uint8_t",
        Primitive::Int16 => "int16_t",
        Primitive::UInt16 => "uint16_t",
        Primitive::Int32 => "int32_t",
        Primitive::UInt32 => "uint32_t",
        Primitive::Int64 => "int64_t",
        Primitive::UInt64 => "uint64_t",
        Primitive::Float => "float",
        Primitive::Double => "double",
    }
}

const INTPTR: &str = "System.IntPtr";

pub struct TypePrinter<'a> {
    library: &'a Library,
    overrides: &'a TypeOverrides,
    naming: &'a Naming,
}

impl<'a> TypePrinter<'a> {
    pub fn new(library: &'a Library, overrides: &'a TypeOverrides, naming: &'a Naming) -> Self {
        Self {
            library,
            overrides,
            naming,
        }
    }

    pub fn managed(&self, ty: &Type) -> Result<String, MarshalError> {
        self.print(ty, TypePrintContext::Managed)
    }

    pub fn native(&self, ty: &Type) -> Result<String, MarshalError> {
        self.print(ty, TypePrintContext::Native)
    }

    /// Managed parameter type including its `out`/`ref` modifier.
    pub fn managed_parameter(&self, param: &Parameter) -> Result<String, MarshalError> {
        let modifier = match param.usage {
            ParameterUsage::In => return self.managed(&param.ty.ty),
            ParameterUsage::Out => "out",
            ParameterUsage::InOut => "ref",
        };
        let inner = match self.library.pointee(&param.ty.ty)? {
            Some(pointee) => self.managed(&pointee.ty)?,
            None => self.managed(&param.ty.ty)?,
        };
        Ok(format!("{modifier} {inner}"))
    }

    /// Managed name of a class, qualified with the library namespace.
    pub fn class_name(&self, id: ClassId) -> Result<String, MarshalError> {
        let class = self.library.class(id)?;
        Ok(self.naming.qualified(&class.qualified_name()))
    }

    pub fn print(&self, ty: &Type, ctx: TypePrintContext) -> Result<String, MarshalError> {
        match ty {
            Type::Primitive(kind) => Ok(primitive_name(*kind).to_string()),
            Type::Pointer { pointee, .. } => self.print_pointer(ty, pointee, ctx),
            Type::Array { element, .. } => match ctx {
                TypePrintContext::Managed => Ok(format!("{}[]", self.print(&element.ty, ctx)?)),
                TypePrintContext::Native => Ok(format!("{}*", self.print(&element.ty, ctx)?)),
            },
            Type::Function(_) => Err(MarshalError::unsupported(self.describe(ty))),
            Type::Typedef(id) => {
                let typedef = self.library.typedef(*id)?;
                if let Some(strategy) = self.overrides.get(&typedef.native_qualified_name()) {
                    return Ok(match ctx {
                        TypePrintContext::Managed => strategy.managed_type().to_string(),
                        TypePrintContext::Native => strategy.native_type().to_string(),
                    });
                }
                if self.library.pointee_function(&typedef.ty.ty)?.is_some() {
                    return Ok(match ctx {
                        TypePrintContext::Managed => self.naming.qualified(&typedef.qualified_name()),
                        TypePrintContext::Native => INTPTR.to_string(),
                    });
                }
                self.print(&typedef.ty.ty, ctx)
            }
            Type::Enum(id) => {
                let enumeration = self.library.enumeration(*id)?;
                Ok(match ctx {
                    TypePrintContext::Managed => {
                        self.naming.qualified(&enumeration.qualified_name())
                    }
                    TypePrintContext::Native => primitive_name(enumeration.underlying).to_string(),
                })
            }
            Type::Tag(id) => self.print_class(*id, ctx),
            Type::TemplateSpecialization { template, .. } => {
                let template = self.library.template(*template)?;
                if let Some(strategy) = self.overrides.get(&template.native_qualified_name()) {
                    return Ok(match ctx {
                        TypePrintContext::Managed => strategy.managed_type().to_string(),
                        TypePrintContext::Native => strategy.native_type().to_string(),
                    });
                }
                self.print_class(template.templated_class, ctx)
            }
            Type::TemplateParameter(name) => Ok(name.clone()),
            Type::MemberPointer => Err(MarshalError::unsupported(self.describe(ty))),
        }
    }

    fn print_class(&self, id: ClassId, ctx: TypePrintContext) -> Result<String, MarshalError> {
        let class = self.library.class(id)?;
        if class.is_ref_type()
            && let Some(strategy) = self.overrides.get(&class.native_qualified_name())
        {
            return Ok(match ctx {
                TypePrintContext::Managed => strategy.managed_type().to_string(),
                TypePrintContext::Native => strategy.native_type().to_string(),
            });
        }
        let name = self.class_name(id)?;
        Ok(match ctx {
            TypePrintContext::Managed => name,
            TypePrintContext::Native => format!("{name}.Internal"),
        })
    }

    fn print_pointer(
        &self,
        ty: &Type,
        pointee: &QualifiedType,
        ctx: TypePrintContext,
    ) -> Result<String, MarshalError> {
        let desugared = self.library.desugar(&pointee.ty)?;
        match (ctx, desugared) {
            (_, Type::MemberPointer) => Err(MarshalError::unsupported(self.describe(ty))),

            (TypePrintContext::Managed, Type::Primitive(kind)) if kind.is_character() => {
                Ok("string".to_string())
            }
            (TypePrintContext::Managed, Type::Function(_)) => {
                match self.library.delegate_for(ty)? {
                    Some(id) => {
                        let typedef = self.library.typedef(id)?;
                        Ok(self.naming.qualified(&typedef.qualified_name()))
                    }
                    None => Ok(INTPTR.to_string()),
                }
            }
            (TypePrintContext::Managed, Type::Tag(_) | Type::TemplateSpecialization { .. }) => {
                self.print(&pointee.ty, ctx)
            }
            (TypePrintContext::Managed, Type::TemplateParameter(name)) => Ok(name.clone()),
            (TypePrintContext::Managed, _) => Ok(INTPTR.to_string()),

            (TypePrintContext::Native, Type::Primitive(Primitive::Void)) => Ok("void*".to_string()),
            (TypePrintContext::Native, Type::Primitive(kind)) if kind.is_character() => {
                Ok(INTPTR.to_string())
            }
            (TypePrintContext::Native, Type::Primitive(kind)) => {
                Ok(format!("{}*", primitive_name(*kind)))
            }
            (TypePrintContext::Native, Type::Pointer { .. } | Type::Enum(_)) => {
                Ok(format!("{}*", self.print(desugared, ctx)?))
            }
            (TypePrintContext::Native, _) => Ok(INTPTR.to_string()),
        }
    }

    /// Native C++ spelling, for diagnostics.
    pub fn describe(&self, ty: &Type) -> String {
        match ty {
            Type::Primitive(kind) => native_primitive_spelling(*kind).to_string(),
            Type::Pointer { pointee, kind } => {
                let sigil = match kind {
                    PointerKind::Pointer => "*",
                    PointerKind::LValueReference => "&",
                    PointerKind::RValueReference => "&&",
                };
                format!("{}{sigil}", self.describe_qualified(pointee))
            }
            Type::Array { element, size } => match size {
                ArraySize::Constant(n) => format!("{}[{n}]", self.describe_qualified(element)),
                ArraySize::Variable | ArraySize::Incomplete => {
                    format!("{}[]", self.describe_qualified(element))
                }
            },
            Type::Function(function) => {
                let params: Vec<String> = function
                    .params
                    .iter()
                    .map(|p| self.describe_qualified(p))
                    .collect();
                format!(
                    "{}({})",
                    self.describe_qualified(&function.return_type),
                    params.join(", ")
                )
            }
            Type::Typedef(id) => self
                .library
                .typedef(*id)
                .map(|t| t.native_qualified_name())
                .unwrap_or_else(|_| id.to_string()),
            Type::Enum(id) => self
                .library
                .enumeration(*id)
                .map(|e| e.original_name.clone())
                .unwrap_or_else(|_| id.to_string()),
            Type::Tag(id) => self
                .library
                .class(*id)
                .map(|c| c.native_qualified_name())
                .unwrap_or_else(|_| id.to_string()),
            Type::TemplateSpecialization { template, args } => {
                let name = self
                    .library
                    .template(*template)
                    .map(|t| t.native_qualified_name())
                    .unwrap_or_else(|_| template.to_string());
                let args: Vec<String> = args.iter().map(|a| self.describe_qualified(a)).collect();
                format!("{name}<{}>", args.join(", "))
            }
            Type::TemplateParameter(name) => name.clone(),
            Type::MemberPointer => "member pointer".to_string(),
        }
    }

    fn describe_qualified(&self, ty: &QualifiedType) -> String {
        let base = self.describe(&ty.ty);
        if ty.qualifiers.is_const {
            format!("const {base}")
        } else {
            base
        }
    }
}
