//! Native to managed marshaling.
//!
//! Produces the expression that reads a native value (return value, field
//! storage, out parameter) and yields its managed equivalent.

use crate::logging::{debug, trace};
use crate::model::{ClassId, Primitive, QualifiedType, Type, TypedefId};

use super::{MarshalContext, MarshalError, Marshaled, Marshaller};

impl Marshaller<'_> {
    /// Marshal the native value named by `ctx.value` to managed.
    pub fn to_managed(&self, ctx: &MarshalContext<'_>) -> Result<Marshaled, MarshalError> {
        self.to_managed_type(&ctx.declared.ty, ctx)
    }

    fn to_managed_type(
        &self,
        ty: &Type,
        ctx: &MarshalContext<'_>,
    ) -> Result<Marshaled, MarshalError> {
        match ty {
            Type::Primitive(kind) => self.primitive_to_managed(*kind, ctx),
            Type::Pointer { pointee, .. } => self.pointer_to_managed(ty, pointee, ctx),
            // Element counts are not known here, so arrays stay unmaterialized.
            Type::Array { .. } => Ok(Marshaled::expr("null", ctx.cursor)),
            Type::Function(_) => Err(MarshalError::unsupported(self.describe(ty))),
            Type::Typedef(id) => self.typedef_to_managed(*id, ctx),
            Type::Enum(id) => {
                let enumeration = self.library.enumeration(*id)?;
                let name = self.naming.qualified(&enumeration.qualified_name());
                Ok(Marshaled::expr(format!("({name}) {}", ctx.value), ctx.cursor))
            }
            Type::Tag(id) => self.class_to_managed(*id, ctx),
            Type::TemplateSpecialization { template, .. } => {
                let template = self.library.template(*template)?;
                if let Some(strategy) = self.overrides.get(&template.native_qualified_name()) {
                    debug!(template = %template.native_qualified_name(), "override hit");
                    let mut marshaled = strategy.to_managed(ctx)?;
                    marshaled.is_value_type = strategy.is_value_type();
                    return Ok(marshaled);
                }
                self.class_to_managed(template.templated_class, ctx)
            }
            Type::TemplateParameter(_) | Type::MemberPointer => {
                Err(MarshalError::unsupported(self.describe(ty)))
            }
        }
    }

    fn primitive_to_managed(
        &self,
        kind: Primitive,
        ctx: &MarshalContext<'_>,
    ) -> Result<Marshaled, MarshalError> {
        match kind {
            Primitive::Void => Ok(Marshaled::empty(ctx.cursor)),
            Primitive::WideChar => Err(MarshalError::unsupported(self.describe(&Type::Primitive(kind)))),
            Primitive::Bool
            | Primitive::Char
            | Primitive::Int8
            | Primitive::UInt8
            | Primitive::Int16
            | Primitive::UInt16
            | Primitive::Int32
            | Primitive::UInt32
            | Primitive::Int64
            | Primitive::UInt64
            | Primitive::Float
            | Primitive::Double => {
                let mut marshaled = Marshaled::expr(ctx.value.clone(), ctx.cursor);
                marshaled.is_value_type = true;
                Ok(marshaled)
            }
        }
    }

    fn pointer_to_managed(
        &self,
        ty: &Type,
        pointee: &QualifiedType,
        ctx: &MarshalContext<'_>,
    ) -> Result<Marshaled, MarshalError> {
        let value = &ctx.value;
        match self.library.desugar(&pointee.ty)? {
            Type::Primitive(Primitive::Char) => Ok(Marshaled::expr(
                format!("Marshal.PtrToStringAnsi({value})"),
                ctx.cursor,
            )),
            Type::Primitive(Primitive::WideChar) => Ok(Marshaled::expr(
                format!("Marshal.PtrToStringUni({value})"),
                ctx.cursor,
            )),
            Type::Primitive(_) | Type::Pointer { .. } | Type::Enum(_) | Type::Array { .. } => Ok(
                Marshaled::expr(format!("new System.IntPtr({value})"), ctx.cursor),
            ),
            Type::Function(_) => {
                let delegate = match self.library.delegate_for(&ctx.declared.ty)? {
                    Some(id) => Some(id),
                    None => self.library.delegate_for(ty)?,
                };
                match delegate {
                    Some(id) => self.delegate_to_managed(id, ctx),
                    None => Err(MarshalError::unsupported(format!(
                        "{} (no delegate typedef)",
                        self.describe(ty)
                    ))),
                }
            }
            Type::Tag(_) | Type::TemplateSpecialization { .. } => {
                self.to_managed_type(&pointee.ty, ctx)
            }
            Type::Typedef(_) | Type::TemplateParameter(_) | Type::MemberPointer => {
                Err(MarshalError::unsupported(self.describe(ty)))
            }
        }
    }

    fn typedef_to_managed(
        &self,
        id: TypedefId,
        ctx: &MarshalContext<'_>,
    ) -> Result<Marshaled, MarshalError> {
        let typedef = self.library.typedef(id)?;
        if let Some(strategy) = self.overrides.get(&typedef.native_qualified_name()) {
            debug!(typedef = %typedef.native_qualified_name(), "override hit");
            let mut marshaled = strategy.to_managed(ctx)?;
            marshaled.is_value_type = strategy.is_value_type();
            return Ok(marshaled);
        }
        if self.library.pointee_function(&typedef.ty.ty)?.is_some() {
            return self.delegate_to_managed(id, ctx);
        }
        self.to_managed_type(&typedef.ty.ty, ctx)
    }

    fn delegate_to_managed(
        &self,
        id: TypedefId,
        ctx: &MarshalContext<'_>,
    ) -> Result<Marshaled, MarshalError> {
        let typedef = self.library.typedef(id)?;
        let name = self.naming.qualified(&typedef.qualified_name());
        Ok(Marshaled::expr(
            format!(
                "({name}) Marshal.GetDelegateForFunctionPointer({}, typeof({name}))",
                ctx.value
            ),
            ctx.cursor,
        ))
    }

    /// Wrap a native address as a managed instance.
    ///
    /// Reference types allocate a wrapper around the handle; value types are
    /// initialized in place from the native block. When the declared type is
    /// not a pointer the address of the native value is taken.
    fn class_to_managed(
        &self,
        id: ClassId,
        ctx: &MarshalContext<'_>,
    ) -> Result<Marshaled, MarshalError> {
        let class = self.library.class(id)?;
        if class.is_ref_type()
            && let Some(strategy) = self.overrides.get(&class.native_qualified_name())
        {
            debug!(class = %class.native_qualified_name(), "override hit");
            let mut marshaled = strategy.to_managed(ctx)?;
            marshaled.is_value_type = strategy.is_value_type();
            return Ok(marshaled);
        }

        let name = self.printer().class_name(id)?;
        let address = if self.declared_is_pointer(ctx)? {
            ctx.value.clone()
        } else {
            format!("new System.IntPtr(&{})", ctx.value)
        };
        trace!(class = %name, "wrapping native address");
        let mut marshaled = Marshaled::expr(format!("new {name}({address})"), ctx.cursor);
        marshaled.is_value_type = class.is_value_type();
        Ok(marshaled)
    }
}
