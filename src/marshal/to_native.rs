//! Managed to native marshaling.
//!
//! Produces the native-representation expression for a managed value, plus
//! the statements that must run before it (allocations, field copies) and
//! after the native call (deallocations).

use crate::emit::ident::{INSTANCE_IDENTIFIER, safe_identifier};
use crate::emit::type_printer::primitive_name;
use crate::logging::{debug, trace};
use crate::model::{ClassId, MethodConversion, Primitive, QualifiedType, Type, TypedefId};

use super::{MarshalContext, MarshalError, Marshaled, Marshaller};

impl Marshaller<'_> {
    /// Marshal the managed value named by `ctx.value` to native.
    pub fn to_native(&self, ctx: &MarshalContext<'_>) -> Result<Marshaled, MarshalError> {
        self.to_native_type(&ctx.declared.ty, ctx)
    }

    fn to_native_type(
        &self,
        ty: &Type,
        ctx: &MarshalContext<'_>,
    ) -> Result<Marshaled, MarshalError> {
        match ty {
            Type::Primitive(kind) => self.primitive_to_native(*kind, ctx),
            Type::Pointer { pointee, .. } => self.pointer_to_native(ty, pointee, ctx),
            Type::Array { .. } => Err(MarshalError::Unimplemented(format!(
                "array marshaling of {}",
                self.describe(ty)
            ))),
            Type::Function(_) | Type::MemberPointer => {
                Err(MarshalError::unsupported(self.describe(ty)))
            }
            Type::Typedef(id) => self.typedef_to_native(*id, ctx),
            Type::Enum(id) => {
                let enumeration = self.library.enumeration(*id)?;
                let underlying = primitive_name(enumeration.underlying);
                Ok(Marshaled::expr(
                    format!("({underlying}) {}", ctx.value),
                    ctx.cursor,
                ))
            }
            Type::Tag(id) => self.class_to_native(*id, ctx),
            Type::TemplateSpecialization { template, .. } => {
                let template = self.library.template(*template)?;
                if let Some(strategy) = self.overrides.get(&template.native_qualified_name()) {
                    debug!(template = %template.native_qualified_name(), "override hit");
                    let mut marshaled = strategy.to_native(ctx)?;
                    marshaled.is_value_type = strategy.is_value_type();
                    return Ok(marshaled);
                }
                self.class_to_native(template.templated_class, ctx)
            }
            Type::TemplateParameter(_) => Ok(Marshaled::expr(ctx.value.clone(), ctx.cursor)),
        }
    }

    fn primitive_to_native(
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

    fn pointer_to_native(
        &self,
        ty: &Type,
        pointee: &QualifiedType,
        ctx: &MarshalContext<'_>,
    ) -> Result<Marshaled, MarshalError> {
        let value = &ctx.value;
        match self.library.desugar(&pointee.ty)? {
            Type::Primitive(Primitive::Void) => {
                Ok(Marshaled::expr(format!("{value}.ToPointer()"), ctx.cursor))
            }
            Type::Primitive(kind @ (Primitive::Char | Primitive::WideChar)) => {
                let alloc = if *kind == Primitive::Char {
                    "StringToHGlobalAnsi"
                } else {
                    "StringToHGlobalUni"
                };
                let mut marshaled =
                    Marshaled::expr(format!("Marshal.{alloc}({value})"), ctx.cursor);
                marshaled
                    .cleanup
                    .push(format!("Marshal.FreeHGlobal({});", ctx.arg_name));
                Ok(marshaled)
            }
            Type::Primitive(_) | Type::Pointer { .. } | Type::Enum(_) => {
                let native = self.printer().native(ty)?;
                Ok(Marshaled::expr(
                    format!("({native}) {value}.ToPointer()"),
                    ctx.cursor,
                ))
            }
            Type::Function(_) => {
                let delegate = match self.library.delegate_for(&ctx.declared.ty)? {
                    Some(id) => Some(id),
                    None => self.library.delegate_for(ty)?,
                };
                match delegate {
                    Some(_) => Ok(Marshaled::expr(
                        format!("Marshal.GetFunctionPointerForDelegate({value})"),
                        ctx.cursor,
                    )),
                    None => Err(MarshalError::unsupported(format!(
                        "{} (no delegate typedef)",
                        self.describe(ty)
                    ))),
                }
            }
            Type::Tag(_) | Type::TemplateSpecialization { .. } => {
                let Some((_, class)) = self.library.tag_class(&pointee.ty)? else {
                    return Err(MarshalError::unsupported(self.describe(ty)));
                };
                if class.is_value_type() {
                    Ok(Marshaled::expr(
                        format!("new System.IntPtr(&{value})"),
                        ctx.cursor,
                    ))
                } else {
                    self.to_native_type(&pointee.ty, ctx)
                }
            }
            Type::Array { .. } => Err(MarshalError::Unimplemented(format!(
                "array marshaling of {}",
                self.describe(ty)
            ))),
            Type::Typedef(_) | Type::TemplateParameter(_) | Type::MemberPointer => {
                Err(MarshalError::unsupported(self.describe(ty)))
            }
        }
    }

    fn typedef_to_native(
        &self,
        id: TypedefId,
        ctx: &MarshalContext<'_>,
    ) -> Result<Marshaled, MarshalError> {
        let typedef = self.library.typedef(id)?;
        if let Some(strategy) = self.overrides.get(&typedef.native_qualified_name()) {
            debug!(typedef = %typedef.native_qualified_name(), "override hit");
            let mut marshaled = strategy.to_native(ctx)?;
            marshaled.is_value_type = strategy.is_value_type();
            return Ok(marshaled);
        }
        if self.library.pointee_function(&typedef.ty.ty)?.is_some() {
            return Ok(Marshaled::expr(
                format!("Marshal.GetFunctionPointerForDelegate({})", ctx.value),
                ctx.cursor,
            ));
        }
        if let Type::Primitive(kind) = typedef.ty.ty
            && kind != Primitive::Void
        {
            let mut marshaled = self.to_native_type(&typedef.ty.ty, ctx)?;
            marshaled.expr = format!("({}) {}", primitive_name(kind), marshaled.expr);
            return Ok(marshaled);
        }
        self.to_native_type(&typedef.ty.ty, ctx)
    }

    fn class_to_native(
        &self,
        id: ClassId,
        ctx: &MarshalContext<'_>,
    ) -> Result<Marshaled, MarshalError> {
        let class = self.library.class(id)?;
        if class.is_value_type() {
            return self.value_class_to_native(id, ctx);
        }
        if let Some(strategy) = self.overrides.get(&class.native_qualified_name()) {
            debug!(class = %class.native_qualified_name(), "override hit");
            let mut marshaled = strategy.to_native(ctx)?;
            marshaled.is_value_type = strategy.is_value_type();
            return Ok(marshaled);
        }
        self.ref_class_to_native(id, ctx)
    }

    fn ref_class_to_native(
        &self,
        id: ClassId,
        ctx: &MarshalContext<'_>,
    ) -> Result<Marshaled, MarshalError> {
        let is_receiver = ctx
            .method
            .is_some_and(|m| m.conversion == MethodConversion::FunctionToInstanceMethod)
            && ctx.param_index == 0;
        let expr = if is_receiver {
            INSTANCE_IDENTIFIER.to_string()
        } else if self.declared_is_pointer(ctx)? {
            format!("{}.{INSTANCE_IDENTIFIER}", ctx.value)
        } else {
            let name = self.printer().class_name(id)?;
            format!(
                "*({name}.Internal*) {}.{INSTANCE_IDENTIFIER}.ToPointer()",
                ctx.value
            )
        };
        Ok(Marshaled::expr(expr, ctx.cursor))
    }

    /// Copy a managed aggregate into a native-shaped temporary.
    ///
    /// Fields are written in native layout order (bases depth-first, then
    /// own fields) by their native names. Pointer fields are only written
    /// when the managed value is non-null. Every nested marshal threads the
    /// temporary cursor so generated names stay unique within the site.
    fn value_class_to_native(
        &self,
        id: ClassId,
        ctx: &MarshalContext<'_>,
    ) -> Result<Marshaled, MarshalError> {
        let name = self.printer().class_name(id)?;
        let mut cursor = ctx.cursor;
        let temp = format!("__marshal{cursor}");
        cursor += 1;

        let mut before = vec![format!("var {temp} = new {name}.Internal();")];
        let mut cleanup = Vec::new();

        for effective in self.library.effective_fields(id)?.iter() {
            let field = &effective.field;
            let field_value = format!("{}.{}", ctx.value, safe_identifier(&field.name));
            let field_ctx = MarshalContext {
                value: field_value.clone(),
                arg_name: format!("{temp}.{}", safe_identifier(&field.original_name)),
                declared: &field.ty,
                parameter: None,
                function: ctx.function,
                method: None,
                param_index: ctx.param_index,
                cursor,
            };
            let marshaled = self.to_native(&field_ctx)?;
            if marshaled.is_empty() {
                return Err(MarshalError::UnresolvedMarshal(format!(
                    "{name}.{}",
                    field.name
                )));
            }
            trace!(field = %field.name, offset = effective.offset, "flattening field");
            cursor = marshaled.cursor;
            before.extend(marshaled.before);
            if self.library.is_pointer(&field.ty.ty)? {
                before.push(format!("if ({field_value} != null)"));
                before.push(format!("    {} = {};", field_ctx.arg_name, marshaled.expr));
            } else {
                before.push(format!("{} = {};", field_ctx.arg_name, marshaled.expr));
            }
            cleanup.extend(marshaled.cleanup);
        }

        let expr = if self.declared_is_pointer(ctx)? {
            format!("new System.IntPtr(&{temp})")
        } else {
            temp
        };
        Ok(Marshaled {
            before,
            expr,
            cleanup,
            cursor,
            is_value_type: true,
        })
    }
}
