//! Class bodies: layout mirror, constructors, properties and methods.
//!
//! Members that fail to generate are reported as diagnostics and omitted from
//! both the `Internal` layout struct and the class body; their siblings are
//! still emitted.

use std::fmt::Write;

use crate::logging::debug;
use crate::marshal::{MarshalContext, MarshalError};
use crate::model::{
    ArraySize, Class, ClassId, EffectiveField, Method, MethodKind, QualifiedType, Type, Variable,
};

use super::call::{CallSite, Receiver};
use super::ident::{INSTANCE_IDENTIFIER, generated_identifier, safe_identifier};
use super::writer::CodeWriter;
use super::{Diagnostics, GenerateError, Generator, record};

/// Output of one member: its lines inside `Internal` and its managed body.
struct Member {
    internal: Vec<String>,
    body: CodeWriter,
}

/// Generated pieces of one field.
struct FieldMember {
    internal: Vec<String>,
    body: Option<CodeWriter>,
    /// Statements copying the field out of a native block (value types).
    load: Vec<String>,
}

impl Generator<'_> {
    /// Reference types own a native handle unless a reference-type base
    /// already materializes it.
    pub(crate) fn materialized_base(&self, class: &Class) -> Result<Option<ClassId>, GenerateError> {
        if !class.is_ref_type() {
            return Ok(None);
        }
        let Some(base) = class.primary_base() else {
            return Ok(None);
        };
        match self.library.tag_class(&base.ty)? {
            Some((id, base_class)) if base_class.is_ref_type() && !base_class.ignore => Ok(Some(id)),
            _ => Ok(None),
        }
    }

    pub(crate) fn should_generate_native_field(&self, class: &Class) -> Result<bool, GenerateError> {
        Ok(class.is_ref_type() && self.materialized_base(class)?.is_none())
    }

    pub(crate) fn emit_class(
        &self,
        id: ClassId,
        w: &mut CodeWriter,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), GenerateError> {
        let class = self.library.class(id)?;
        if class.ignore || class.is_incomplete {
            debug!(class = %class.native_qualified_name(), "skipping class");
            return Ok(());
        }
        if class.is_union {
            return Err(GenerateError::Unimplemented(format!(
                "union {}",
                class.native_qualified_name()
            )));
        }

        let base = self.materialized_base(class)?;
        let owns_handle = self.should_generate_native_field(class)?;
        let name = safe_identifier(&class.name);

        self.emit_comment(w, class.comment.as_deref());
        self.emit_debug(w, class.debug_text.as_deref());
        let mut prolog = String::from("public unsafe ");
        if class.is_value_type() {
            write!(prolog, "partial struct {name}")?;
        } else {
            if class.is_abstract {
                prolog.push_str("abstract ");
            }
            write!(prolog, "partial class {name}")?;
            match base {
                Some(base_id) => write!(prolog, " : {}", self.printer().class_name(base_id)?)?,
                None => prolog.push_str(" : IDisposable"),
            }
        }
        w.line(prolog);
        w.open_brace();

        let mut internal = Vec::new();
        let mut native_load = Vec::new();
        let mut fields = Vec::new();

        let effective = self.library.effective_fields(id)?;
        let inherited = match base {
            Some(base_id) => self.library.effective_fields(base_id)?.len(),
            None => 0,
        };
        for (index, field) in effective.iter().enumerate() {
            let in_body = class.is_value_type() || index >= inherited;
            match self.field_member(class, field, in_body, w) {
                Ok(member) => {
                    internal.extend(member.internal);
                    native_load.extend(member.load);
                    fields.extend(member.body);
                }
                Err(error) => record(
                    diagnostics,
                    format!("{}::{}", class.native_qualified_name(), field.field.original_name),
                    error,
                ),
            }
        }

        let mut variables = Vec::new();
        for variable in class.variables.iter().filter(|v| !v.ignore) {
            match self.variable_member(variable, w) {
                Ok(member) => {
                    internal.extend(member.internal);
                    variables.push(member.body);
                }
                Err(error) => record(
                    diagnostics,
                    format!("{}::{}", class.native_qualified_name(), variable.original_name),
                    error,
                ),
            }
        }

        let mut constructors = Vec::new();
        let mut instance_methods = Vec::new();
        let mut static_methods = Vec::new();
        for (index, method) in class.methods.iter().enumerate() {
            if method.function.ignore || method.is_copy_or_move_constructor() {
                continue;
            }
            match self.method_member(id, class, method, index, base.is_some(), w) {
                Ok(member) => {
                    internal.extend(member.internal);
                    if member.body.is_empty() {
                        continue;
                    }
                    if method.is_constructor() {
                        constructors.push(member.body);
                    } else if method.is_instance() {
                        instance_methods.push(member.body);
                    } else {
                        static_methods.push(member.body);
                    }
                }
                Err(error) => record(
                    diagnostics,
                    format!("{}::{}", class.native_qualified_name(), method.function.original_name),
                    error,
                ),
            }
        }

        w.line(format!(
            "[StructLayout(LayoutKind.Explicit, Size = {})]",
            class.layout.size
        ));
        if base.is_some() {
            w.line("public new partial struct Internal");
        } else {
            w.line("public partial struct Internal");
        }
        w.open_brace();
        for (index, part) in internal.iter().enumerate() {
            if index > 0 && part.starts_with('[') && !internal_continues(&internal, index) {
                w.need_blank_line();
            }
            w.line(part);
        }
        w.close_brace();

        if owns_handle {
            w.need_blank_line();
            w.line(format!(
                "public System.IntPtr {INSTANCE_IDENTIFIER} {{ get; protected set; }}"
            ));
            w.need_blank_line();
            w.line(format!(
                "protected internal bool {};",
                generated_identifier("ownsNativeInstance")
            ));
        }

        w.need_blank_line();
        self.emit_native_constructor(class, &name, base.is_some(), owns_handle, &native_load, w);

        for part in constructors {
            w.need_blank_line();
            w.splice(part);
        }

        if owns_handle {
            w.need_blank_line();
            self.emit_dispose(w);
        }

        for part in fields.into_iter().chain(variables) {
            w.need_blank_line();
            w.splice(part);
        }

        for part in instance_methods.into_iter().chain(static_methods) {
            w.need_blank_line();
            w.splice(part);
        }

        w.close_brace();
        Ok(())
    }

    fn emit_native_constructor(
        &self,
        class: &Class,
        name: &str,
        has_base: bool,
        owns_handle: bool,
        native_load: &[String],
        w: &mut CodeWriter,
    ) {
        w.line(format!("internal {name}(System.IntPtr native)"));
        if has_base {
            w.push_indent();
            w.line(": base(native)");
            w.pop_indent();
        } else if class.is_value_type() {
            w.push_indent();
            w.line(": this()");
            w.pop_indent();
        }
        w.open_brace();
        if owns_handle {
            w.line(format!("{INSTANCE_IDENTIFIER} = native;"));
        }
        w.lines(native_load);
        w.close_brace();
    }

    fn emit_dispose(&self, w: &mut CodeWriter) {
        let owns = generated_identifier("ownsNativeInstance");
        w.line("public void Dispose()");
        w.open_brace();
        w.line("Dispose(disposing: true);");
        w.line("GC.SuppressFinalize(this);");
        w.close_brace();
        w.need_blank_line();
        w.line("protected virtual void Dispose(bool disposing)");
        w.open_brace();
        w.line(format!("if ({owns})"));
        w.push_indent();
        w.line(format!("Marshal.FreeHGlobal({INSTANCE_IDENTIFIER});"));
        w.pop_indent();
        w.line(format!("{owns} = false;"));
        w.line(format!("{INSTANCE_IDENTIFIER} = System.IntPtr.Zero;"));
        w.close_brace();
    }

    /// `[FieldOffset]` declaration of a field inside `Internal`.
    fn internal_field(&self, field: &EffectiveField) -> Result<Vec<String>, GenerateError> {
        let original = safe_identifier(&field.field.original_name);
        let declaration = match &field.field.ty.ty {
            Type::Array {
                element,
                size: ArraySize::Constant(count),
            } => match self.library.as_primitive(&element.ty)? {
                Some(kind) if kind.is_identity_marshaled() => format!(
                    "public fixed {} {original}[{count}];",
                    super::type_printer::primitive_name(kind)
                ),
                _ => {
                    return Err(GenerateError::Unimplemented(format!(
                        "fixed buffer of {}",
                        self.printer().describe(&element.ty)
                    )));
                }
            },
            other => format!("public {} {original};", self.printer().native(other)?),
        };
        Ok(vec![format!("[FieldOffset({})]", field.offset), declaration])
    }

    fn field_member(
        &self,
        class: &Class,
        field: &EffectiveField,
        in_body: bool,
        w: &CodeWriter,
    ) -> Result<FieldMember, GenerateError> {
        let internal = self.internal_field(field)?;
        if !in_body {
            return Ok(FieldMember {
                internal,
                body: None,
                load: Vec::new(),
            });
        }

        let printer = self.printer();
        let marshaller = self.marshaller();
        let managed = printer.managed(&field.field.ty.ty)?;
        let name = safe_identifier(&field.field.name);
        let mut body = w.child();
        let mut load = Vec::new();

        let native = printer.native(&field.field.ty.ty)?;
        if class.is_value_type() {
            let storage = format!("*({native}*) (native + {})", field.offset);
            let ctx = MarshalContext::to_managed(storage, &field.field.ty);
            let marshaled = marshaller.to_managed(&ctx)?;
            if marshaled.is_empty() {
                return Err(MarshalError::UnresolvedMarshal(field.field.name.clone()).into());
            }
            load.extend(marshaled.before);
            load.push(format!("{name} = {};", marshaled.expr));

            self.emit_comment(&mut body, field.field.comment.as_deref());
            body.line(format!("public {managed} {name};"));
            return Ok(FieldMember {
                internal,
                body: Some(body),
                load,
            });
        }

        let storage = format!(
            "*({native}*) ({INSTANCE_IDENTIFIER} + {})",
            field.offset
        );
        self.emit_comment(&mut body, field.field.comment.as_deref());
        self.emit_property(
            &mut body,
            &format!("public {managed} {name}"),
            &storage,
            &field.field.ty,
            true,
        )?;
        Ok(FieldMember {
            internal,
            body: Some(body),
            load,
        })
    }

    fn variable_member(&self, variable: &Variable, w: &CodeWriter) -> Result<Member, GenerateError> {
        let printer = self.printer();
        let slot = format!("{}_address", safe_identifier(&variable.original_name));
        let internal = vec![format!(
            "internal static readonly System.IntPtr {slot} = NativeLibrary.GetExport(NativeLibrary.Load(\"{}\"), \"{}\");",
            self.options.dll_name(),
            variable.mangled
        )];

        let native = printer.native(&variable.ty.ty)?;
        let managed = printer.managed(&variable.ty.ty)?;
        let storage = format!("*({native}*) Internal.{slot}");
        let mut body = w.child();
        self.emit_comment(&mut body, variable.comment.as_deref());
        self.emit_property(
            &mut body,
            &format!("public static {managed} {}", safe_identifier(&variable.name)),
            &storage,
            &variable.ty,
            !variable.ty.qualifiers.is_const,
        )?;
        Ok(Member { internal, body })
    }

    /// Property reading and writing a native storage location.
    ///
    /// Setter cleanups are dropped: the assigned native value is owned by the
    /// storage afterwards. A setter whose conversion is not implemented is
    /// left out and the property becomes read-only.
    fn emit_property(
        &self,
        w: &mut CodeWriter,
        signature: &str,
        storage: &str,
        declared: &QualifiedType,
        writable: bool,
    ) -> Result<(), GenerateError> {
        let marshaller = self.marshaller();

        let getter = marshaller.to_managed(&MarshalContext::to_managed(storage, declared))?;
        if getter.is_empty() {
            return Err(MarshalError::UnresolvedMarshal(storage.to_string()).into());
        }

        let setter = if writable {
            let ctx = MarshalContext::to_native("value", storage, declared);
            match marshaller.to_native(&ctx) {
                Ok(marshaled) if marshaled.is_empty() => {
                    return Err(MarshalError::UnresolvedMarshal(storage.to_string()).into());
                }
                Ok(marshaled) => Some(marshaled),
                Err(MarshalError::Unimplemented(_)) => None,
                Err(error) => return Err(error.into()),
            }
        } else {
            None
        };

        w.line(signature);
        w.open_brace();
        w.line("get");
        w.open_brace();
        w.lines(&getter.before);
        w.line(format!("return {};", getter.expr));
        w.close_brace();
        if let Some(setter) = setter {
            w.need_blank_line();
            w.line("set");
            w.open_brace();
            w.lines(&setter.before);
            w.line(format!("{storage} = {};", setter.expr));
            w.close_brace();
        }
        w.close_brace();
        Ok(())
    }

    fn method_member(
        &self,
        id: ClassId,
        class: &Class,
        method: &Method,
        index: usize,
        has_base: bool,
        w: &CodeWriter,
    ) -> Result<Member, GenerateError> {
        let ident = match method.kind {
            MethodKind::Constructor | MethodKind::CopyConstructor | MethodKind::MoveConstructor => {
                format!("ctor_{index}")
            }
            MethodKind::Destructor => format!("dtor_{index}"),
            MethodKind::Normal => format!("{}_{index}", safe_identifier(&method.function.name)),
        };

        let receiver = if method.is_constructor() {
            if class.is_value_type() {
                Receiver::Handle(format!("new System.IntPtr(&{})", generated_identifier("this")))
            } else {
                Receiver::Handle(INSTANCE_IDENTIFIER.to_string())
            }
        } else if method.has_receiver() {
            if class.is_value_type() {
                Receiver::ValueThis(id)
            } else {
                Receiver::Handle(INSTANCE_IDENTIFIER.to_string())
            }
        } else {
            Receiver::None
        };

        let mut site = CallSite::method(method, ident, receiver);
        site.for_bases = method.is_constructor()
            && self.options.microsoft_abi
            && class.layout.has_virtual_bases;

        let internal = self.extern_declaration(&site)?;
        let mut body = w.child();

        match method.kind {
            MethodKind::Destructor => {}
            MethodKind::Constructor | MethodKind::CopyConstructor | MethodKind::MoveConstructor => {
                let skip = class.is_abstract
                    || (class.is_value_type() && method.function.generated_params().next().is_none());
                if !skip {
                    self.emit_constructor(id, class, &site, has_base, &mut body)?;
                }
            }
            MethodKind::Normal => self.emit_method(&site, &mut body)?,
        }
        Ok(Member { internal, body })
    }

    fn emit_constructor(
        &self,
        id: ClassId,
        class: &Class,
        site: &CallSite<'_>,
        has_base: bool,
        w: &mut CodeWriter,
    ) -> Result<(), GenerateError> {
        let name = safe_identifier(&class.name);
        let params = self.managed_parameters(site)?;
        let call = self.call_site(site)?;

        self.emit_comment(w, site.function.comment.as_deref());
        self.emit_debug(w, site.function.debug_text.as_deref());
        w.line(format!("public {name}({params})"));
        if class.is_value_type() {
            w.push_indent();
            w.line(": this()");
            w.pop_indent();
            w.open_brace();
            let this = generated_identifier("this");
            w.line(format!(
                "var {this} = new {}.Internal();",
                self.printer().class_name(id)?
            ));
            w.lines(&call);
            w.line(format!("this = new {name}(new System.IntPtr(&{this}));"));
            w.close_brace();
            return Ok(());
        }

        if has_base {
            w.push_indent();
            w.line(": base(System.IntPtr.Zero)");
            w.pop_indent();
        }
        w.open_brace();
        w.line(format!(
            "{INSTANCE_IDENTIFIER} = Marshal.AllocHGlobal({});",
            class.layout.size
        ));
        w.line(format!("{} = true;", generated_identifier("ownsNativeInstance")));
        w.lines(&call);
        w.close_brace();
        Ok(())
    }

    fn emit_method(&self, site: &CallSite<'_>, w: &mut CodeWriter) -> Result<(), GenerateError> {
        let function = site.function;
        let printer = self.printer();
        let return_type = printer.managed(&function.return_type.ty)?;
        let params = self.managed_parameters(site)?;
        let call = self.call_site(site)?;
        let is_static = site.method.is_some_and(|m| !m.is_instance());

        self.emit_comment(w, function.comment.as_deref());
        self.emit_debug(w, function.debug_text.as_deref());
        w.line(format!(
            "public {}{return_type} {}({params})",
            if is_static { "static " } else { "" },
            safe_identifier(&function.name)
        ));
        w.open_brace();
        w.lines(&call);
        w.close_brace();
        Ok(())
    }
}

/// Attribute lines continue the declaration that follows them, so a blank
/// line only goes before the first attribute of a group.
fn internal_continues(parts: &[String], index: usize) -> bool {
    index
        .checked_sub(1)
        .and_then(|prev| parts.get(prev))
        .is_some_and(|prev| prev.starts_with('['))
}
