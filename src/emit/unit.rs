//! Translation units: namespaces, enums, delegates and free functions.

use crate::logging::debug;
use crate::marshal::MarshalError;
use crate::model::{EnumId, Function, Namespace, Primitive, TranslationUnit, Type, TypedefId};

use super::call::CallSite;
use super::ident::{calling_convention, safe_identifier};
use super::type_printer::primitive_name;
use super::writer::CodeWriter;
use super::{Diagnostics, GenerateError, Generator, record};

const USINGS: [&str; 3] = [
    "using System;",
    "using System.Runtime.InteropServices;",
    "using System.Security;",
];

impl Generator<'_> {
    pub(crate) fn emit_unit(&self, unit: &TranslationUnit, diagnostics: &mut Diagnostics) -> String {
        let mut w = CodeWriter::new();
        w.line("// <auto-generated>");
        w.line(format!("// Bindings for {} generated by native-bridge.", unit.name));
        w.line("// Changes to this file will be lost when it is regenerated.");
        w.line("// </auto-generated>");
        w.need_blank_line();
        w.lines(USINGS);

        let library_namespace = self.naming.library_namespace().map(safe_identifier);
        if let Some(ns) = &library_namespace {
            w.need_blank_line();
            w.line(format!("namespace {ns}"));
            w.open_brace();
        }

        self.emit_namespace_members(&unit.root, &mut w, diagnostics);

        if library_namespace.is_some() {
            w.close_brace();
        }
        w.into_string()
    }

    fn emit_namespace(&self, namespace: &Namespace, w: &mut CodeWriter, diagnostics: &mut Diagnostics) {
        if namespace.is_empty() {
            return;
        }
        w.line(format!("namespace {}", safe_identifier(&namespace.name)));
        w.open_brace();
        self.emit_namespace_members(namespace, w, diagnostics);
        w.close_brace();
    }

    fn emit_namespace_members(
        &self,
        namespace: &Namespace,
        w: &mut CodeWriter,
        diagnostics: &mut Diagnostics,
    ) {
        for &id in &namespace.enums {
            let mut child = w.child();
            match self.emit_enum(id, &mut child) {
                Ok(()) => {
                    w.need_blank_line();
                    w.splice(child);
                }
                Err(error) => record(diagnostics, self.enum_label(id), error),
            }
        }

        for &id in &namespace.typedefs {
            let mut child = w.child();
            match self.emit_delegate(id, &mut child) {
                Ok(()) => {
                    w.need_blank_line();
                    w.splice(child);
                }
                Err(error) => record(diagnostics, self.typedef_label(id), error),
            }
        }

        for &id in &namespace.classes {
            let mut child = w.child();
            match self.emit_class(id, &mut child, diagnostics) {
                Ok(()) => {
                    w.need_blank_line();
                    w.splice(child);
                }
                Err(error) => {
                    let label = self
                        .library
                        .class(id)
                        .map(|c| c.native_qualified_name())
                        .unwrap_or_else(|_| id.to_string());
                    record(diagnostics, label, error);
                }
            }
        }

        if namespace.functions.iter().any(|f| !f.ignore) {
            let mut child = w.child();
            self.emit_functions(&namespace.functions, &mut child, diagnostics);
            w.need_blank_line();
            w.splice(child);
        }

        for nested in &namespace.namespaces {
            let mut child = w.child();
            self.emit_namespace(nested, &mut child, diagnostics);
            w.need_blank_line();
            w.splice(child);
        }
    }

    pub(crate) fn emit_comment(&self, w: &mut CodeWriter, comment: Option<&str>) {
        let Some(comment) = comment else {
            return;
        };
        w.line("/// <summary>");
        for line in comment.lines() {
            w.line(format!("/// {}", line.trim_end()).trim_end());
        }
        w.line("/// </summary>");
    }

    pub(crate) fn emit_debug(&self, w: &mut CodeWriter, text: Option<&str>) {
        if !self.options.output_debug {
            return;
        }
        if let Some(text) = text {
            for line in text.lines() {
                w.line(format!("// DEBUG: {line}"));
            }
        }
    }

    fn emit_enum(&self, id: EnumId, w: &mut CodeWriter) -> Result<(), GenerateError> {
        let enumeration = self.library.enumeration(id)?;
        if enumeration.ignore {
            return Ok(());
        }
        let underlying = match enumeration.underlying {
            Primitive::Int32 => None,
            Primitive::Void
            | Primitive::Bool
            | Primitive::WideChar
            | Primitive::Float
            | Primitive::Double => {
                return Err(MarshalError::unsupported(format!(
                    "enum underlying type {}",
                    primitive_name(enumeration.underlying)
                ))
                .into());
            }
            other => Some(primitive_name(other)),
        };

        self.emit_comment(w, enumeration.comment.as_deref());
        if enumeration.is_flags {
            w.line("[Flags]");
        }
        let name = safe_identifier(&enumeration.name);
        match underlying {
            Some(ty) => w.line(format!("public enum {name} : {ty}")),
            None => w.line(format!("public enum {name}")),
        }
        w.open_brace();
        for item in &enumeration.items {
            self.emit_comment(w, item.comment.as_deref());
            let item_name = safe_identifier(&item.name);
            if item.explicit_value {
                w.line(format!("{item_name} = {},", item.value));
            } else {
                w.line(format!("{item_name},"));
            }
        }
        w.close_brace();
        Ok(())
    }

    /// Delegate for a typedef naming a function pointer. Other typedefs are
    /// transparent and produce nothing.
    fn emit_delegate(&self, id: TypedefId, w: &mut CodeWriter) -> Result<(), GenerateError> {
        let typedef = self.library.typedef(id)?;
        if typedef.ignore {
            return Ok(());
        }
        let function = match self.library.pointee_function(&typedef.ty.ty)? {
            Some(function) => function,
            None => match self.library.desugar(&typedef.ty.ty)? {
                Type::Function(function) => function,
                _ => {
                    debug!(typedef = %typedef.native_qualified_name(), "transparent typedef");
                    return Ok(());
                }
            },
        };

        let printer = self.printer();
        let return_type = printer.native(&function.return_type.ty)?;
        let params = function
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| Ok(format!("{} arg{index}", printer.native(&param.ty)?)))
            .collect::<Result<Vec<_>, MarshalError>>()?;

        w.line("[SuppressUnmanagedCodeSecurity]");
        w.line(format!(
            "[UnmanagedFunctionPointer(CallingConvention.{})]",
            calling_convention(function.calling_convention)
        ));
        w.line(format!(
            "public unsafe delegate {return_type} {}({});",
            safe_identifier(&typedef.name),
            params.join(", ")
        ));
        Ok(())
    }

    /// Free functions, wrapped in a static class named after the library.
    fn emit_functions(&self, functions: &[Function], w: &mut CodeWriter, diagnostics: &mut Diagnostics) {
        let mut externs = Vec::new();
        let mut wrappers = Vec::new();
        for (index, function) in functions.iter().enumerate() {
            if function.ignore {
                continue;
            }
            let site = CallSite::function(function, format!("{}_{index}", safe_identifier(&function.name)));
            let mut body = w.child();
            body.push_indent();
            match self.emit_function(&site, &mut body) {
                Ok(internal) => {
                    externs.push(internal);
                    wrappers.push(body);
                }
                Err(error) => record(diagnostics, function.original_name.clone(), error),
            }
        }

        w.line(format!(
            "public unsafe partial class {}",
            safe_identifier(&self.options.library_name)
        ));
        w.open_brace();
        w.line("public partial struct Internal");
        w.open_brace();
        for (index, lines) in externs.iter().enumerate() {
            if index > 0 {
                w.need_blank_line();
            }
            w.lines(lines);
        }
        w.close_brace();
        for wrapper in wrappers {
            w.need_blank_line();
            w.splice(wrapper);
        }
        w.close_brace();
    }

    fn emit_function(&self, site: &CallSite<'_>, w: &mut CodeWriter) -> Result<Vec<String>, GenerateError> {
        let function = site.function;
        let internal = self.extern_declaration(site)?;
        let return_type = self.printer().managed(&function.return_type.ty)?;
        let params = self.managed_parameters(site)?;
        let call = self.call_site(site)?;

        self.emit_comment(w, function.comment.as_deref());
        self.emit_debug(w, function.debug_text.as_deref());
        w.line(format!(
            "public static {return_type} {}({params})",
            safe_identifier(&function.name)
        ));
        w.open_brace();
        w.lines(&call);
        w.close_brace();
        Ok(internal)
    }

    fn enum_label(&self, id: EnumId) -> String {
        self.library
            .enumeration(id)
            .map(|e| e.qualified_name())
            .unwrap_or_else(|_| id.to_string())
    }

    fn typedef_label(&self, id: TypedefId) -> String {
        self.library
            .typedef(id)
            .map(|t| t.native_qualified_name())
            .unwrap_or_else(|_| id.to_string())
    }
}
