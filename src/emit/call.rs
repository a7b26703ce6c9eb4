//! Extern declarations and call sites for native entry points.

use crate::logging::trace;
use crate::marshal::{MarshalContext, MarshalError, ParamMarshal};
use crate::model::{
    ClassId, Function, Method, MethodConversion, Parameter, ParameterUsage, Primitive,
    QualifiedType, Type,
};

use super::ident::{calling_convention, safe_identifier};
use super::{GenerateError, Generator};

/// Temporary holding the raw native return value.
const RETURN: &str = "__ret";

/// Receiver passed ahead of the declared arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    None,
    /// Expression evaluating to the native handle, e.g. `Instance`.
    Handle(String),
    /// Value-type `this`, flattened before the call and written back after it.
    ValueThis(ClassId),
}

/// One invocation of a native entry point.
#[derive(Debug, Clone)]
pub struct CallSite<'f> {
    pub function: &'f Function,
    pub method: Option<&'f Method>,
    /// Name of the extern inside the `Internal` struct.
    pub extern_ident: String,
    pub receiver: Receiver,
    pub is_constructor: bool,
    /// Append the Microsoft ABI `__forBases` flag.
    pub for_bases: bool,
}

impl<'f> CallSite<'f> {
    pub fn function(function: &'f Function, extern_ident: impl Into<String>) -> Self {
        Self {
            function,
            method: None,
            extern_ident: extern_ident.into(),
            receiver: Receiver::None,
            is_constructor: false,
            for_bases: false,
        }
    }

    pub fn method(method: &'f Method, extern_ident: impl Into<String>, receiver: Receiver) -> Self {
        Self {
            function: &method.function,
            method: Some(method),
            extern_ident: extern_ident.into(),
            receiver,
            is_constructor: method.is_constructor(),
            for_bases: false,
        }
    }

    /// Whether the declared parameter at `position` (counting only generated
    /// parameters) is the receiver of a converted instance method.
    fn is_receiver_param(&self, position: usize) -> bool {
        position == 0
            && self
                .method
                .is_some_and(|m| m.conversion == MethodConversion::FunctionToInstanceMethod)
    }
}

fn is_identity_primitive(ty: &Type) -> bool {
    matches!(ty, Type::Primitive(kind) if kind.is_identity_marshaled())
}

impl Generator<'_> {
    /// `[DllImport]` declaration for a call site's entry point.
    pub(crate) fn extern_declaration(&self, site: &CallSite<'_>) -> Result<Vec<String>, GenerateError> {
        let function = site.function;
        let printer = self.printer();
        let mut lines = vec![
            "[SuppressUnmanagedCodeSecurity]".to_string(),
            format!(
                "[DllImport(\"{}\", CallingConvention = CallingConvention.{}, EntryPoint = \"{}\")]",
                self.options.dll_name(),
                calling_convention(function.calling_convention),
                function.mangled
            ),
        ];

        let return_type = if function.has_hidden_struct_return {
            "void".to_string()
        } else if site.is_constructor && self.options.microsoft_abi {
            "System.IntPtr".to_string()
        } else if site.is_constructor {
            "void".to_string()
        } else {
            if self.library.is_primitive(&function.return_type.ty, Primitive::Bool)? {
                lines.push("[return: MarshalAs(UnmanagedType.I1)]".to_string());
            }
            printer.native(&function.return_type.ty)?
        };

        let mut params = Vec::new();
        if function.has_hidden_struct_return {
            params.push(format!("System.IntPtr {RETURN}"));
        }
        if site.receiver != Receiver::None {
            params.push("System.IntPtr __instance".to_string());
        }
        for param in function.generated_params() {
            params.push(format!(
                "{} {}",
                printer.native(&param.ty.ty)?,
                safe_identifier(&param.name)
            ));
        }
        if site.for_bases {
            params.push("int __forBases".to_string());
        }

        lines.push(format!(
            "internal static extern {return_type} {}({});",
            site.extern_ident,
            params.join(", ")
        ));
        Ok(lines)
    }

    /// Managed parameter list of a wrapper, skipping a converted receiver.
    pub(crate) fn managed_parameters(&self, site: &CallSite<'_>) -> Result<String, GenerateError> {
        let printer = self.printer();
        let mut params = Vec::new();
        for (position, param) in site.function.generated_params().enumerate() {
            if site.is_receiver_param(position) {
                continue;
            }
            params.push(format!(
                "{} {}",
                printer.managed_parameter(param)?,
                safe_identifier(&param.name)
            ));
        }
        Ok(params.join(", "))
    }

    /// Statements invoking a native entry point and returning its managed
    /// result.
    ///
    /// Native argument order is fixed: hidden return pointer, receiver,
    /// declared parameters, then `__forBases`. Out parameters are read back
    /// after the call, cleanups run after that, and the return value is
    /// marshaled last.
    pub fn call_site(&self, site: &CallSite<'_>) -> Result<Vec<String>, GenerateError> {
        let marshaller = self.marshaller();
        let printer = self.printer();
        let function = site.function;

        let mut lines = Vec::new();
        let mut args = Vec::new();
        let mut cleanup = Vec::new();
        let mut cursor = 0;

        let hidden_return = if function.has_hidden_struct_return {
            let Some((id, class)) = self.library.tag_class(&function.return_type.ty)? else {
                return Err(GenerateError::Unimplemented(format!(
                    "hidden return of {}",
                    printer.describe(&function.return_type.ty)
                )));
            };
            let name = printer.class_name(id)?;
            lines.push(format!("var {RETURN} = new {name}.Internal();"));
            args.push(format!("new System.IntPtr(&{RETURN})"));
            Some((name, class))
        } else {
            None
        };

        let mut write_back = None;
        match &site.receiver {
            Receiver::None => {}
            Receiver::Handle(handle) => args.push(handle.clone()),
            Receiver::ValueThis(id) => {
                let declared = QualifiedType::new(Type::Tag(*id));
                let ctx = MarshalContext::to_native("this", "__instance", &declared)
                    .with_function(function)
                    .with_cursor(cursor);
                let marshaled = marshaller.to_native(&ctx)?;
                cursor = marshaled.cursor;
                lines.extend(marshaled.before);
                args.push(format!("new System.IntPtr(&{})", marshaled.expr));
                cleanup.extend(marshaled.cleanup);
                write_back = Some((printer.class_name(*id)?, marshaled.expr));
            }
        }

        let mut params: Vec<ParamMarshal<'_>> = Vec::new();
        let declared = function
            .params
            .iter()
            .enumerate()
            .filter(|(_, param)| param.is_generated());
        for (position, (index, param)) in declared.enumerate() {
            let arg = format!("arg{index}");
            let receiver_param = site.is_receiver_param(position);
            let value = if receiver_param {
                "this".to_string()
            } else {
                safe_identifier(&param.name)
            };

            match param.usage {
                ParameterUsage::In => {
                    if !receiver_param && is_identity_primitive(&param.ty.ty) {
                        args.push(value.clone());
                        params.push(ParamMarshal {
                            name: value,
                            param,
                            marshaled: None,
                        });
                        continue;
                    }
                    let ctx = self.param_context(site, param, position, value, &arg, &param.ty, cursor);
                    let marshaled = marshaller.to_native(&ctx)?;
                    if marshaled.is_empty() {
                        return Err(MarshalError::UnresolvedMarshal(param.name.clone()).into());
                    }
                    cursor = marshaled.cursor;
                    lines.extend(marshaled.before.iter().cloned());
                    if receiver_param {
                        args.push(marshaled.expr.clone());
                    } else {
                        lines.push(format!("var {arg} = {};", marshaled.expr));
                        args.push(arg.clone());
                    }
                    params.push(ParamMarshal {
                        name: arg,
                        param,
                        marshaled: Some(marshaled),
                    });
                }
                ParameterUsage::Out => {
                    let pointee = self.indirect_pointee(param)?;
                    let native = printer.native(&pointee.ty)?;
                    lines.push(format!("{native} {arg} = default({native});"));
                    args.push(format!("&{arg}"));
                    params.push(ParamMarshal {
                        name: arg,
                        param,
                        marshaled: None,
                    });
                }
                ParameterUsage::InOut => {
                    let pointee = self.indirect_pointee(param)?;
                    let ctx = self.param_context(site, param, position, value, &arg, pointee, cursor);
                    let marshaled = marshaller.to_native(&ctx)?;
                    if marshaled.is_empty() {
                        return Err(MarshalError::UnresolvedMarshal(param.name.clone()).into());
                    }
                    cursor = marshaled.cursor;
                    lines.extend(marshaled.before.iter().cloned());
                    lines.push(format!("var {arg} = {};", marshaled.expr));
                    args.push(format!("&{arg}"));
                    params.push(ParamMarshal {
                        name: arg,
                        param,
                        marshaled: Some(marshaled),
                    });
                }
            }
        }

        if site.for_bases {
            args.push("1".to_string());
        }

        let returns_value = hidden_return.is_none()
            && !site.is_constructor
            && !self
                .library
                .is_primitive(&function.return_type.ty, Primitive::Void)?;
        let call = format!("Internal.{}({})", site.extern_ident, args.join(", "));
        trace!(call = %call, "call site");
        if returns_value {
            lines.push(format!("var {RETURN} = {call};"));
        } else {
            lines.push(format!("{call};"));
        }

        for (position, pm) in params.iter().enumerate() {
            if pm.param.is_in() {
                continue;
            }
            let pointee = self.indirect_pointee(pm.param)?;
            let ctx = MarshalContext::to_managed(pm.name.clone(), pointee)
                .with_parameter(pm.param, position)
                .with_function(function)
                .with_cursor(cursor);
            let marshaled = marshaller.to_managed(&ctx)?;
            if marshaled.is_empty() {
                return Err(MarshalError::UnresolvedMarshal(pm.param.name.clone()).into());
            }
            cursor = marshaled.cursor;
            lines.extend(marshaled.before);
            lines.push(format!(
                "{} = {};",
                safe_identifier(&pm.param.name),
                marshaled.expr
            ));
        }

        if let Some((name, temp)) = write_back {
            lines.push(format!("this = new {name}(new System.IntPtr(&{temp}));"));
        }

        for pm in &params {
            if let Some(marshaled) = &pm.marshaled {
                cleanup.extend(marshaled.cleanup.iter().cloned());
            }
        }
        lines.extend(cleanup);

        if let Some((name, class)) = hidden_return {
            if class.is_ref_type() {
                lines.push(format!(
                    "var __instance = new {name}(Marshal.AllocHGlobal({}));",
                    class.layout.size
                ));
                lines.push("__instance.__ownsNativeInstance = true;".to_string());
                lines.push(format!(
                    "*({name}.Internal*) __instance.Instance.ToPointer() = {RETURN};"
                ));
                lines.push("return __instance;".to_string());
            } else {
                lines.push(format!("return new {name}(new System.IntPtr(&{RETURN}));"));
            }
        } else if returns_value {
            let ctx = MarshalContext::to_managed(RETURN, &function.return_type)
                .with_function(function)
                .with_cursor(cursor);
            let marshaled = marshaller.to_managed(&ctx)?;
            if marshaled.is_empty() {
                return Err(MarshalError::UnresolvedMarshal(format!(
                    "return value of {}",
                    function.original_name
                ))
                .into());
            }
            lines.extend(marshaled.before);
            lines.push(format!("return {};", marshaled.expr));
        }

        Ok(lines)
    }

    #[allow(clippy::too_many_arguments)]
    fn param_context<'c>(
        &self,
        site: &CallSite<'c>,
        param: &'c Parameter,
        position: usize,
        value: String,
        arg: &str,
        declared: &'c QualifiedType,
        cursor: u32,
    ) -> MarshalContext<'c> {
        let ctx = MarshalContext::to_native(value, arg, declared).with_cursor(cursor);
        let ctx = match site.method {
            Some(method) => ctx.with_method(method),
            None => ctx.with_function(site.function),
        };
        ctx.with_parameter(param, position)
    }

    /// Pointee of an out or in-out parameter.
    fn indirect_pointee<'p>(&self, param: &'p Parameter) -> Result<&'p QualifiedType, GenerateError> {
        match &param.ty.ty {
            Type::Pointer { pointee, .. } => Ok(pointee),
            other => Err(MarshalError::unsupported(format!(
                "{} parameter '{}' of non-pointer type {}",
                match param.usage {
                    ParameterUsage::InOut => "in-out",
                    _ => "out",
                },
                param.name,
                self.printer().describe(other)
            ))
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorOptions;
    use crate::marshal::TypeOverrides;
    use crate::model::{Class, ClassKind, Library, MethodKind, ParameterKind};

    fn int() -> Type {
        Type::Primitive(Primitive::Int32)
    }

    #[test]
    fn test_identity_primitives_pass_by_name() -> Result<(), GenerateError> {
        let library = Library::new();
        let options = GeneratorOptions::default();
        let overrides = TypeOverrides::new();
        let generator = Generator::new(&library, &options, &overrides);

        let function = Function::new("add", int())
            .with_param(Parameter::new("a", int()))
            .with_param(Parameter::new("b", int()));
        let lines = generator.call_site(&CallSite::function(&function, "add_0"))?;
        assert_eq!(
            lines,
            vec![
                "var __ret = Internal.add_0(a, b);".to_string(),
                "return __ret;".to_string()
            ]
        );
        Ok(())
    }

    #[test]
    fn test_out_parameter_reads_back_after_call() -> Result<(), GenerateError> {
        let library = Library::new();
        let options = GeneratorOptions::default();
        let overrides = TypeOverrides::new();
        let generator = Generator::new(&library, &options, &overrides);

        let function = Function::new("get", Type::Primitive(Primitive::Void)).with_param(
            Parameter::new("count", Type::pointer_to(int())).with_usage(ParameterUsage::Out),
        );
        let lines = generator.call_site(&CallSite::function(&function, "get_0"))?;
        assert_eq!(
            lines,
            vec![
                "int arg0 = default(int);".to_string(),
                "Internal.get_0(&arg0);".to_string(),
                "count = arg0;".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_extern_declaration_shape() -> Result<(), GenerateError> {
        let library = Library::new();
        let options = GeneratorOptions::new("Shapes");
        let overrides = TypeOverrides::new();
        let generator = Generator::new(&library, &options, &overrides);

        let mut function = Function::new("is_empty", Type::Primitive(Primitive::Bool));
        function.mangled = "?is_empty@Shape@@QAE_NXZ".to_string();
        function.calling_convention = crate::model::CallingConvention::ThisCall;
        let method = Method::new(function, MethodKind::Normal);
        let site = CallSite::method(&method, "is_empty_0", Receiver::Handle("Instance".into()));
        let lines = generator.extern_declaration(&site)?;
        assert_eq!(
            lines,
            vec![
                "[SuppressUnmanagedCodeSecurity]".to_string(),
                "[DllImport(\"Shapes.dll\", CallingConvention = CallingConvention.ThisCall, EntryPoint = \"?is_empty@Shape@@QAE_NXZ\")]".to_string(),
                "[return: MarshalAs(UnmanagedType.I1)]".to_string(),
                "internal static extern bool is_empty_0(System.IntPtr __instance);".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_converted_receiver_is_found_after_hidden_return() -> Result<(), GenerateError> {
        let mut library = Library::new();
        let point = library.add_class(Class::new("Point", ClassKind::ValueType, 8));
        let shape = library.add_class(Class::new("Shape", ClassKind::RefType, 16));
        let options = GeneratorOptions::default();
        let overrides = TypeOverrides::new();
        let generator = Generator::new(&library, &options, &overrides);

        let mut sret = Parameter::new("__sret", Type::pointer_to(Type::Primitive(Primitive::Void)));
        sret.kind = ParameterKind::HiddenStructureReturn;
        let mut function = Function::new("bounds", Type::Tag(point))
            .with_param(sret)
            .with_param(Parameter::new("shape", Type::pointer_to(Type::Tag(shape))))
            .with_param(Parameter::new("scale", int()));
        function.has_hidden_struct_return = true;
        let mut method = Method::new(function, MethodKind::Normal);
        method.conversion = MethodConversion::FunctionToInstanceMethod;

        let site = CallSite::method(&method, "bounds_0", Receiver::None);
        assert_eq!(generator.managed_parameters(&site)?, "int scale");
        assert_eq!(
            generator.call_site(&site)?,
            vec![
                "var __ret = new Point.Internal();".to_string(),
                "Internal.bounds_0(new System.IntPtr(&__ret), Instance, scale);".to_string(),
                "return new Point(new System.IntPtr(&__ret));".to_string(),
            ]
        );
        Ok(())
    }
}
