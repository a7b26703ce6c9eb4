//! End-to-end tests for generated C# declarations.

mod common;

use common::*;
use native_bridge::model::{
    Class, ClassKind, Function, Library, Method, MethodConversion, MethodKind, Namespace,
    Parameter, ParameterUsage, Primitive, TranslationUnit, Type, TypedefDecl,
};
use native_bridge::{
    CallSite, GeneratorOptions, Generator, Receiver, TemplateOverride, TypeOverrides,
};

fn generate(library: &Library, options: &GeneratorOptions) -> native_bridge::GeneratedUnit {
    let overrides = TypeOverrides::new();
    let mut units = Generator::new(library, options, &overrides).generate();
    assert_eq!(units.len(), 1);
    units.remove(0)
}

// =============================================================================
// Call sites
// =============================================================================

/// `Point bounds(int p0, ...)` on a reference type, returned through a hidden
/// pointer.
fn hidden_return_method(point: native_bridge::model::ClassId, params: usize) -> Method {
    let mut function = Function::new("Bounds", Type::Tag(point)).with_param(hidden_return_param());
    function.has_hidden_struct_return = true;
    for index in 0..params {
        function = function.with_param(Parameter::new(format!("p{index}"), int()));
    }
    Method::new(function, MethodKind::Normal)
}

#[test]
fn test_hidden_return_precedes_receiver_and_params() -> Result<(), anyhow::Error> {
    let fixture = geometry();
    let options = GeneratorOptions::default();
    let overrides = TypeOverrides::new();
    let generator = Generator::new(&fixture.library, &options, &overrides);

    let expected_calls = [
        "Internal.Bounds_0(new System.IntPtr(&__ret), Instance);",
        "Internal.Bounds_0(new System.IntPtr(&__ret), Instance, p0);",
        "Internal.Bounds_0(new System.IntPtr(&__ret), Instance, p0, p1, p2);",
    ];
    for (params, expected) in [0, 1, 3].into_iter().zip(expected_calls) {
        let method = hidden_return_method(fixture.point, params);
        let site = CallSite::method(&method, "Bounds_0", Receiver::Handle("Instance".into()));
        let lines = generator.call_site(&site)?;
        assert_eq!(
            lines,
            vec![
                "var __ret = new Point.Internal();".to_string(),
                expected.to_string(),
                "return new Point(new System.IntPtr(&__ret));".to_string(),
            ]
        );
    }
    Ok(())
}

#[test]
fn test_hidden_return_of_reference_type_copies_into_owned_block() -> Result<(), anyhow::Error> {
    let fixture = geometry();
    let options = GeneratorOptions::default();
    let overrides = TypeOverrides::new();
    let generator = Generator::new(&fixture.library, &options, &overrides);

    let mut function = Function::new("Clone", Type::Tag(fixture.circle));
    function.has_hidden_struct_return = true;
    let method = Method::new(function, MethodKind::Normal);
    let site = CallSite::method(&method, "Clone_0", Receiver::Handle("Instance".into()));
    assert_eq!(
        generator.call_site(&site)?,
        vec![
            "var __ret = new Circle.Internal();",
            "Internal.Clone_0(new System.IntPtr(&__ret), Instance);",
            "var __instance = new Circle(Marshal.AllocHGlobal(24));",
            "__instance.__ownsNativeInstance = true;",
            "*(Circle.Internal*) __instance.Instance.ToPointer() = __ret;",
            "return __instance;",
        ]
    );
    Ok(())
}

#[test]
fn test_converted_instance_method_with_hidden_return_binds_instance() -> Result<(), anyhow::Error> {
    let mut fixture = geometry();
    let mut function = Function::new("Bounds", Type::Tag(fixture.point))
        .with_param(hidden_return_param())
        .with_param(Parameter::new("shape", Type::pointer_to(Type::Tag(fixture.shape))));
    function.has_hidden_struct_return = true;
    let mut method = Method::new(function, MethodKind::Normal);
    method.conversion = MethodConversion::FunctionToInstanceMethod;
    fixture.library.class_mut(fixture.shape)?.methods.push(method);

    let unit = generate(&fixture.library, &GeneratorOptions::default());
    let shape = class_section(&unit.source, "public unsafe partial class Shape : IDisposable");
    assert!(shape.contains("public Point Bounds()\n"), "{shape}");
    assert!(
        shape.contains("Internal.Bounds_4(new System.IntPtr(&__ret), Instance);"),
        "{shape}"
    );
    assert!(!shape.contains("shape.Instance"), "{shape}");
    Ok(())
}

#[test]
fn test_cleanup_runs_after_readback_and_before_return() -> Result<(), anyhow::Error> {
    let library = Library::new();
    let options = GeneratorOptions::default();
    let overrides = TypeOverrides::new();
    let generator = Generator::new(&library, &options, &overrides);

    let function = Function::new("lookup", int())
        .with_param(Parameter::new("key", c_string()))
        .with_param(
            Parameter::new("count", Type::pointer_to(int())).with_usage(ParameterUsage::Out),
        );
    let lines = generator.call_site(&CallSite::function(&function, "lookup_0"))?;
    assert_eq!(
        lines,
        vec![
            "var arg0 = Marshal.StringToHGlobalAnsi(key);",
            "int arg1 = default(int);",
            "var __ret = Internal.lookup_0(arg0, &arg1);",
            "count = arg1;",
            "Marshal.FreeHGlobal(arg0);",
            "return __ret;",
        ]
    );
    Ok(())
}

#[test]
fn test_out_string_is_read_back_before_input_is_freed() -> Result<(), anyhow::Error> {
    let library = Library::new();
    let options = GeneratorOptions::default();
    let overrides = TypeOverrides::new();
    let generator = Generator::new(&library, &options, &overrides);

    let function = Function::new("rename", c_string())
        .with_param(Parameter::new("key", c_string()))
        .with_param(
            Parameter::new("name", Type::pointer_to(c_string())).with_usage(ParameterUsage::Out),
        );
    let lines = generator.call_site(&CallSite::function(&function, "rename_0"))?;
    assert_eq!(
        lines,
        vec![
            "var arg0 = Marshal.StringToHGlobalAnsi(key);",
            "System.IntPtr arg1 = default(System.IntPtr);",
            "var __ret = Internal.rename_0(arg0, &arg1);",
            "name = Marshal.PtrToStringAnsi(arg1);",
            "Marshal.FreeHGlobal(arg0);",
            "return Marshal.PtrToStringAnsi(__ret);",
        ]
    );
    Ok(())
}

#[test]
fn test_in_out_parameter_is_passed_by_address() -> Result<(), anyhow::Error> {
    let library = Library::new();
    let options = GeneratorOptions::default();
    let overrides = TypeOverrides::new();
    let generator = Generator::new(&library, &options, &overrides);

    let function = Function::new("bump", void()).with_param(
        Parameter::new("value", Type::pointer_to(int())).with_usage(ParameterUsage::InOut),
    );
    let site = CallSite::function(&function, "bump_0");
    assert_eq!(
        generator.call_site(&site)?,
        vec![
            "var arg0 = value;",
            "Internal.bump_0(&arg0);",
            "value = arg0;",
        ]
    );
    Ok(())
}

// =============================================================================
// Whole units
// =============================================================================

#[test]
fn test_reference_class_shape() {
    let fixture = geometry();
    let unit = generate(&fixture.library, &GeneratorOptions::default());
    let shape = class_section(&unit.source, "public unsafe partial class Shape");

    assert!(shape.starts_with("public unsafe partial class Shape : IDisposable\n{\n"));
    assert!(shape.contains("    [StructLayout(LayoutKind.Explicit, Size = 16)]\n    public partial struct Internal\n"));
    assert!(shape.contains("        [FieldOffset(0)]\n        public int id;\n"));
    assert!(shape.contains("        [FieldOffset(8)]\n        public System.IntPtr label;\n"));
    assert!(shape.contains(
        "        [DllImport(\"Native.dll\", CallingConvention = CallingConvention.Winapi, EntryPoint = \"??0Shape@@QAE@H@Z\")]\n        internal static extern void ctor_0(System.IntPtr __instance, int id);\n"
    ));
    assert!(shape.contains("internal static extern void dtor_2(System.IntPtr __instance);"));
    assert!(shape.contains("    public System.IntPtr Instance { get; protected set; }\n"));
    assert!(shape.contains("    protected internal bool __ownsNativeInstance;\n"));
    assert!(shape.contains("    internal Shape(System.IntPtr native)\n    {\n        Instance = native;\n    }\n"));
    assert!(shape.contains(
        "    public Shape(int id)\n    {\n        Instance = Marshal.AllocHGlobal(16);\n        __ownsNativeInstance = true;\n        Internal.ctor_0(Instance, id);\n    }\n"
    ));
    assert!(shape.contains(
        "    public string Label\n    {\n        get\n        {\n            return Marshal.PtrToStringAnsi(*(System.IntPtr*) (Instance + 8));\n        }\n\n        set\n        {\n            *(System.IntPtr*) (Instance + 8) = Marshal.StringToHGlobalAnsi(value);\n        }\n    }\n"
    ));
    assert!(shape.contains(
        "    public double Area()\n    {\n        var __ret = Internal.Area_1(Instance);\n        return __ret;\n    }\n"
    ));
    assert!(shape.contains("    public static int Count()\n    {\n        var __ret = Internal.Count_3();\n"));
    assert!(shape.contains("Marshal.FreeHGlobal(Instance);"));

    // Destructors get an entry point but no managed wrapper.
    assert!(!shape.contains("~Shape"));
    // Instance methods come before static ones.
    let area = shape.find("public double Area()");
    let count = shape.find("public static int Count()");
    assert!(area < count);
}

#[test]
fn test_derived_class_reuses_base_handle() {
    let fixture = geometry();
    let unit = generate(&fixture.library, &GeneratorOptions::default());
    let circle = class_section(&unit.source, "public unsafe partial class Circle");

    assert!(circle.starts_with("public unsafe partial class Circle : Shape\n"));
    assert!(circle.contains("    public new partial struct Internal\n"));
    assert!(circle.contains("        [FieldOffset(0)]\n        public int id;\n"));
    assert!(circle.contains("        [FieldOffset(16)]\n        public double radius;\n"));
    assert!(circle.contains("    internal Circle(System.IntPtr native)\n        : base(native)\n    {\n    }\n"));
    assert!(circle.contains(
        "    public Circle(double r)\n        : base(System.IntPtr.Zero)\n    {\n        Instance = Marshal.AllocHGlobal(24);\n"
    ));
    assert!(circle.contains("    public double Radius\n"));
    assert!(!circle.contains("Instance { get;"));
    assert!(!circle.contains("public string Label"));
    assert!(!circle.contains("public void Dispose()"));
}

#[test]
fn test_value_class_shape() {
    let fixture = geometry();
    let unit = generate(&fixture.library, &GeneratorOptions::default());
    let point = class_section(&unit.source, "public unsafe partial struct Point");

    assert!(point.contains(
        "    internal Point(System.IntPtr native)\n        : this()\n    {\n        X = *(int*) (native + 0);\n        Y = *(int*) (native + 4);\n    }\n"
    ));
    assert!(point.contains(
        "    public Point(int x, int y)\n        : this()\n    {\n        var __this = new Point.Internal();\n        Internal.ctor_0(new System.IntPtr(&__this), x, y);\n        this = new Point(new System.IntPtr(&__this));\n    }\n"
    ));
    assert!(point.contains("    public int X;\n\n    public int Y;\n"));
    assert!(point.contains(
        "    public double Length()\n    {\n        var __marshal0 = new Point.Internal();\n        __marshal0.x = this.X;\n        __marshal0.y = this.Y;\n        var __ret = Internal.Length_1(new System.IntPtr(&__marshal0));\n        this = new Point(new System.IntPtr(&__marshal0));\n        return __ret;\n    }\n"
    ));
    assert!(!point.contains("Instance"));
}

#[test]
fn test_enum_delegate_and_free_functions() {
    let fixture = geometry();
    let unit = generate(&fixture.library, &GeneratorOptions::default());
    let source = &unit.source;

    assert!(source.starts_with("// <auto-generated>\n"));
    assert!(source.contains("using System;\nusing System.Runtime.InteropServices;\nusing System.Security;\n"));
    assert!(source.contains("public enum Color\n{\n    Red,\n    Green = 4,\n    Blue,\n}\n"));
    assert!(source.contains(
        "[SuppressUnmanagedCodeSecurity]\n[UnmanagedFunctionPointer(CallingConvention.Cdecl)]\npublic unsafe delegate void Callback(int arg0);\n"
    ));

    let free = class_section(source, "public unsafe partial class Native");
    assert!(free.contains("internal static extern double distance_0(Point.Internal a, Point.Internal b);"));
    assert!(free.contains(
        "    public static double distance(Point a, Point b)\n    {\n        var __marshal0 = new Point.Internal();\n        __marshal0.x = a.X;\n        __marshal0.y = a.Y;\n        var arg0 = __marshal0;\n        var __marshal1 = new Point.Internal();\n        __marshal1.x = b.X;\n        __marshal1.y = b.Y;\n        var arg1 = __marshal1;\n        var __ret = Internal.distance_0(arg0, arg1);\n        return __ret;\n    }\n"
    ));
}

#[test]
fn test_union_is_reported_and_omitted() {
    let fixture = geometry();
    let unit = generate(&fixture.library, &GeneratorOptions::default());

    assert_eq!(unit.diagnostics.len(), 1);
    let diagnostic = &unit.diagnostics[0];
    assert_eq!(diagnostic.declaration, "Variant");
    assert!(matches!(
        diagnostic.error,
        native_bridge::GenerateError::Unimplemented(_)
    ));
    assert!(!unit.source.contains("Variant"));
    // Siblings are still generated.
    assert!(unit.source.contains("public unsafe partial class Circle : Shape"));
}

#[test]
fn test_unsupported_field_is_omitted_everywhere() {
    let mut library = Library::new();
    let mut text = Class::new("Text", ClassKind::RefType, 8);
    text.fields.push(field("Glyph", "glyph", prim(Primitive::WideChar), 0));
    text.fields.push(field("Size", "size", int(), 4));
    let text = library.add_class(text);
    let mut unit = TranslationUnit::new("text");
    unit.root.classes.push(text);
    library.add_unit(unit);

    let unit = generate(&library, &GeneratorOptions::default());
    assert_eq!(unit.diagnostics.len(), 1);
    assert_eq!(unit.diagnostics[0].declaration, "Text::glyph");
    assert!(unit.diagnostics[0].error.is_unsupported());
    assert!(!unit.source.contains("glyph"));
    assert!(!unit.source.contains("Glyph"));
    assert!(unit.source.contains("        [FieldOffset(4)]\n        public int size;\n"));
    assert!(unit.source.contains("    public int Size\n"));
}

#[test]
fn test_microsoft_abi_constructor_passes_for_bases() -> Result<(), anyhow::Error> {
    let mut fixture = geometry();
    fixture.library.class_mut(fixture.shape)?.layout.has_virtual_bases = true;
    let mut options = GeneratorOptions::new("Shapes");
    options.microsoft_abi = true;

    let unit = generate(&fixture.library, &options);
    let shape = class_section(&unit.source, "public unsafe partial class Shape");
    assert!(shape.contains("internal static extern System.IntPtr ctor_0(System.IntPtr __instance, int id, int __forBases);"));
    assert!(shape.contains("        Internal.ctor_0(Instance, id, 1);\n"));
    assert!(shape.contains("[DllImport(\"Shapes.dll\""));
    Ok(())
}

#[test]
fn test_library_namespace_qualifies_references() {
    let fixture = geometry();
    let mut options = GeneratorOptions::new("Geo");
    options.generate_library_namespace = true;

    let unit = generate(&fixture.library, &options);
    assert!(unit.source.contains("namespace Geo\n{\n"));
    assert!(unit.source.contains("    public unsafe partial struct Point\n"));
    assert!(unit.source.contains("internal static extern double distance_0(Geo.Point.Internal a, Geo.Point.Internal b);"));
    assert!(unit.source.contains("var __marshal0 = new Geo.Point.Internal();"));
    assert!(unit.source.ends_with("}\n"));
}

#[test]
fn test_nested_namespaces() {
    let mut library = Library::new();
    let point = library.add_class(Class::new("Point", ClassKind::ValueType, 0));
    let mut inner = Namespace::named("math");
    inner.classes.push(point);
    let mut unit = TranslationUnit::new("math");
    unit.root.namespaces.push(inner);
    unit.root.namespaces.push(Namespace::named("empty"));
    library.add_unit(unit);

    let unit = generate(&library, &GeneratorOptions::default());
    assert!(unit.source.contains("namespace math\n{\n    public unsafe partial struct Point\n"));
    assert!(!unit.source.contains("namespace empty"));
}

#[test]
fn test_template_overrides_from_options() -> Result<(), anyhow::Error> {
    let mut library = Library::new();
    let mut string = TypedefDecl::new("string", Type::pointer_to(void()));
    string.namespace = vec!["std".to_string()];
    let string = library.add_typedef(string);

    let mut unit = TranslationUnit::new("names");
    unit.root.functions.push(Function::new("greeting", Type::Typedef(string)));
    unit.root.functions.push(
        Function::new("set_name", void()).with_param(Parameter::new("name", Type::Typedef(string))),
    );
    library.add_unit(unit);

    let mut options = GeneratorOptions::default();
    options.overrides.push(TemplateOverride {
        native_name: "std::string".to_string(),
        managed_type: "string".to_string(),
        native_type: "System.IntPtr".to_string(),
        to_managed: "StdString.Read({value})".to_string(),
        to_native: "StdString.Create({value})".to_string(),
        cleanup: Some("StdString.Free({arg});".to_string()),
        value_type: false,
    });

    let units = native_bridge::generate_source(&library, &options)?;
    let source = &units[0].source;
    assert!(source.contains("internal static extern System.IntPtr greeting_0();"));
    assert!(source.contains(
        "    public static string greeting()\n    {\n        var __ret = Internal.greeting_0();\n        return StdString.Read(__ret);\n    }\n"
    ));
    assert!(source.contains(
        "    public static void set_name(string name)\n    {\n        var arg0 = StdString.Create(name);\n        Internal.set_name_1(arg0);\n        StdString.Free(arg0);\n    }\n"
    ));
    assert!(units[0].diagnostics.is_empty());
    Ok(())
}

#[test]
fn test_dangling_namespace_reference_fails_generation() {
    let mut library = Library::new();
    let mut unit = TranslationUnit::new("broken");
    unit.root.classes.push(native_bridge::model::ClassId(7));
    library.add_unit(unit);

    let err = native_bridge::generate_source(&library, &GeneratorOptions::default()).unwrap_err();
    assert!(err.is_model());
}

#[test]
fn test_debug_comments_follow_option() {
    let mut fixture = geometry();
    if let Ok(shape) = fixture.library.class_mut(fixture.shape) {
        shape.debug_text = Some("class Shape {".to_string());
        shape.comment = Some("A drawable shape.".to_string());
    }

    let quiet = generate(&fixture.library, &GeneratorOptions::default());
    assert!(!quiet.source.contains("// DEBUG:"));
    assert!(quiet.source.contains("/// <summary>\n/// A drawable shape.\n/// </summary>\npublic unsafe partial class Shape"));

    let mut options = GeneratorOptions::default();
    options.output_debug = true;
    let verbose = generate(&fixture.library, &options);
    assert!(verbose.source.contains("// DEBUG: class Shape {\npublic unsafe partial class Shape"));
}
