//! Common test utilities and fixtures.
//!
//! Builds small native libraries programmatically so each test file can
//! generate bindings without a header parser.

#![allow(dead_code)]

use native_bridge::model::{
    BaseClassSpecifier, CallingConvention, Class, ClassId, ClassKind, EnumId, EnumItem,
    Enumeration, Field, Function, FunctionType, Library, Method, MethodKind, Namespace, Parameter,
    ParameterKind, Primitive, QualifiedType, TranslationUnit, Type, TypedefDecl, TypedefId,
};

// =============================================================================
// Type shorthands
// =============================================================================

pub fn prim(kind: Primitive) -> Type {
    Type::Primitive(kind)
}

pub fn int() -> Type {
    prim(Primitive::Int32)
}

pub fn double() -> Type {
    prim(Primitive::Double)
}

pub fn void() -> Type {
    prim(Primitive::Void)
}

/// `const char*`
pub fn c_string() -> Type {
    Type::pointer_to(QualifiedType::constant(prim(Primitive::Char)))
}

/// Field with a managed name distinct from its native spelling.
pub fn field(name: &str, original_name: &str, ty: Type, offset: u32) -> Field {
    let mut field = Field::new(name, ty, offset);
    field.original_name = original_name.to_string();
    field
}

pub fn base(id: ClassId) -> BaseClassSpecifier {
    BaseClassSpecifier {
        ty: Type::Tag(id),
        offset: 0,
        is_virtual: false,
    }
}

pub fn method(name: &str, ret: Type, kind: MethodKind) -> Method {
    Method::new(Function::new(name, ret), kind)
}

pub fn hidden_return_param() -> Parameter {
    let mut param = Parameter::new("__sret", Type::pointer_to(void()));
    param.kind = ParameterKind::HiddenStructureReturn;
    param
}

// =============================================================================
// Geometry fixture
// =============================================================================

/// Ids of the declarations in [`geometry`].
pub struct Geometry {
    pub library: Library,
    pub point: ClassId,
    pub shape: ClassId,
    pub circle: ClassId,
    pub variant: ClassId,
    pub color: EnumId,
    pub callback: TypedefId,
}

/// A small library exercising value types, reference types with
/// inheritance, a union, an enum, a callback typedef and a free function.
///
/// ```text
/// struct Point { int x; int y; Point(int, int); double length(); };
/// class Shape { int id; const char* label; Shape(int); double area();
///               ~Shape(); static int count(); };
/// class Circle : Shape { double radius; Circle(double); };
/// union Variant { int i; double d; };
/// enum Color { Red, Green = 4, Blue };
/// typedef void (*Callback)(int);
/// double distance(Point a, Point b);
/// ```
pub fn geometry() -> Geometry {
    let mut library = Library::new();

    let mut point = Class::new("Point", ClassKind::ValueType, 8);
    point.fields.push(field("X", "x", int(), 0));
    point.fields.push(field("Y", "y", int(), 4));
    let mut ctor = method("Point", void(), MethodKind::Constructor);
    ctor.function.params.push(Parameter::new("x", int()));
    ctor.function.params.push(Parameter::new("y", int()));
    point.methods.push(ctor);
    let mut length = method("Length", double(), MethodKind::Normal);
    length.function.original_name = "length".to_string();
    point.methods.push(length);
    let point = library.add_class(point);

    let mut shape = Class::new("Shape", ClassKind::RefType, 16);
    shape.fields.push(field("Id", "id", int(), 0));
    shape.fields.push(field("Label", "label", c_string(), 8));
    let mut ctor = method("Shape", void(), MethodKind::Constructor);
    ctor.function.mangled = "??0Shape@@QAE@H@Z".to_string();
    ctor.function.params.push(Parameter::new("id", int()));
    shape.methods.push(ctor);
    let mut area = method("Area", double(), MethodKind::Normal);
    area.function.original_name = "area".to_string();
    shape.methods.push(area);
    let mut dtor = method("~Shape", void(), MethodKind::Destructor);
    dtor.function.mangled = "??1Shape@@QAE@XZ".to_string();
    shape.methods.push(dtor);
    let mut count = method("Count", int(), MethodKind::Normal);
    count.is_static = true;
    shape.methods.push(count);
    let shape = library.add_class(shape);

    let mut circle = Class::new("Circle", ClassKind::RefType, 24);
    circle.bases.push(base(shape));
    circle.fields.push(field("Radius", "radius", double(), 16));
    let mut ctor = method("Circle", void(), MethodKind::Constructor);
    ctor.function.params.push(Parameter::new("r", double()));
    circle.methods.push(ctor);
    let circle = library.add_class(circle);

    let mut variant = Class::new("Variant", ClassKind::ValueType, 8);
    variant.is_union = true;
    variant.fields.push(field("I", "i", int(), 0));
    variant.fields.push(field("D", "d", double(), 0));
    let variant = library.add_class(variant);

    let color = library.add_enum(Enumeration {
        name: "Color".to_string(),
        original_name: "Color".to_string(),
        namespace: Vec::new(),
        items: vec![
            enum_item("Red", 0, false),
            enum_item("Green", 4, true),
            enum_item("Blue", 5, false),
        ],
        underlying: Primitive::Int32,
        is_flags: false,
        ignore: false,
        comment: None,
    });

    let callback = library.add_typedef(TypedefDecl::new(
        "Callback",
        Type::pointer_to(Type::Function(FunctionType {
            return_type: Box::new(void().into()),
            params: vec![int().into()],
            calling_convention: CallingConvention::C,
        })),
    ));

    let distance = Function::new("distance", double())
        .with_param(Parameter::new("a", Type::Tag(point)))
        .with_param(Parameter::new("b", Type::Tag(point)));

    let mut unit = TranslationUnit::new("geometry");
    unit.root = Namespace {
        enums: vec![color],
        typedefs: vec![callback],
        classes: vec![point, shape, circle, variant],
        functions: vec![distance],
        ..Namespace::default()
    };
    library.add_unit(unit);

    Geometry {
        library,
        point,
        shape,
        circle,
        variant,
        color,
        callback,
    }
}

fn enum_item(name: &str, value: i64, explicit_value: bool) -> EnumItem {
    EnumItem {
        name: name.to_string(),
        value,
        explicit_value,
        comment: None,
    }
}

/// Text of one generated class, from its prolog to the next top-level
/// declaration.
pub fn class_section<'s>(source: &'s str, prolog: &str) -> &'s str {
    let Some(rest) = source.find(prolog).and_then(|start| source.get(start..)) else {
        return "";
    };
    rest.find("\n}\n")
        .and_then(|end| rest.get(..end + 3))
        .unwrap_or(rest)
}
