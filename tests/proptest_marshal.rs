//! Property-based tests for marshaling and call-site invariants.

mod common;

use common::*;
use native_bridge::emit::ident::safe_identifier;
use native_bridge::model::{Function, Library, Method, MethodKind, Parameter, Primitive, QualifiedType, Type};
use native_bridge::{
    CallSite, GeneratorOptions, Generator, MarshalContext, Receiver, TypeOverrides,
};
use proptest::prelude::*;

fn identity_primitive() -> impl Strategy<Value = Primitive> {
    prop::sample::select(
        Primitive::ALL
            .iter()
            .copied()
            .filter(|k| k.is_identity_marshaled())
            .collect::<Vec<_>>(),
    )
}

proptest! {
    #[test]
    fn primitives_pass_through_unchanged(kind in identity_primitive(), name in "[a-z][a-z0-9_]{0,12}") {
        let library = Library::new();
        let options = GeneratorOptions::default();
        let overrides = TypeOverrides::new();
        let generator = Generator::new(&library, &options, &overrides);
        let marshaller = generator.marshaller();
        let declared = QualifiedType::new(prim(kind));

        let to_native = marshaller
            .to_native(&MarshalContext::to_native(name.clone(), "arg0", &declared).with_cursor(5))
            .unwrap();
        prop_assert_eq!(&to_native.expr, &name);
        prop_assert!(to_native.before.is_empty());
        prop_assert!(to_native.cleanup.is_empty());
        prop_assert_eq!(to_native.cursor, 5);

        let to_managed = marshaller
            .to_managed(&MarshalContext::to_managed(name.clone(), &declared))
            .unwrap();
        prop_assert_eq!(&to_managed.expr, &name);
    }

    #[test]
    fn hidden_return_and_receiver_lead_the_arguments(count in 0usize..8) {
        let fixture = geometry();
        let options = GeneratorOptions::default();
        let overrides = TypeOverrides::new();
        let generator = Generator::new(&fixture.library, &options, &overrides);

        let mut function = Function::new("Bounds", Type::Tag(fixture.point))
            .with_param(hidden_return_param());
        function.has_hidden_struct_return = true;
        for index in 0..count {
            function = function.with_param(Parameter::new(format!("p{index}"), int()));
        }
        let method = Method::new(function, MethodKind::Normal);
        let site = CallSite::method(&method, "Bounds_0", Receiver::Handle("Instance".into()));
        let lines = generator.call_site(&site).unwrap();

        let mut args = vec!["new System.IntPtr(&__ret)".to_string(), "Instance".to_string()];
        args.extend((0..count).map(|i| format!("p{i}")));
        let call = format!("Internal.Bounds_0({});", args.join(", "));
        prop_assert_eq!(lines.len(), 3);
        prop_assert_eq!(&lines[1], &call);
    }

    #[test]
    fn each_string_argument_gets_one_cleanup(count in 1usize..6) {
        let library = Library::new();
        let options = GeneratorOptions::default();
        let overrides = TypeOverrides::new();
        let generator = Generator::new(&library, &options, &overrides);

        let mut function = Function::new("join", void());
        for index in 0..count {
            function = function.with_param(Parameter::new(format!("s{index}"), c_string()));
        }
        let lines = generator.call_site(&CallSite::function(&function, "join_0")).unwrap();

        let call = lines.iter().position(|l| l.starts_with("Internal.join_0(")).unwrap();
        let cleanups: Vec<&String> = lines
            .iter()
            .skip(call + 1)
            .filter(|l| l.starts_with("Marshal.FreeHGlobal("))
            .collect();
        prop_assert_eq!(cleanups.len(), count);
        prop_assert_eq!(lines.len(), 2 * count + 1);
    }

    #[test]
    fn safe_identifiers_are_well_formed(name in "\\PC{0,16}") {
        let ident = safe_identifier(&name);
        let body = ident.strip_prefix('@').unwrap_or(&ident);
        prop_assert!(!body.is_empty());
        prop_assert!(body.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        prop_assert!(!body.starts_with(|c: char| c.is_ascii_digit()));
    }
}
