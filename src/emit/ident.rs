//! Identifier escaping and naming helpers for generated C#.

use crate::model::CallingConvention;

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked", "class",
    "const", "continue", "decimal", "default", "delegate", "do", "double", "else", "enum", "event",
    "explicit", "extern", "false", "finally", "fixed", "float", "for", "foreach", "goto", "if",
    "implicit", "in", "int", "interface", "internal", "is", "lock", "long", "namespace", "new",
    "null", "object", "operator", "out", "override", "params", "private", "protected", "public",
    "readonly", "ref", "return", "sbyte", "sealed", "short", "sizeof", "stackalloc", "static",
    "string", "struct", "switch", "this", "throw", "true", "try", "typeof", "uint", "ulong",
    "unchecked", "unsafe", "ushort", "using", "virtual", "void", "volatile", "while",
];

/// Name of the handle property owned by reference types.
pub const INSTANCE_IDENTIFIER: &str = "Instance";

/// Make a native name usable as a C# identifier.
///
/// Keywords get the verbatim `@` prefix; characters outside `[A-Za-z0-9_]`
/// become `_`, and a leading digit is prefixed with `_`.
pub fn safe_identifier(name: &str) -> String {
    if CSHARP_KEYWORDS.contains(&name) {
        return format!("@{name}");
    }
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().is_none_or(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Identifier reserved for generated code, never clashing with user names.
pub fn generated_identifier(name: &str) -> String {
    format!("__{name}")
}

/// `CallingConvention` member matching a native convention.
pub fn calling_convention(cc: CallingConvention) -> &'static str {
    match cc {
        CallingConvention::Default => "Winapi",
        CallingConvention::C => "Cdecl",
        CallingConvention::StdCall => "StdCall",
        CallingConvention::ThisCall => "ThisCall",
        CallingConvention::FastCall => "FastCall",
    }
}

/// Qualification of managed type names.
///
/// When the generated code is wrapped in a library namespace, every type
/// reference is prefixed with it so that references resolve from any nested
/// native namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Naming {
    library_namespace: Option<String>,
}

impl Naming {
    pub fn new(library_namespace: Option<String>) -> Self {
        Self { library_namespace }
    }

    pub fn library_namespace(&self) -> Option<&str> {
        self.library_namespace.as_deref()
    }

    /// Qualify a dotted managed name, escaping every segment.
    pub fn qualified(&self, dotted: &str) -> String {
        let escaped: Vec<String> = dotted.split('.').map(safe_identifier).collect();
        let escaped = escaped.join(".");
        match &self.library_namespace {
            Some(ns) => format!("{}.{escaped}", safe_identifier(ns)),
            None => escaped,
        }
    }
}
