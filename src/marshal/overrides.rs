//! Registry of custom marshaling strategies keyed by native type name.
//!
//! The registry is built by the caller and handed to the generator; the
//! engine consults it before the default rules for typedefs, template
//! specializations and reference classes.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{MarshalContext, MarshalError, Marshaled};

/// A custom conversion strategy for one native type.
pub trait TypeOverride {
    /// Managed spelling of the type in signatures.
    fn managed_type(&self) -> &str;

    /// Spelling of the type in `Internal` layouts and extern signatures.
    fn native_type(&self) -> &str;

    fn to_managed(&self, ctx: &MarshalContext<'_>) -> Result<Marshaled, MarshalError>;

    fn to_native(&self, ctx: &MarshalContext<'_>) -> Result<Marshaled, MarshalError>;

    /// Whether values of the type are copied by content at the boundary.
    fn is_value_type(&self) -> bool {
        false
    }
}

/// Native qualified name of a typedef, class or class template,
/// e.g. `std::basic_string`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverrideKey(String);

impl OverrideKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OverrideKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for OverrideKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for OverrideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
pub struct TypeOverrides {
    entries: HashMap<OverrideKey, Box<dyn TypeOverride>>,
}

impl TypeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from declarative overrides, e.g. loaded from config.
    pub fn from_templates(templates: impl IntoIterator<Item = TemplateOverride>) -> Self {
        let mut overrides = Self::new();
        for template in templates {
            overrides.register(template.native_name.clone(), template);
        }
        overrides
    }

    /// Register a strategy, replacing any previous one for the same key.
    pub fn register(&mut self, key: impl Into<OverrideKey>, strategy: impl TypeOverride + 'static) {
        self.entries.insert(key.into(), Box::new(strategy));
    }

    pub fn get(&self, native_name: &str) -> Option<&dyn TypeOverride> {
        self.entries
            .get(&OverrideKey::new(native_name))
            .map(|entry| entry.as_ref())
    }

    pub fn contains(&self, native_name: &str) -> bool {
        self.entries.contains_key(&OverrideKey::new(native_name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for TypeOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("TypeOverrides").field("keys", &keys).finish()
    }
}

type MarshalFn = Box<dyn Fn(&MarshalContext<'_>) -> Marshaled>;

/// Closure-backed override for ad-hoc registration.
///
/// ```ignore
/// let mut overrides = TypeOverrides::new();
/// overrides.register(
///     "std::string",
///     FnOverride::new(
///         "string",
///         "System.IntPtr",
///         |ctx| Marshaled::expr(format!("StdString.Read({})", ctx.value), ctx.cursor),
///         |ctx| Marshaled::expr(format!("StdString.Write({})", ctx.value), ctx.cursor),
///     ),
/// );
/// ```
pub struct FnOverride {
    managed: String,
    native: String,
    value_type: bool,
    to_managed: MarshalFn,
    to_native: MarshalFn,
}

impl FnOverride {
    pub fn new(
        managed: impl Into<String>,
        native: impl Into<String>,
        to_managed: impl Fn(&MarshalContext<'_>) -> Marshaled + 'static,
        to_native: impl Fn(&MarshalContext<'_>) -> Marshaled + 'static,
    ) -> Self {
        Self {
            managed: managed.into(),
            native: native.into(),
            value_type: false,
            to_managed: Box::new(to_managed),
            to_native: Box::new(to_native),
        }
    }

    pub fn value_type(mut self) -> Self {
        self.value_type = true;
        self
    }
}

impl TypeOverride for FnOverride {
    fn managed_type(&self) -> &str {
        &self.managed
    }

    fn native_type(&self) -> &str {
        &self.native
    }

    fn to_managed(&self, ctx: &MarshalContext<'_>) -> Result<Marshaled, MarshalError> {
        Ok((self.to_managed)(ctx))
    }

    fn to_native(&self, ctx: &MarshalContext<'_>) -> Result<Marshaled, MarshalError> {
        Ok((self.to_native)(ctx))
    }

    fn is_value_type(&self) -> bool {
        self.value_type
    }
}

/// Declarative override whose conversions are text templates.
///
/// `{value}` expands to the value being converted and `{arg}` to the
/// call-site temporary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateOverride {
    pub native_name: String,
    pub managed_type: String,
    pub native_type: String,
    pub to_managed: String,
    pub to_native: String,
    #[serde(default)]
    pub cleanup: Option<String>,
    #[serde(default)]
    pub value_type: bool,
}

impl TemplateOverride {
    fn render(template: &str, ctx: &MarshalContext<'_>) -> String {
        template
            .replace("{value}", &ctx.value)
            .replace("{arg}", &ctx.arg_name)
    }
}

impl TypeOverride for TemplateOverride {
    fn managed_type(&self) -> &str {
        &self.managed_type
    }

    fn native_type(&self) -> &str {
        &self.native_type
    }

    fn to_managed(&self, ctx: &MarshalContext<'_>) -> Result<Marshaled, MarshalError> {
        Ok(Marshaled::expr(Self::render(&self.to_managed, ctx), ctx.cursor))
    }

    fn to_native(&self, ctx: &MarshalContext<'_>) -> Result<Marshaled, MarshalError> {
        let mut marshaled = Marshaled::expr(Self::render(&self.to_native, ctx), ctx.cursor);
        if let Some(cleanup) = &self.cleanup {
            marshaled.cleanup.push(Self::render(cleanup, ctx));
        }
        Ok(marshaled)
    }

    fn is_value_type(&self) -> bool {
        self.value_type
    }
}
