//! Generator configuration parsing.

use serde::Deserialize;
use std::path::Path;

use crate::marshal::TemplateOverride;

/// Generator options loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Library name; names the free-function class and the default DLL.
    pub library_name: String,
    /// Shared library passed to `DllImport` (defaults to `<library_name>.dll`).
    pub shared_library: Option<String>,
    /// Namespace wrapping all output (defaults to the library name).
    pub output_namespace: Option<String>,
    /// Wrap output in the library namespace and qualify type references with it.
    pub generate_library_namespace: bool,
    /// Target the Microsoft C++ ABI (constructor return values, `__forBases`).
    pub microsoft_abi: bool,
    /// Emit `// DEBUG:` comments carrying the native declaration text.
    pub output_debug: bool,
    /// Declarative type overrides.
    pub overrides: Vec<TemplateOverride>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            library_name: "Native".to_string(),
            shared_library: None,
            output_namespace: None,
            generate_library_namespace: false,
            microsoft_abi: false,
            output_debug: false,
            overrides: Vec::new(),
        }
    }
}

impl GeneratorOptions {
    pub fn new(library_name: impl Into<String>) -> Self {
        Self {
            library_name: library_name.into(),
            ..Self::default()
        }
    }

    /// Load options from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().display().to_string(), e))?;
        Self::from_str(&content)
    }

    /// Parse options from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Library file named in `DllImport` attributes.
    pub fn dll_name(&self) -> String {
        self.shared_library
            .clone()
            .unwrap_or_else(|| format!("{}.dll", self.library_name))
    }

    /// Namespace wrapping the output, if enabled.
    pub fn library_namespace(&self) -> Option<String> {
        if !self.generate_library_namespace {
            return None;
        }
        Some(
            self.output_namespace
                .clone()
                .unwrap_or_else(|| self.library_name.clone()),
        )
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(String, std::io::Error),
    /// TOML parse error.
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Failed to read config file '{}': {}", path, e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
