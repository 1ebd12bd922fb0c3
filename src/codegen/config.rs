//! Codegen Configuration
//!
//! Two-tier configuration:
//! - Engine (NamingConfig, GenerationConfig): identifier rules and dispatch policy
//! - Per-language (RenderProfile): type mappings and escaping used by a sink
//!
//! Key principle: dispatch and caching are config-free apart from the
//! unsupported-construct policy. Only naming and rendering use configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// =============================================================================
// Naming
// =============================================================================

/// Casing convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Casing {
    PascalCase,
    CamelCase,
    SnakeCase,
    ScreamingSnakeCase,
}

/// Naming configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Acronyms to preserve (e.g., ID, URL, UUID, API)
    pub acronyms: BTreeSet<String>,

    /// Whether to preserve all-caps words in PascalCase names
    pub preserve_screaming_case: bool,

    /// Casing for class fields
    pub field_casing: Casing,

    /// Casing for enumeration constants
    pub constant_casing: Casing,

    /// Words no identifier may be
    pub reserved_words: BTreeSet<String>,

    /// Names generated types may not take (they would shadow the prelude)
    pub reserved_type_names: BTreeSet<String>,

    /// Appended to identifiers that hit a reserved word
    pub keyword_suffix: String,

    /// Used when sanitization leaves nothing
    pub fallback_type_name: String,
    pub fallback_field_name: String,
    pub fallback_constant_name: String,

    /// Cap on collision suffix attempts per name (None = unbounded)
    pub max_suffix_attempts: Option<usize>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            acronyms: ["ID", "URL", "UUID", "API", "HTTP", "JSON", "XML", "SQL", "URI", "UI", "IO"]
                .iter().map(|s| s.to_string()).collect(),
            preserve_screaming_case: false,
            field_casing: Casing::SnakeCase,
            constant_casing: Casing::PascalCase,
            reserved_words: RUST_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            reserved_type_names: RUST_PRELUDE_TYPES.iter().map(|s| s.to_string()).collect(),
            keyword_suffix: "_".to_string(),
            fallback_type_name: "Anonymous".to_string(),
            fallback_field_name: "field".to_string(),
            fallback_constant_name: "Empty".to_string(),
            max_suffix_attempts: None,
        }
    }
}

// =============================================================================
// Generation Policy
// =============================================================================

/// What the dispatcher does with a recognized but unimplemented construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedPolicy {
    /// Abort the session with `UnsupportedConstruct`
    #[default]
    Fail,
    /// Treat the construct as an unconstrained value and log a warning
    Degrade,
}

/// Engine-level generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Package generated types are placed in when the caller gives none
    pub default_package: String,

    /// Handling of allOf/anyOf/oneOf/not, type unions and `false` schemas
    pub unsupported: UnsupportedPolicy,

    /// Name used for array element types when no better hint exists
    pub element_suffix: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_package: "generated".to_string(),
            unsupported: UnsupportedPolicy::Fail,
            element_suffix: "Item".to_string(),
        }
    }
}

// =============================================================================
// Render Profile
// =============================================================================

/// Type mappings for JSON scalar types and formats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMappings {
    pub string: String,
    pub integer: String,
    pub long: String,
    pub number: String,
    pub boolean: String,
    pub null: String,

    /// Format-specific mappings
    pub datetime: String,
    pub date: String,
    pub time: String,
    pub uri: String,
    pub uuid: String,
    pub email: String,

    /// Unknown/any type
    pub any: String,
}

/// Language-specific rendering configuration used by source sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderProfile {
    pub types: TypeMappings,

    /// Prefix that turns a keyword into a raw identifier
    pub keyword_escape: String,

    /// Derives placed on every generated item
    pub derives: Vec<String>,
}

impl RenderProfile {
    /// Create the default Rust profile
    pub fn rust() -> Self {
        Self {
            types: TypeMappings {
                string: "String".to_string(),
                integer: "i64".to_string(),
                long: "i64".to_string(),
                number: "f64".to_string(),
                boolean: "bool".to_string(),
                null: "()".to_string(),
                datetime: "String".to_string(),
                date: "String".to_string(),
                time: "String".to_string(),
                uri: "String".to_string(),
                uuid: "String".to_string(),
                email: "String".to_string(),
                any: "serde_json::Value".to_string(),
            },
            keyword_escape: "r#".to_string(),
            derives: ["Debug", "Clone", "PartialEq", "Serialize", "Deserialize"]
                .iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Escape a keyword if needed
    pub fn escape_keyword(&self, name: &str) -> String {
        if RUST_KEYWORDS.contains(&name) && !matches!(name, "self" | "Self" | "super" | "crate") {
            format!("{}{}", self.keyword_escape, name)
        } else {
            name.to_string()
        }
    }

    /// Wrap a type to make it optional
    pub fn wrap_optional(&self, type_str: &str) -> String {
        format!("Option<{}>", type_str)
    }

    /// Wrap a type in a container (array)
    pub fn wrap_array(&self, type_str: &str) -> String {
        format!("Vec<{}>", type_str)
    }

    /// Wrap a type in a set-like container (uniqueItems)
    pub fn wrap_set(&self, type_str: &str) -> String {
        format!("std::collections::BTreeSet<{}>", type_str)
    }

    /// Wrap a type in a map
    pub fn wrap_map(&self, value_type: &str) -> String {
        format!("std::collections::BTreeMap<String, {}>", value_type)
    }

    /// Wrap a type in Box (for recursion)
    pub fn wrap_box(&self, type_str: &str) -> String {
        format!("Box<{}>", type_str)
    }
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self::rust()
    }
}

// =============================================================================
// Keywords
// =============================================================================

pub const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct",
    "super", "trait", "true", "type", "unsafe", "use", "where", "while",
    "async", "await", "dyn", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
];

const RUST_PRELUDE_TYPES: &[&str] = &[
    "String", "Vec", "Option", "Result", "Box", "Some", "None", "Ok", "Err",
    "Debug", "Clone", "Default", "Copy", "Send", "Sync", "Serialize", "Deserialize",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_profile_defaults() {
        let profile = RenderProfile::rust();
        assert_eq!(profile.types.string, "String");
        assert_eq!(profile.types.long, "i64");
        assert_eq!(profile.keyword_escape, "r#");
    }

    #[test]
    fn test_keyword_escape() {
        let rust = RenderProfile::rust();
        assert_eq!(rust.escape_keyword("type"), "r#type");
        assert_eq!(rust.escape_keyword("name"), "name");
    }

    #[test]
    fn test_wrap_containers() {
        let rust = RenderProfile::rust();
        assert_eq!(rust.wrap_array("i64"), "Vec<i64>");
        assert_eq!(rust.wrap_optional("String"), "Option<String>");
        assert_eq!(rust.wrap_map("String"), "std::collections::BTreeMap<String, String>");
    }

    #[test]
    fn test_policy_defaults_to_fail() {
        assert_eq!(GenerationConfig::default().unsupported, UnsupportedPolicy::Fail);
        let parsed: GenerationConfig = toml::from_str("unsupported = \"degrade\"").unwrap();
        assert_eq!(parsed.unsupported, UnsupportedPolicy::Degrade);
        assert_eq!(parsed.default_package, "generated");
    }
}
