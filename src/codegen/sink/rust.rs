//! Rust Source Sink
//!
//! Renders declarations as serde-ready Rust items using a [`RenderProfile`].
//!
//! Key constraints:
//! - Packages become nested `pub mod` blocks; cross-package paths are
//!   relative (`super::`), so the output can be included anywhere
//! - A direct reference to a struct that was already begun is boxed, which
//!   breaks every containment cycle (arrays and maps are already indirect)

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use super::{CodeSink, FieldDecl, SinkType};
use crate::codegen::config::RenderProfile;
use crate::codegen::model::{DeclKind, PrimitiveType};

const HEADER: &str = "// Generated by schema-typegen. Do not edit.\n";

/// Field name used for the flattened extension map
const EXTENSION_FIELD: &str = "additional_properties";

#[derive(Debug)]
struct OpenItem {
    kind: DeclKind,
    name: String,
    package: String,
    doc: Vec<String>,
    body: Vec<String>,
    field_names: HashSet<String>,
    slots: Vec<String>,
    alias_of: Option<String>,
    constants: Vec<(String, Value)>,
}

#[derive(Debug, Default)]
struct ModuleTree {
    items: Vec<String>,
    children: BTreeMap<String, ModuleTree>,
}

pub struct RustSink {
    profile: RenderProfile,
    items: Vec<OpenItem>,
    /// (package, name) of every struct-like item begun so far
    begun: HashSet<(String, String)>,
    modules: ModuleTree,
}

impl RustSink {
    pub fn new(profile: RenderProfile) -> Self {
        Self {
            profile,
            items: Vec::new(),
            begun: HashSet::new(),
            modules: ModuleTree::default(),
        }
    }

    /// Complete source file for everything emitted so far
    pub fn into_source(self) -> String {
        let mut output = String::from(HEADER);
        write_module(&mut output, &self.modules, 0);
        output
    }

    // =========================================================================
    // Type Rendering
    // =========================================================================

    fn rust_type(&self, ty: &SinkType, from_package: &str) -> String {
        match ty {
            SinkType::Primitive { primitive } => self.primitive(*primitive).to_string(),
            SinkType::Declared { name, package, .. } => type_path(from_package, package, name),
            SinkType::List { element } => self.profile.wrap_array(&self.rust_type(element, from_package)),
            SinkType::Set { element } if is_ordered(element) => {
                self.profile.wrap_set(&self.rust_type(element, from_package))
            }
            SinkType::Set { element } => self.profile.wrap_array(&self.rust_type(element, from_package)),
            SinkType::Any => self.profile.types.any.clone(),
        }
    }

    /// Like [`RustSink::rust_type`], boxing back references to structs
    fn member_type(&self, ty: &SinkType, from_package: &str) -> String {
        let rendered = self.rust_type(ty, from_package);
        match ty {
            SinkType::Declared { name, package, decl: DeclKind::Class | DeclKind::Tuple }
                if self.begun.contains(&(package.clone(), name.clone())) =>
            {
                self.profile.wrap_box(&rendered)
            }
            _ => rendered,
        }
    }

    fn primitive(&self, primitive: PrimitiveType) -> &str {
        let types = &self.profile.types;
        match primitive {
            PrimitiveType::String => &types.string,
            PrimitiveType::Integer => &types.integer,
            PrimitiveType::Long => &types.long,
            PrimitiveType::Number => &types.number,
            PrimitiveType::Boolean => &types.boolean,
            PrimitiveType::Null => &types.null,
            PrimitiveType::DateTime => &types.datetime,
            PrimitiveType::Date => &types.date,
            PrimitiveType::Time => &types.time,
            PrimitiveType::Uri => &types.uri,
            PrimitiveType::Uuid => &types.uuid,
            PrimitiveType::Email => &types.email,
        }
    }

    fn derive_line(&self) -> String {
        format!("#[derive({})]", self.profile.derives.join(", "))
    }

    // =========================================================================
    // Item Emission
    // =========================================================================

    fn emit_item(&self, item: &OpenItem) -> String {
        let mut output = String::new();
        for line in &item.doc {
            output.push_str(&format!("/// {}\n", line));
        }

        match item.kind {
            DeclKind::Class => {
                output.push_str(&self.derive_line());
                output.push('\n');
                emit_block(&mut output, "struct", &item.name, &item.body);
            }
            DeclKind::Enumeration if item.constants.iter().all(|(_, v)| v.is_string()) => {
                output.push_str(&self.derive_line());
                output.push('\n');
                let mut body = Vec::with_capacity(item.constants.len() * 2);
                for (variant, literal) in &item.constants {
                    if let Value::String(s) = literal {
                        if s != variant {
                            body.push(format!("#[serde(rename = {:?})]", s));
                        }
                    }
                    body.push(format!("{},", variant));
                }
                emit_block(&mut output, "enum", &item.name, &body);
            }
            DeclKind::Enumeration => {
                output.push_str(&self.derive_line());
                output.push('\n');
                output.push_str("#[serde(try_from = \"serde_json::Value\", into = \"serde_json::Value\")]\n");
                let body: Vec<String> = item.constants.iter().map(|(v, _)| format!("{v},")).collect();
                emit_block(&mut output, "enum", &item.name, &body);
                emit_literal_conversions(&mut output, &item.name, &item.constants);
            }
            DeclKind::Tuple => {
                output.push_str(&self.derive_line());
                output.push('\n');
                let slots: Vec<String> = item.slots.iter().map(|s| format!("pub {s}")).collect();
                output.push_str(&format!("pub struct {}({});\n", item.name, slots.join(", ")));
            }
            DeclKind::Alias => {
                let target = item.alias_of.as_deref().unwrap_or(&self.profile.types.any);
                output.push_str(&format!("pub type {} = {};\n", item.name, target));
            }
            // never declared
            DeclKind::ArrayOf => {}
        }

        output
    }
}

impl Default for RustSink {
    fn default() -> Self {
        Self::new(RenderProfile::rust())
    }
}

impl CodeSink for RustSink {
    type Handle = usize;

    fn begin_type(&mut self, kind: DeclKind, name: &str, package: &str) -> usize {
        if matches!(kind, DeclKind::Class | DeclKind::Tuple) {
            self.begun.insert((package.to_string(), name.to_string()));
        }
        self.items.push(OpenItem {
            kind,
            name: name.to_string(),
            package: package.to_string(),
            doc: Vec::new(),
            body: Vec::new(),
            field_names: HashSet::new(),
            slots: Vec::new(),
            alias_of: None,
            constants: Vec::new(),
        });
        self.items.len() - 1
    }

    fn describe(&mut self, handle: &usize, description: &str) {
        self.items[*handle].doc.extend(description.lines().map(|l| l.trim_end().to_string()));
    }

    fn add_field(&mut self, handle: &usize, field: FieldDecl) {
        let package = self.items[*handle].package.clone();
        let mut lines = Vec::new();

        if let Some(description) = &field.description {
            lines.extend(description.lines().map(|l| format!("/// {}", l.trim_end())));
        }
        if let Some(default) = &field.default {
            lines.push(format!("/// Default: `{}`", default));
        }
        if field.name != field.json_name {
            lines.push(format!("#[serde(rename = {:?})]", field.json_name));
        }

        let rust_type = self.member_type(&field.ty, &package);
        let full_type = if field.required {
            rust_type
        } else {
            lines.push("#[serde(default, skip_serializing_if = \"Option::is_none\")]".to_string());
            self.profile.wrap_optional(&rust_type)
        };

        let field_name = self.profile.escape_keyword(&field.name);
        lines.push(format!("pub {}: {},", field_name, full_type));

        let item = &mut self.items[*handle];
        item.field_names.insert(field.name);
        item.body.extend(lines);
    }

    fn set_extension(&mut self, handle: &usize, value: SinkType) {
        let package = self.items[*handle].package.clone();
        let value_type = self.rust_type(&value, &package);
        let map_type = self.profile.wrap_map(&value_type);

        let item = &mut self.items[*handle];
        let mut field_name = EXTENSION_FIELD.to_string();
        while item.field_names.contains(&field_name) {
            field_name.push('_');
        }
        item.body.push("#[serde(flatten)]".to_string());
        item.body.push(format!("pub {}: {},", field_name, map_type));
        item.field_names.insert(field_name);
    }

    fn add_enum_constant(&mut self, handle: &usize, identifier: &str, literal: &Value) {
        let variant = self.profile.escape_keyword(identifier);
        self.items[*handle].constants.push((variant, literal.clone()));
    }

    fn add_tuple_slot(&mut self, handle: &usize, slot: SinkType) {
        let package = self.items[*handle].package.clone();
        let rendered = self.member_type(&slot, &package);
        self.items[*handle].slots.push(rendered);
    }

    fn set_alias_target(&mut self, handle: &usize, target: PrimitiveType) {
        let rendered = self.primitive(target).to_string();
        self.items[*handle].alias_of = Some(rendered);
    }

    fn finish_type(&mut self, handle: usize) {
        let rendered = self.emit_item(&self.items[handle]);
        let package = self.items[handle].package.clone();

        let mut module = &mut self.modules;
        for segment in module_path(&package) {
            module = module.children.entry(segment).or_default();
        }
        module.items.push(rendered);
    }
}

// =============================================================================
// Helper Utilities
// =============================================================================

fn emit_block(output: &mut String, keyword: &str, name: &str, body: &[String]) {
    if body.is_empty() {
        output.push_str(&format!("pub {} {} {{}}\n", keyword, name));
        return;
    }
    output.push_str(&format!("pub {} {} {{\n", keyword, name));
    for line in body {
        output.push_str(&format!("    {}\n", line));
    }
    output.push_str("}\n");
}

/// `TryFrom`/`From` pair over `serde_json::Value` for enums with
/// non-string literals, which serde renames cannot express
fn emit_literal_conversions(output: &mut String, name: &str, constants: &[(String, Value)]) {
    output.push('\n');
    output.push_str(&format!("impl TryFrom<serde_json::Value> for {name} {{\n"));
    output.push_str("    type Error = String;\n\n");
    output.push_str("    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {\n");
    for (variant, literal) in constants {
        output.push_str(&format!(
            "        if value == serde_json::json!({}) {{\n            return Ok(Self::{});\n        }}\n",
            literal_tokens(literal),
            variant
        ));
    }
    output.push_str(&format!("        Err(format!(\"unknown {name} literal: {{}}\", value))\n"));
    output.push_str("    }\n}\n\n");

    output.push_str(&format!("impl From<{name}> for serde_json::Value {{\n"));
    output.push_str(&format!("    fn from(value: {name}) -> Self {{\n"));
    output.push_str("        match value {\n");
    for (variant, literal) in constants {
        output.push_str(&format!(
            "            {name}::{variant} => serde_json::json!({}),\n",
            literal_tokens(literal)
        ));
    }
    output.push_str("        }\n    }\n}\n");
}

/// Literal as `json!` macro input
fn literal_tokens(literal: &Value) -> String {
    match literal {
        Value::String(s) => format!("{:?}", s),
        other => other.to_string(),
    }
}

fn write_module(output: &mut String, module: &ModuleTree, depth: usize) {
    let indent = "    ".repeat(depth);
    let mut first = true;
    let mut separate = |output: &mut String| {
        if !std::mem::take(&mut first) {
            output.push('\n');
        }
    };

    if !module.items.is_empty() {
        separate(output);
        output.push_str(&format!("{indent}use serde::{{Deserialize, Serialize}};\n"));
    }
    for item in &module.items {
        separate(output);
        for line in item.lines() {
            if line.is_empty() {
                output.push('\n');
            } else {
                output.push_str(&format!("{indent}{line}\n"));
            }
        }
    }
    for (name, child) in &module.children {
        separate(output);
        output.push_str(&format!("{indent}pub mod {name} {{\n"));
        write_module(output, child, depth + 1);
        output.push_str(&format!("{indent}}}\n"));
    }
}

/// Module segments for a dotted package name
fn module_path(package: &str) -> Vec<String> {
    package
        .split('.')
        .filter(|s| !s.is_empty())
        .map(module_ident)
        .collect()
}

fn module_ident(segment: &str) -> String {
    let mut ident = to_snake_case(segment);
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if crate::codegen::config::RUST_KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Path to `name` in package `to`, as written from package `from`
fn type_path(from: &str, to: &str, name: &str) -> String {
    if from == to {
        return name.to_string();
    }
    let mut path = "super::".repeat(module_path(from).len());
    for segment in module_path(to) {
        path.push_str(&segment);
        path.push_str("::");
    }
    path.push_str(name);
    path
}

/// Whether the rendered element type implements `Ord`
fn is_ordered(ty: &SinkType) -> bool {
    match ty {
        SinkType::Primitive { primitive } => !matches!(primitive, PrimitiveType::Number | PrimitiveType::Null),
        _ => false,
    }
}

/// Convert to snake_case
fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            result.push('_');
            prev_lower = false;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn declared(name: &str, package: &str, decl: DeclKind) -> SinkType {
        SinkType::Declared {
            name: name.into(),
            package: package.into(),
            decl,
        }
    }

    fn string() -> SinkType {
        SinkType::Primitive {
            primitive: PrimitiveType::String,
        }
    }

    #[test]
    fn test_type_paths() {
        assert_eq!(type_path("model", "model", "Address"), "Address");
        assert_eq!(type_path("", "shared.geo", "Point"), "shared::geo::Point");
        assert_eq!(type_path("model.person", "shared", "Id"), "super::super::shared::Id");
        assert_eq!(module_ident("Type"), "type_");
        assert_eq!(to_snake_case("HomeAddress"), "home_address");
    }

    #[test]
    fn test_struct_emission() {
        let mut sink = RustSink::default();
        let person = sink.begin_type(DeclKind::Class, "Person", "");
        sink.describe(&person, "A person");
        sink.add_field(
            &person,
            FieldDecl {
                name: "first_name".into(),
                json_name: "firstName".into(),
                ty: string(),
                required: true,
                description: None,
                default: None,
            },
        );
        sink.add_field(
            &person,
            FieldDecl {
                name: "tags".into(),
                json_name: "tags".into(),
                ty: SinkType::Set {
                    element: Box::new(string()),
                },
                required: false,
                description: None,
                default: None,
            },
        );
        sink.finish_type(person);

        let expected = "\
// Generated by schema-typegen. Do not edit.
use serde::{Deserialize, Serialize};

/// A person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(rename = \"firstName\")]
    pub first_name: String,
    #[serde(default, skip_serializing_if = \"Option::is_none\")]
    pub tags: Option<std::collections::BTreeSet<String>>,
}
";
        assert_eq!(sink.into_source(), expected);
    }

    #[test]
    fn test_back_references_are_boxed() {
        let mut sink = RustSink::default();
        let node = sink.begin_type(DeclKind::Class, "Node", "");
        sink.add_field(
            &node,
            FieldDecl {
                name: "parent".into(),
                json_name: "parent".into(),
                ty: declared("Node", "", DeclKind::Class),
                required: false,
                description: None,
                default: None,
            },
        );
        sink.add_field(
            &node,
            FieldDecl {
                name: "children".into(),
                json_name: "children".into(),
                ty: SinkType::List {
                    element: Box::new(declared("Node", "", DeclKind::Class)),
                },
                required: true,
                description: None,
                default: None,
            },
        );
        sink.set_extension(&node, SinkType::Any);
        sink.finish_type(node);

        let source = sink.into_source();
        assert!(source.contains("pub parent: Option<Box<Node>>,"));
        assert!(source.contains("pub children: Vec<Node>,"));
        assert!(source.contains("#[serde(flatten)]\n    pub additional_properties: std::collections::BTreeMap<String, serde_json::Value>,"));
    }

    #[test]
    fn test_enum_tuple_and_alias_in_packages() {
        let mut sink = RustSink::default();

        let status = sink.begin_type(DeclKind::Enumeration, "Status", "model");
        sink.add_enum_constant(&status, "Active", &json!("active"));
        sink.add_enum_constant(&status, "Done", &json!("Done"));
        sink.finish_type(status);

        let pair = sink.begin_type(DeclKind::Tuple, "Pair", "model");
        sink.add_tuple_slot(&pair, string());
        sink.add_tuple_slot(&pair, declared("Status", "model", DeclKind::Enumeration));
        sink.finish_type(pair);

        let name = sink.begin_type(DeclKind::Alias, "Name", "shared");
        sink.set_alias_target(&name, PrimitiveType::String);
        sink.finish_type(name);

        let source = sink.into_source();
        assert!(source.contains("pub mod model {"));
        assert!(source.contains("        #[serde(rename = \"active\")]\n        Active,\n        Done,\n"));
        assert!(source.contains("    pub struct Pair(pub String, pub Status);"));
        assert!(!source.contains("try_from"));
        assert!(source.contains("pub mod shared {\n    use serde::{Deserialize, Serialize};\n\n    pub type Name = String;\n}"));
    }

    #[test]
    fn test_numeric_enum_converts_through_json_values() {
        let mut sink = RustSink::default();
        let level = sink.begin_type(DeclKind::Enumeration, "Level", "");
        sink.add_enum_constant(&level, "_1", &json!(1));
        sink.add_enum_constant(&level, "_2", &json!(2));
        sink.add_enum_constant(&level, "Off", &json!("off"));
        sink.finish_type(level);

        let source = sink.into_source();
        assert!(source.contains(
            "#[serde(try_from = \"serde_json::Value\", into = \"serde_json::Value\")]\npub enum Level {\n    _1,\n    _2,\n    Off,\n}"
        ));
        assert!(!source.contains("rename = \"1\""));
        assert!(source.contains("        if value == serde_json::json!(1) {\n            return Ok(Self::_1);\n        }"));
        assert!(source.contains("        if value == serde_json::json!(\"off\") {"));
        assert!(source.contains("            Level::_2 => serde_json::json!(2),"));
        assert!(source.contains("impl From<Level> for serde_json::Value {"));
    }
}
