//! Code Sinks
//!
//! The boundary between the engine and whatever writes source text. The
//! session calls a sink once per declared type, in registration order, after
//! generation has succeeded. References arrive pre-rendered as [`SinkType`]
//! trees, so a sink never sees the type graph.

pub mod rust;

pub use rust::RustSink;

use serde::Serialize;
use serde_json::Value;

use super::model::{DeclKind, PrimitiveType, TypeGraph, TypeId, TypeKind, TypeRef};

/// A type reference as a sink sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkType {
    Primitive { primitive: PrimitiveType },
    Declared { name: String, package: String, decl: DeclKind },
    List { element: Box<SinkType> },
    Set { element: Box<SinkType> },
    Any,
}

/// One field of a class declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDecl {
    pub name: String,
    pub json_name: String,
    pub ty: SinkType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Receives declarations from a finished session
pub trait CodeSink {
    type Handle;

    fn begin_type(&mut self, kind: DeclKind, name: &str, package: &str) -> Self::Handle;

    fn describe(&mut self, _handle: &Self::Handle, _description: &str) {}

    fn add_field(&mut self, handle: &Self::Handle, field: FieldDecl);

    /// Type of values allowed beyond the declared fields
    fn set_extension(&mut self, handle: &Self::Handle, value: SinkType);

    fn add_enum_constant(&mut self, handle: &Self::Handle, identifier: &str, literal: &Value);

    fn add_tuple_slot(&mut self, handle: &Self::Handle, slot: SinkType);

    fn set_alias_target(&mut self, handle: &Self::Handle, target: PrimitiveType);

    fn finish_type(&mut self, handle: Self::Handle);
}

/// Render a reference for a sink. Arrays are expanded structurally; a list
/// that (through other lists only) contains itself degrades to `Any`.
pub fn render(graph: &TypeGraph, ty: &TypeRef) -> SinkType {
    render_inner(graph, ty, &mut Vec::new())
}

fn render_inner(graph: &TypeGraph, ty: &TypeRef, visiting: &mut Vec<TypeId>) -> SinkType {
    let id = match ty {
        TypeRef::Primitive(primitive) => return SinkType::Primitive { primitive: *primitive },
        TypeRef::Any => return SinkType::Any,
        TypeRef::Named(id) => *id,
    };

    let target = graph.get(id);
    match &target.kind {
        TypeKind::ArrayOf { element, unique } => {
            if visiting.contains(&id) {
                return SinkType::Any;
            }
            visiting.push(id);
            let element = Box::new(render_inner(graph, element, visiting));
            visiting.pop();
            if *unique {
                SinkType::Set { element }
            } else {
                SinkType::List { element }
            }
        }
        kind => SinkType::Declared {
            name: target.name.clone(),
            package: target.package.clone(),
            decl: kind.decl_kind(),
        },
    }
}

// =============================================================================
// Recording Sink
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedConstant {
    pub identifier: String,
    pub literal: Value,
}

/// Everything a sink was told about one type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDecl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<SinkType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<RecordedConstant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<SinkType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<PrimitiveType>,
    #[serde(skip)]
    pub finished: bool,
}

/// Sink that keeps every declaration as data; backs the JSON model output
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingSink {
    declarations: Vec<Declaration>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    pub fn into_declarations(self) -> Vec<Declaration> {
        self.declarations
    }

    /// Pretty JSON dump of all declarations
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.declarations)
    }
}

impl CodeSink for RecordingSink {
    type Handle = usize;

    fn begin_type(&mut self, kind: DeclKind, name: &str, package: &str) -> usize {
        self.declarations.push(Declaration {
            kind,
            name: name.to_string(),
            package: package.to_string(),
            description: None,
            fields: Vec::new(),
            extension: None,
            constants: Vec::new(),
            slots: Vec::new(),
            alias_of: None,
            finished: false,
        });
        self.declarations.len() - 1
    }

    fn describe(&mut self, handle: &usize, description: &str) {
        self.declarations[*handle].description = Some(description.to_string());
    }

    fn add_field(&mut self, handle: &usize, field: FieldDecl) {
        self.declarations[*handle].fields.push(field);
    }

    fn set_extension(&mut self, handle: &usize, value: SinkType) {
        self.declarations[*handle].extension = Some(value);
    }

    fn add_enum_constant(&mut self, handle: &usize, identifier: &str, literal: &Value) {
        self.declarations[*handle].constants.push(RecordedConstant {
            identifier: identifier.to_string(),
            literal: literal.clone(),
        });
    }

    fn add_tuple_slot(&mut self, handle: &usize, slot: SinkType) {
        self.declarations[*handle].slots.push(slot);
    }

    fn set_alias_target(&mut self, handle: &usize, target: PrimitiveType) {
        self.declarations[*handle].alias_of = Some(target);
    }

    fn finish_type(&mut self, handle: usize) {
        self.declarations[handle].finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CanonicalId;
    use url::Url;

    fn identity(pointer: &str) -> CanonicalId {
        CanonicalId::new(Url::parse("file:///a.json").unwrap(), pointer)
    }

    #[test]
    fn test_render_expands_arrays() {
        let mut graph = TypeGraph::new();
        let node = graph.reserve("Node".into(), "m".into(), identity(""), None, DeclKind::Class);
        let list = graph.reserve("Children".into(), "m".into(), identity("/c"), None, DeclKind::ArrayOf);
        graph.fill(
            list,
            TypeKind::ArrayOf {
                element: TypeRef::Named(node),
                unique: true,
            },
        );

        let rendered = render(&graph, &TypeRef::Named(list));
        assert_eq!(
            rendered,
            SinkType::Set {
                element: Box::new(SinkType::Declared {
                    name: "Node".into(),
                    package: "m".into(),
                    decl: DeclKind::Class,
                })
            }
        );
    }

    #[test]
    fn test_self_containing_list_degrades() {
        let mut graph = TypeGraph::new();
        let list = graph.reserve("Loop".into(), "m".into(), identity(""), None, DeclKind::ArrayOf);
        graph.fill(
            list,
            TypeKind::ArrayOf {
                element: TypeRef::Named(list),
                unique: false,
            },
        );

        let rendered = render(&graph, &TypeRef::Named(list));
        assert_eq!(
            rendered,
            SinkType::List {
                element: Box::new(SinkType::Any)
            }
        );
    }
}
