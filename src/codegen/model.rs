//! Generated Type Model
//!
//! Language-agnostic descriptors for everything the rules produce. Types live
//! in an arena ([`TypeGraph`]) and are referred to by [`TypeId`], so two
//! references to the same schema share one entry: identity, not equality.

use serde::Serialize;
use serde_json::Value;

use crate::schema::CanonicalId;

/// Handle of a generated type inside one session's [`TypeGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Scalar types after `format` refinement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    String,
    Integer,
    Long,
    Number,
    Boolean,
    Null,
    DateTime,
    Date,
    Time,
    Uri,
    Uuid,
    Email,
}

/// What a field, slot or element points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Primitive(PrimitiveType),
    Named(TypeId),
    /// Unconstrained value (untyped schema, degraded construct)
    Any,
}

/// Extension slot of a class, from `additionalProperties`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Extension {
    /// `additionalProperties: false`
    Closed,
    /// Absent or `true`: any extra value
    Open,
    /// A schema: extra values of that type
    Typed(TypeRef),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Identifier, unique within the class
    pub name: String,
    /// Original property key
    pub json_name: String,
    pub ty: TypeRef,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumConstant {
    pub identifier: String,
    /// The `enum` entry this constant stands for
    pub literal: Value,
}

/// Tag of a generated type, known before its body is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Class,
    Enumeration,
    ArrayOf,
    Tuple,
    Alias,
}

impl DeclKind {
    /// Whether a sink receives a declaration for this kind.
    /// Arrays are structural and only show up inside type references.
    pub fn is_declared(self) -> bool {
        !matches!(self, DeclKind::ArrayOf)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeKind {
    /// Placeholder registered before a rule recurses into the body
    Pending { decl: DeclKind },
    Class { fields: Vec<Field>, extension: Extension },
    Enumeration { constants: Vec<EnumConstant> },
    ArrayOf { element: TypeRef, unique: bool },
    Tuple { slots: Vec<TypeRef> },
    Alias { target: PrimitiveType },
}

impl TypeKind {
    pub fn decl_kind(&self) -> DeclKind {
        match self {
            TypeKind::Pending { decl } => *decl,
            TypeKind::Class { .. } => DeclKind::Class,
            TypeKind::Enumeration { .. } => DeclKind::Enumeration,
            TypeKind::ArrayOf { .. } => DeclKind::ArrayOf,
            TypeKind::Tuple { .. } => DeclKind::Tuple,
            TypeKind::Alias { .. } => DeclKind::Alias,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TypeKind::Pending { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedType {
    pub id: TypeId,
    pub name: String,
    pub package: String,
    /// Schema this type was generated from
    pub identity: CanonicalId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: TypeKind,
}

/// Arena of generated types, in registration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeGraph {
    types: Vec<GeneratedType>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending type and return its handle
    pub fn reserve(
        &mut self,
        name: String,
        package: String,
        identity: CanonicalId,
        description: Option<String>,
        decl: DeclKind,
    ) -> TypeId {
        let id = TypeId(self.types.len());
        self.types.push(GeneratedType {
            id,
            name,
            package,
            identity,
            description,
            kind: TypeKind::Pending { decl },
        });
        id
    }

    /// Replace a pending body in place
    pub fn fill(&mut self, id: TypeId, kind: TypeKind) {
        let slot = &mut self.types[id.0];
        debug_assert_eq!(slot.kind.decl_kind(), kind.decl_kind());
        slot.kind = kind;
    }

    pub fn get(&self, id: TypeId) -> &GeneratedType {
        &self.types[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Types a sink should receive declarations for
    pub fn declared(&self) -> impl Iterator<Item = &GeneratedType> {
        self.types.iter().filter(|t| t.kind.decl_kind().is_declared())
    }

    /// First declared type with this name, in any package
    pub fn find(&self, name: &str) -> Option<&GeneratedType> {
        self.declared().find(|t| t.name == name)
    }

    /// Types whose rule never completed
    pub fn pending(&self) -> impl Iterator<Item = &GeneratedType> {
        self.types.iter().filter(|t| t.kind.is_pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_reserve_then_fill() {
        let identity = CanonicalId::new(Url::parse("file:///a.json").unwrap(), "");
        let mut graph = TypeGraph::new();
        let id = graph.reserve("Node".into(), "model".into(), identity, None, DeclKind::Class);

        assert_eq!(graph.pending().count(), 1);
        graph.fill(
            id,
            TypeKind::Class {
                fields: vec![],
                extension: Extension::Closed,
            },
        );
        assert_eq!(graph.pending().count(), 0);
        assert_eq!(graph.find("Node").map(|t| t.id), Some(id));
    }
}
