//! Schema Nodes and Canonical Identity
//!
//! A schema node is a resolved piece of a JSON Schema document together with
//! its canonical identity and its declared kind. Kind detection is pure
//! pattern matching on the raw JSON; no generation decisions happen here.

pub mod store;

pub use store::{DocumentFetcher, FetcherChain, FileFetcher, MemoryFetcher, SchemaStore};

use std::fmt;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{Result, TypegenError};

/// Keywords this engine recognizes but does not generate types for
pub const COMBINATOR_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf", "not"];

// =============================================================================
// Canonical Identity
// =============================================================================

/// Normalized (document URI, JSON pointer) pair identifying one schema node.
///
/// The document never carries a fragment. The pointer is stored decoded from
/// percent-encoding, with `~0`/`~1` escapes intact, and `""` is the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalId {
    document: Url,
    pointer: String,
}

impl CanonicalId {
    pub fn new(mut document: Url, pointer: impl Into<String>) -> Self {
        document.set_fragment(None);
        Self {
            document,
            pointer: pointer.into(),
        }
    }

    /// Build an identity from an absolute URI, reading its fragment as a JSON pointer
    pub fn from_url(url: &Url) -> Result<Self> {
        let fragment = url.fragment().unwrap_or("");
        let pointer = percent_decode_str(fragment)
            .decode_utf8()
            .map_err(|e| TypegenError::SchemaMalformed {
                id: url.to_string(),
                reason: format!("fragment is not valid UTF-8: {e}"),
            })?
            .into_owned();

        if !pointer.is_empty() && !pointer.starts_with('/') {
            return Err(TypegenError::SchemaMalformed {
                id: url.to_string(),
                reason: format!("fragment `{pointer}` is not a JSON pointer"),
            });
        }

        Ok(Self::new(url.clone(), pointer))
    }

    /// The document URI, without fragment
    pub fn document(&self) -> &Url {
        &self.document
    }

    /// The JSON pointer into the document
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    pub fn is_document_root(&self) -> bool {
        self.pointer.is_empty()
    }

    /// Identity of a node nested below this one
    pub fn child<S: AsRef<str>>(&self, segments: &[S]) -> Self {
        let mut pointer = self.pointer.clone();
        for segment in segments {
            pointer.push('/');
            pointer.push_str(&escape_segment(segment.as_ref()));
        }
        Self {
            document: self.document.clone(),
            pointer,
        }
    }

    /// Last unescaped pointer segment, if any
    pub fn last_segment(&self) -> Option<String> {
        if self.pointer.is_empty() {
            return None;
        }
        self.pointer.rsplit('/').next().map(unescape_segment)
    }

    /// File stem of the document (`address` for `.../address.schema.json`)
    pub fn document_stem(&self) -> Option<String> {
        let file = self.document.path_segments()?.next_back()?;
        let stem = file
            .trim_end_matches(".json")
            .trim_end_matches(".schema");
        if stem.is_empty() {
            None
        } else {
            percent_decode_str(stem).decode_utf8().ok().map(|s| s.into_owned())
        }
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document, self.pointer)
    }
}

impl Serialize for CanonicalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

// =============================================================================
// Schema Kind
// =============================================================================

/// JSON scalar type (before format refinement)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JsonScalarKind {
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

impl JsonScalarKind {
    pub fn from_json_type(type_str: &str) -> Option<Self> {
        match type_str {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }
}

/// Declared kind of a schema node, one case per construct the dispatcher handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    /// `{"$ref": "..."}`
    Reference(String),
    /// `{"enum": [...]}`
    Enumeration,
    /// `{"type": "object"}`, or `properties`/`additionalProperties` present
    Object,
    /// `{"type": "array"}`, or `items` present
    Array,
    /// `{"type": "string" | "integer" | "number" | "boolean" | "null"}`
    Primitive(JsonScalarKind),
    /// No discriminator at all (`{}` or `true`)
    Untyped,
    /// Recognized but not generated (combinators, type unions, `false`)
    Unsupported(String),
}

/// Detect the declared kind of a raw schema value
pub fn detect_kind(id: &CanonicalId, content: &Value) -> Result<SchemaKind> {
    let obj = match content {
        Value::Object(obj) => obj,
        Value::Bool(true) => return Ok(SchemaKind::Untyped),
        Value::Bool(false) => return Ok(SchemaKind::Unsupported("false schema".to_string())),
        other => {
            return Err(TypegenError::malformed(
                id,
                format!("expected a schema object, found {}", json_type_name(other)),
            ))
        }
    };

    if let Some(reference) = obj.get("$ref") {
        return match reference.as_str() {
            Some(r) => Ok(SchemaKind::Reference(r.to_string())),
            None => Err(TypegenError::malformed(id, "`$ref` must be a string")),
        };
    }

    if obj.contains_key("enum") {
        return Ok(SchemaKind::Enumeration);
    }

    if let Some(keyword) = COMBINATOR_KEYWORDS.iter().find(|k| obj.contains_key(**k)) {
        return Ok(SchemaKind::Unsupported((*keyword).to_string()));
    }

    let declared = match declared_type(id, obj)? {
        DeclaredType::Single(t) => Some(t),
        DeclaredType::Absent => None,
        DeclaredType::Union(types) => {
            return Ok(SchemaKind::Unsupported(format!("type union [{}]", types.join(", "))));
        }
    };

    if declared == Some("object") || obj.contains_key("properties") {
        return Ok(SchemaKind::Object);
    }
    if declared == Some("array") {
        return Ok(SchemaKind::Array);
    }
    // draft 3
    if declared == Some("any") {
        return Ok(SchemaKind::Untyped);
    }
    if let Some(t) = declared {
        return JsonScalarKind::from_json_type(t)
            .map(SchemaKind::Primitive)
            .ok_or_else(|| TypegenError::malformed(id, format!("unknown type `{t}`")));
    }

    if obj.contains_key("additionalProperties") {
        Ok(SchemaKind::Object)
    } else if obj.contains_key("items") {
        Ok(SchemaKind::Array)
    } else {
        Ok(SchemaKind::Untyped)
    }
}

enum DeclaredType<'a> {
    Absent,
    Single(&'a str),
    Union(Vec<&'a str>),
}

/// Read `type`, collapsing `["T", "null"]` to `T`
fn declared_type<'a>(id: &CanonicalId, obj: &'a Map<String, Value>) -> Result<DeclaredType<'a>> {
    match obj.get("type") {
        None => Ok(DeclaredType::Absent),
        Some(Value::String(t)) => Ok(DeclaredType::Single(t)),
        Some(Value::Array(items)) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(name) => names.push(name),
                    None => return Err(TypegenError::malformed(id, "`type` entries must be strings")),
                }
            }
            let non_null: Vec<&str> = names.iter().copied().filter(|t| *t != "null").collect();
            match non_null.len() {
                0 if names.is_empty() => Ok(DeclaredType::Absent),
                0 => Ok(DeclaredType::Single("null")),
                1 => Ok(DeclaredType::Single(non_null[0])),
                _ => Ok(DeclaredType::Union(non_null)),
            }
        }
        Some(other) => Err(TypegenError::malformed(
            id,
            format!("`type` must be a string or array, found {}", json_type_name(other)),
        )),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Schema Node
// =============================================================================

/// A resolved schema: identity, raw content and declared kind. Immutable.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    id: CanonicalId,
    content: Value,
    kind: SchemaKind,
}

impl SchemaNode {
    pub fn new(id: CanonicalId, content: Value) -> Result<Self> {
        let kind = detect_kind(&id, &content)?;
        Ok(Self { id, content, kind })
    }

    pub fn id(&self) -> &CanonicalId {
        &self.id
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Look up a keyword on an object schema
    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.content.get(keyword)
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(Value::as_str).filter(|t| !t.trim().is_empty())
    }

    pub fn description(&self) -> Option<&str> {
        self.get("description").and_then(Value::as_str)
    }

    pub fn format(&self) -> Option<&str> {
        self.get("format").and_then(Value::as_str)
    }

    /// Resolve a nested schema by walking `segments` through the content
    pub fn child<S: AsRef<str>>(&self, segments: &[S]) -> Result<SchemaNode> {
        let mut value = &self.content;
        for segment in segments {
            let segment = segment.as_ref();
            let next = match value {
                Value::Object(obj) => obj.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            value = next.ok_or_else(|| {
                TypegenError::malformed(&self.id, format!("no nested schema at `{segment}`"))
            })?;
        }
        SchemaNode::new(self.id.child(segments), value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root() -> CanonicalId {
        CanonicalId::new(Url::parse("file:///schemas/person.schema.json").unwrap(), "")
    }

    fn kind_of(value: Value) -> SchemaKind {
        detect_kind(&root(), &value).unwrap()
    }

    #[test]
    fn test_fragment_forms_share_identity() {
        let base = Url::parse("file:///schemas/person.schema.json").unwrap();
        let a = CanonicalId::from_url(&base.join("#/definitions/Home%20Address").unwrap()).unwrap();
        let b = CanonicalId::from_url(&base.join("./person.schema.json#/definitions/Home Address").unwrap()).unwrap();
        assert_eq!(a, b);

        let empty = CanonicalId::from_url(&base.join("#").unwrap()).unwrap();
        let bare = CanonicalId::from_url(&base).unwrap();
        assert_eq!(empty, bare);
        assert!(bare.is_document_root());
    }

    #[test]
    fn test_anchor_fragment_is_malformed() {
        let url = Url::parse("file:///schemas/person.schema.json#address").unwrap();
        assert!(matches!(
            CanonicalId::from_url(&url),
            Err(TypegenError::SchemaMalformed { .. })
        ));
    }

    #[test]
    fn test_child_escapes_segments() {
        let id = root().child(&["properties", "a/b~c"]);
        assert_eq!(id.pointer(), "/properties/a~1b~0c");
        assert_eq!(id.last_segment().as_deref(), Some("a/b~c"));
        assert_eq!(root().document_stem().as_deref(), Some("person"));
    }

    #[test]
    fn test_kind_detection_order() {
        assert_eq!(kind_of(json!({"$ref": "#/a", "type": "object"})), SchemaKind::Reference("#/a".into()));
        assert_eq!(kind_of(json!({"type": "string", "enum": ["A"]})), SchemaKind::Enumeration);
        assert_eq!(kind_of(json!({"properties": {}})), SchemaKind::Object);
        assert_eq!(kind_of(json!({"type": "array"})), SchemaKind::Array);
        assert_eq!(kind_of(json!({"items": [{"type": "string"}]})), SchemaKind::Array);
        assert_eq!(kind_of(json!({"type": "integer"})), SchemaKind::Primitive(JsonScalarKind::Integer));
        assert_eq!(kind_of(json!({"type": ["string", "null"]})), SchemaKind::Primitive(JsonScalarKind::String));
        assert_eq!(kind_of(json!({})), SchemaKind::Untyped);
        assert_eq!(kind_of(json!(true)), SchemaKind::Untyped);
        assert_eq!(kind_of(json!({"oneOf": []})), SchemaKind::Unsupported("oneOf".into()));
    }

    #[test]
    fn test_malformed_kinds() {
        assert!(detect_kind(&root(), &json!({"type": "widget"})).is_err());
        assert!(detect_kind(&root(), &json!({"$ref": 7})).is_err());
        assert!(detect_kind(&root(), &json!("string")).is_err());
    }

    #[test]
    fn test_child_lookup() {
        let node = SchemaNode::new(
            root(),
            json!({"items": [{"type": "string"}, {"type": "integer"}]}),
        )
        .unwrap();
        let second = node.child(&["items", "1"]).unwrap();
        assert_eq!(second.kind(), &SchemaKind::Primitive(JsonScalarKind::Integer));
        assert_eq!(second.id().pointer(), "/items/1");
        assert!(node.child(&["items", "5"]).is_err());
    }
}
