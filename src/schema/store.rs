//! Schema Store
//!
//! Resolves `$ref` values to schema nodes. Each absolute document URI is
//! fetched and parsed once; fragments are resolved as JSON pointers against the
//! cached parse, and resolved nodes are memoized by canonical identity.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use super::{CanonicalId, SchemaNode};
use crate::error::{Result, TypegenError};

// =============================================================================
// Document Fetchers
// =============================================================================

/// Retrieves raw document text for an absolute URI (no fragment).
pub trait DocumentFetcher {
    fn fetch(&self, uri: &Url) -> Result<String>;
}

/// Reads `file:` URIs from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

impl DocumentFetcher for FileFetcher {
    fn fetch(&self, uri: &Url) -> Result<String> {
        if uri.scheme() != "file" {
            return Err(TypegenError::unreachable(
                uri,
                format!("unsupported URI scheme `{}`", uri.scheme()),
            ));
        }
        let path = uri
            .to_file_path()
            .map_err(|_| TypegenError::unreachable(uri, "not a local file path"))?;
        fs::read_to_string(&path).map_err(|e| TypegenError::unreachable(uri, e.to_string()))
    }
}

/// Serves documents registered up front, keyed by absolute URI
#[derive(Debug, Default, Clone)]
pub struct MemoryFetcher {
    documents: HashMap<Url, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document; any fragment on `uri` is ignored
    pub fn insert(&mut self, mut uri: Url, content: impl Into<String>) {
        uri.set_fragment(None);
        self.documents.insert(uri, content.into());
    }

    /// Builder form of [`MemoryFetcher::insert`]
    pub fn with_document(mut self, uri: Url, content: impl Into<String>) -> Self {
        self.insert(uri, content);
        self
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }
}

impl DocumentFetcher for MemoryFetcher {
    fn fetch(&self, uri: &Url) -> Result<String> {
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| TypegenError::unreachable(uri, "no document registered for this URI"))
    }
}

/// Tries registered in-memory documents first, then the filesystem
#[derive(Debug, Default, Clone)]
pub struct FetcherChain {
    memory: MemoryFetcher,
    files: FileFetcher,
}

impl FetcherChain {
    pub fn new(memory: MemoryFetcher) -> Self {
        Self {
            memory,
            files: FileFetcher,
        }
    }
}

impl DocumentFetcher for FetcherChain {
    fn fetch(&self, uri: &Url) -> Result<String> {
        if self.memory.contains(uri) {
            return self.memory.fetch(uri);
        }
        self.files.fetch(uri)
    }
}

// =============================================================================
// Schema Store
// =============================================================================

/// Reference resolver with per-document and per-node caches
pub struct SchemaStore {
    fetcher: Box<dyn DocumentFetcher + Send>,
    documents: HashMap<Url, Arc<Value>>,
    nodes: HashMap<CanonicalId, Arc<SchemaNode>>,
    fetch_count: usize,
}

impl SchemaStore {
    pub fn new(fetcher: impl DocumentFetcher + Send + 'static) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            documents: HashMap::new(),
            nodes: HashMap::new(),
            fetch_count: 0,
        }
    }

    /// Store reading from the filesystem only
    pub fn from_filesystem() -> Self {
        Self::new(FileFetcher)
    }

    /// Normalize a `$ref` value against the document it appears in
    pub fn canonicalize(reference: &str, base: &Url) -> Result<CanonicalId> {
        let absolute = base.join(reference).map_err(|e| TypegenError::SchemaMalformed {
            id: base.to_string(),
            reason: format!("invalid reference `{reference}`: {e}"),
        })?;
        CanonicalId::from_url(&absolute)
    }

    /// Resolve a `$ref` value relative to `base`
    pub fn resolve_reference(&mut self, reference: &str, base: &Url) -> Result<Arc<SchemaNode>> {
        let id = Self::canonicalize(reference, base)?;
        self.resolve(&id)
    }

    /// Resolve a canonical identity to its schema node
    pub fn resolve(&mut self, id: &CanonicalId) -> Result<Arc<SchemaNode>> {
        if let Some(node) = self.nodes.get(id) {
            trace!(%id, "schema node cache hit");
            return Ok(Arc::clone(node));
        }

        let document = self.document(id.document())?;
        let content = document.pointer(id.pointer()).ok_or_else(|| {
            TypegenError::malformed(id, format!("pointer `{}` does not exist", id.pointer()))
        })?;

        let node = Arc::new(SchemaNode::new(id.clone(), content.clone())?);
        self.nodes.insert(id.clone(), Arc::clone(&node));
        Ok(node)
    }

    /// Fetch and parse a whole document, once per absolute URI
    pub fn document(&mut self, uri: &Url) -> Result<Arc<Value>> {
        if let Some(doc) = self.documents.get(uri) {
            return Ok(Arc::clone(doc));
        }

        debug!(%uri, "fetching schema document");
        let text = self.fetcher.fetch(uri)?;
        self.fetch_count += 1;

        let parsed: Value = serde_json::from_str(&text).map_err(|e| TypegenError::SchemaMalformed {
            id: uri.to_string(),
            reason: format!("invalid JSON: {e}"),
        })?;

        let doc = Arc::new(parsed);
        self.documents.insert(uri.clone(), Arc::clone(&doc));
        Ok(doc)
    }

    /// Number of documents actually fetched (cache misses)
    pub fn fetch_count(&self) -> usize {
        self.fetch_count
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

/// Absolute `file:` URL for a path, resolving relative paths against the cwd
pub fn file_url(path: &Path) -> Result<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute)
        .map_err(|_| TypegenError::unreachable(absolute.display(), "cannot express path as a file URL"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaKind;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn store() -> SchemaStore {
        let memory = MemoryFetcher::new()
            .with_document(
                url("file:///schemas/person.json"),
                r#"{
                    "type": "object",
                    "properties": {"home": {"$ref": "address.json"}},
                    "definitions": {"Name": {"type": "string"}}
                }"#,
            )
            .with_document(
                url("file:///schemas/address.json"),
                r#"{"type": "object", "properties": {"owner": {"$ref": "person.json#"}}}"#,
            )
            .with_document(url("file:///schemas/broken.json"), "{ not json");
        SchemaStore::new(memory)
    }

    #[test]
    fn test_documents_are_fetched_once() {
        let mut store = store();
        let base = url("file:///schemas/person.json");

        let a = store.resolve_reference("#/definitions/Name", &base).unwrap();
        let b = store.resolve_reference("person.json#/definitions/Name", &base).unwrap();
        let root = store.resolve_reference("#", &base).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(root.kind(), &SchemaKind::Object);
        assert_eq!(store.fetch_count(), 1);
    }

    #[test]
    fn test_relative_documents() {
        let mut store = store();
        let base = url("file:///schemas/person.json");

        let address = store.resolve_reference("./address.json", &base).unwrap();
        assert_eq!(address.id().document().as_str(), "file:///schemas/address.json");

        // address.json points back at person.json; resolution is lazy so this terminates
        let back = store
            .resolve_reference("person.json#", address.id().document())
            .unwrap();
        assert_eq!(back.id().pointer(), "");
        assert_eq!(store.fetch_count(), 2);
    }

    #[test]
    fn test_failures() {
        let mut store = store();
        let base = url("file:///schemas/person.json");

        assert!(matches!(
            store.resolve_reference("missing.json", &base),
            Err(TypegenError::SchemaUnreachable { .. })
        ));
        assert!(matches!(
            store.resolve_reference("broken.json", &base),
            Err(TypegenError::SchemaMalformed { .. })
        ));
        assert!(matches!(
            store.resolve_reference("#/definitions/Nope", &base),
            Err(TypegenError::SchemaMalformed { .. })
        ));
    }

    #[test]
    fn test_file_fetcher_rejects_remote_schemes() {
        let err = FileFetcher.fetch(&url("https://example.com/schema.json")).unwrap_err();
        assert!(matches!(err, TypegenError::SchemaUnreachable { .. }));
    }
}
