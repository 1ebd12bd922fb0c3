//! Generation Session
//!
//! One session owns everything a run needs: the schema store, the
//! canonical-identity cache, the type graph and the package naming scopes.
//! Every root generated through the same session shares them, so a schema
//! referenced from several roots still yields exactly one type.
//!
//! Nothing reaches a [`CodeSink`] until [`Session::emit`]; a session that
//! failed emits nothing.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use super::config::{GenerationConfig, NamingConfig, UnsupportedPolicy};
use super::dispatch::{RuleContext, RuleTable};
use super::model::{DeclKind, Extension, TypeGraph, TypeId, TypeKind, TypeRef};
use super::names::{IdentifierStyle, NameResolver, NamingScope};
use super::sink::{render, CodeSink, FieldDecl, SinkType};
use crate::error::{GenerationError, TypegenError};
use crate::schema::{CanonicalId, SchemaNode, SchemaStore};

/// Counters for one session, reported after emission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub roots: usize,
    pub declared: usize,
    pub classes: usize,
    pub enumerations: usize,
    pub tuples: usize,
    pub aliases: usize,
    pub documents: usize,
    pub cache_hits: usize,
    pub degraded: usize,
}

pub struct Session {
    store: SchemaStore,
    rules: RuleTable,
    names: NameResolver,
    generation: GenerationConfig,
    cache: IndexMap<CanonicalId, TypeRef>,
    graph: TypeGraph,
    scopes: HashMap<String, NamingScope>,
    chain: Vec<CanonicalId>,
    roots: Vec<TypeRef>,
    cache_hits: usize,
    degraded: usize,
    aborted: bool,
}

impl Session {
    pub fn new(store: SchemaStore, naming: NamingConfig, generation: GenerationConfig) -> Self {
        Self {
            store,
            rules: RuleTable::standard(),
            names: NameResolver::new(naming),
            generation,
            cache: IndexMap::new(),
            graph: TypeGraph::new(),
            scopes: HashMap::new(),
            chain: Vec::new(),
            roots: Vec::new(),
            cache_hits: 0,
            degraded: 0,
            aborted: false,
        }
    }

    /// Session over `store` with default naming and generation settings
    pub fn with_store(store: SchemaStore) -> Self {
        Self::new(store, NamingConfig::default(), GenerationConfig::default())
    }

    /// Swap the rule table (before any root is generated)
    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    /// Generate the type for one root schema.
    ///
    /// `package` falls back to the configured default package. A failure
    /// aborts the whole session: later calls and [`Session::emit`] refuse to
    /// run.
    pub fn generate(
        &mut self,
        root: &Url,
        class_name: &str,
        package: Option<&str>,
    ) -> Result<TypeRef, GenerationError> {
        if self.aborted {
            return Err(TypegenError::SessionAborted.into());
        }

        let result = self.generate_root(root, class_name, package);
        if result.is_err() {
            self.aborted = true;
            self.chain.clear();
        }
        result
    }

    fn generate_root(
        &mut self,
        root: &Url,
        class_name: &str,
        package: Option<&str>,
    ) -> Result<TypeRef, GenerationError> {
        let id = CanonicalId::from_url(root)?;
        let package = package
            .unwrap_or(self.generation.default_package.as_str())
            .to_string();
        info!(root = %id, class_name, %package, "generating root schema");

        let node = self
            .store
            .resolve(&id)
            .map_err(|e| GenerationError::from(e).within(std::slice::from_ref(&id)))?;
        let ty = self.apply(&node, &RuleContext::root(class_name, package))?;

        self.roots.push(ty.clone());
        Ok(ty)
    }

    /// Emit every declared type to `sink`, in registration order
    pub fn emit<S: CodeSink>(&self, sink: &mut S) -> Result<GenerationReport, GenerationError> {
        if self.aborted {
            return Err(TypegenError::SessionAborted.into());
        }
        if let Some(pending) = self.graph.pending().next() {
            let err = TypegenError::malformed(&pending.identity, "type body was never generated");
            return Err(err.into());
        }

        let mut report = self.report();
        for ty in self.graph.declared() {
            let handle = sink.begin_type(ty.kind.decl_kind(), &ty.name, &ty.package);
            if let Some(description) = &ty.description {
                sink.describe(&handle, description);
            }

            match &ty.kind {
                TypeKind::Class { fields, extension } => {
                    report.classes += 1;
                    for field in fields {
                        sink.add_field(
                            &handle,
                            FieldDecl {
                                name: field.name.clone(),
                                json_name: field.json_name.clone(),
                                ty: render(&self.graph, &field.ty),
                                required: field.required,
                                description: field.description.clone(),
                                default: field.default.clone(),
                            },
                        );
                    }
                    match extension {
                        Extension::Closed => {}
                        Extension::Open => sink.set_extension(&handle, SinkType::Any),
                        Extension::Typed(value) => sink.set_extension(&handle, render(&self.graph, value)),
                    }
                }
                TypeKind::Enumeration { constants } => {
                    report.enumerations += 1;
                    for constant in constants {
                        sink.add_enum_constant(&handle, &constant.identifier, &constant.literal);
                    }
                }
                TypeKind::Tuple { slots } => {
                    report.tuples += 1;
                    for slot in slots {
                        sink.add_tuple_slot(&handle, render(&self.graph, slot));
                    }
                }
                TypeKind::Alias { target } => {
                    report.aliases += 1;
                    sink.set_alias_target(&handle, *target);
                }
                // filtered out by `declared()`; pending was rejected above
                TypeKind::ArrayOf { .. } | TypeKind::Pending { .. } => {}
            }

            sink.finish_type(handle);
            report.declared += 1;
        }

        info!(
            declared = report.declared,
            documents = report.documents,
            cache_hits = report.cache_hits,
            "generation complete"
        );
        Ok(report)
    }

    /// Counters known before emission
    pub fn report(&self) -> GenerationReport {
        GenerationReport {
            roots: self.roots.len(),
            documents: self.store.fetch_count(),
            cache_hits: self.cache_hits,
            degraded: self.degraded,
            ..GenerationReport::default()
        }
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Consume the session, keeping only its type graph
    pub fn into_graph(self) -> TypeGraph {
        self.graph
    }

    /// Root types, in the order they were generated
    pub fn roots(&self) -> &[TypeRef] {
        &self.roots
    }

    /// Type recorded for a canonical identity, if generated
    pub fn lookup(&self, id: &CanonicalId) -> Option<&TypeRef> {
        self.cache.get(id)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn store_mut(&mut self) -> &mut SchemaStore {
        &mut self.store
    }

    pub fn names(&self) -> &NameResolver {
        &self.names
    }

    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    // =========================================================================
    // Services for rules
    // =========================================================================

    /// Register a pending type for `node` and cache it before the rule
    /// recurses. Declared kinds claim a unique name in the package scope.
    pub fn reserve(
        &mut self,
        node: &SchemaNode,
        ctx: &RuleContext,
        decl: DeclKind,
    ) -> Result<TypeId, GenerationError> {
        let candidate = if ctx.explicit_name {
            ctx.name_hint.as_str()
        } else {
            node.title().unwrap_or(&ctx.name_hint)
        };

        let name = if decl.is_declared() {
            let names = &self.names;
            let scope = self
                .scopes
                .entry(ctx.package.clone())
                .or_insert_with(|| names.scope());
            names.resolve(candidate, IdentifierStyle::Type, scope)?
        } else {
            self.names.sanitize(candidate, IdentifierStyle::Type)
        };

        let id = self.graph.reserve(
            name,
            ctx.package.clone(),
            node.id().clone(),
            node.description().map(str::to_string),
            decl,
        );
        self.cache.insert(node.id().clone(), TypeRef::Named(id));
        debug!(id = %node.id(), name = %self.graph.get(id).name, ?decl, "registered type");
        Ok(id)
    }

    /// Fill in the body of a reserved type
    pub fn complete(&mut self, id: TypeId, kind: TypeKind) {
        self.graph.fill(id, kind);
    }

    /// Name given to a reserved type
    pub fn type_name(&self, id: TypeId) -> &str {
        &self.graph.get(id).name
    }

    // =========================================================================
    // Dispatcher bookkeeping
    // =========================================================================

    pub(crate) fn cached(&mut self, id: &CanonicalId) -> Option<TypeRef> {
        let hit = self.cache.get(id).cloned();
        if hit.is_some() {
            self.cache_hits += 1;
        }
        hit
    }

    pub(crate) fn remember(&mut self, id: &CanonicalId, ty: &TypeRef) {
        self.cache.entry(id.clone()).or_insert_with(|| ty.clone());
    }

    pub(crate) fn on_chain(&self, id: &CanonicalId) -> bool {
        self.chain.contains(id)
    }

    pub(crate) fn chain(&self) -> &[CanonicalId] {
        &self.chain
    }

    pub(crate) fn push_chain(&mut self, id: CanonicalId) {
        self.chain.push(id);
    }

    pub(crate) fn pop_chain(&mut self) {
        self.chain.pop();
    }

    pub(crate) fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub(crate) fn unsupported_policy(&self) -> UnsupportedPolicy {
        self.generation.unsupported
    }

    pub(crate) fn record_degraded(&mut self) {
        self.degraded += 1;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("types", &self.graph.len())
            .field("cached", &self.cache.len())
            .field("roots", &self.roots.len())
            .field("aborted", &self.aborted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::sink::RecordingSink;
    use crate::schema::MemoryFetcher;

    fn session(doc: &str) -> (Session, Url) {
        let url = Url::parse("file:///schemas/root.json").unwrap();
        let store = SchemaStore::new(MemoryFetcher::new().with_document(url.clone(), doc));
        (Session::with_store(store), url)
    }

    #[test]
    fn test_failed_session_emits_nothing() {
        let (mut session, url) = session(r#"{"type": "object", "properties": {"x": {"oneOf": []}}}"#);

        assert!(session.generate(&url, "Root", None).is_err());
        assert!(session.is_aborted());

        let mut sink = RecordingSink::new();
        let err = session.emit(&mut sink).unwrap_err();
        assert!(matches!(err.error, TypegenError::SessionAborted));
        assert!(sink.declarations().is_empty());
    }

    #[test]
    fn test_default_package_applies() {
        let (mut session, url) = session(r#"{"type": "object"}"#);
        session.generate(&url, "Root", None).unwrap();

        let root = session.graph().find("Root").unwrap();
        assert_eq!(root.package, "generated");
        assert_eq!(session.report().roots, 1);
    }

    #[test]
    fn test_generating_a_root_twice_reuses_its_type() {
        let (mut session, url) = session(r#"{"type": "object"}"#);
        let first = session.generate(&url, "Root", Some("a")).unwrap();
        let second = session.generate(&url, "Other", Some("b")).unwrap();

        assert_eq!(first, second);
        assert_eq!(session.graph().len(), 1);
    }
}
