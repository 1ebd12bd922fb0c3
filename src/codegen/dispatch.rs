//! Rule Dispatch
//!
//! Maps each schema node's declared kind to a rule through an explicit
//! [`RuleTable`], and owns the two guarantees every rule relies on:
//! - a canonical identity is generated at most once per session (cache)
//! - a node already on the reference chain is never re-entered unboundedly

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::config::UnsupportedPolicy;
use super::model::TypeRef;
use super::rules::{ArrayRule, EnumRule, ObjectRule, PrimitiveRule, ReferenceRule, UntypedRule};
use super::session::Session;
use crate::error::{GenerationError, TypegenError};
use crate::schema::{SchemaKind, SchemaNode, SchemaStore};

/// Rule selector, one per dispatchable schema kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Reference,
    Enumeration,
    Object,
    Array,
    Primitive,
    Untyped,
}

impl RuleKind {
    pub const ALL: [RuleKind; 6] = [
        RuleKind::Reference,
        RuleKind::Enumeration,
        RuleKind::Object,
        RuleKind::Array,
        RuleKind::Primitive,
        RuleKind::Untyped,
    ];

    /// Rule for a declared kind; `None` for unsupported constructs
    pub fn for_kind(kind: &SchemaKind) -> Option<Self> {
        match kind {
            SchemaKind::Reference(_) => Some(RuleKind::Reference),
            SchemaKind::Enumeration => Some(RuleKind::Enumeration),
            SchemaKind::Object => Some(RuleKind::Object),
            SchemaKind::Array => Some(RuleKind::Array),
            SchemaKind::Primitive(_) => Some(RuleKind::Primitive),
            SchemaKind::Untyped => Some(RuleKind::Untyped),
            SchemaKind::Unsupported(_) => None,
        }
    }
}

/// Naming and placement information handed from a referencing site to a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleContext {
    /// Preferred name for any type the rule declares
    pub name_hint: String,
    /// The hint was given by the caller and beats the schema's `title`
    pub explicit_name: bool,
    /// The node was reached through `$ref` (or is a root)
    pub via_reference: bool,
    /// Package declared types are placed in
    pub package: String,
}

impl RuleContext {
    /// Context for a root schema with a caller-chosen class name
    pub fn root(class_name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name_hint: class_name.into(),
            explicit_name: true,
            via_reference: true,
            package: package.into(),
        }
    }

    /// Context for an inline schema nested below the current one
    pub fn nested(&self, name_hint: impl Into<String>) -> Self {
        Self {
            name_hint: name_hint.into(),
            explicit_name: false,
            via_reference: false,
            package: self.package.clone(),
        }
    }

    /// Context for the target of a `$ref`
    pub fn referenced(&self, name_hint: impl Into<String>) -> Self {
        Self {
            name_hint: name_hint.into(),
            explicit_name: false,
            via_reference: true,
            package: self.package.clone(),
        }
    }
}

/// A type-generation rule for one schema construct.
///
/// Rules that recurse must call [`Session::reserve`] before dispatching any
/// nested schema, so reentrant lookups find the placeholder.
pub trait Rule: Send + Sync {
    fn apply(
        &self,
        node: &SchemaNode,
        ctx: &RuleContext,
        session: &mut Session,
    ) -> Result<TypeRef, GenerationError>;
}

/// Explicit rule registry, built once per session
#[derive(Clone)]
pub struct RuleTable {
    rules: HashMap<RuleKind, Arc<dyn Rule>>,
}

impl RuleTable {
    /// Table with the built-in rule for every kind
    pub fn standard() -> Self {
        let mut rules: HashMap<RuleKind, Arc<dyn Rule>> = HashMap::with_capacity(RuleKind::ALL.len());
        rules.insert(RuleKind::Reference, Arc::new(ReferenceRule));
        rules.insert(RuleKind::Enumeration, Arc::new(EnumRule));
        rules.insert(RuleKind::Object, Arc::new(ObjectRule));
        rules.insert(RuleKind::Array, Arc::new(ArrayRule));
        rules.insert(RuleKind::Primitive, Arc::new(PrimitiveRule));
        rules.insert(RuleKind::Untyped, Arc::new(UntypedRule));
        Self { rules }
    }

    /// Replace the rule for one kind
    pub fn with_rule(mut self, kind: RuleKind, rule: impl Rule + 'static) -> Self {
        self.rules.insert(kind, Arc::new(rule));
        self
    }

    pub fn get(&self, kind: RuleKind) -> Arc<dyn Rule> {
        // every kind is inserted by `standard()` and only ever replaced
        Arc::clone(&self.rules[&kind])
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for RuleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<String> = self.rules.keys().map(|k| format!("{k:?}")).collect();
        kinds.sort();
        f.debug_struct("RuleTable").field("rules", &kinds).finish()
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

impl Session {
    /// Generate (or reuse) the type for a resolved schema node.
    ///
    /// This is the single entry point rules use to recurse.
    pub fn apply(&mut self, node: &SchemaNode, ctx: &RuleContext) -> Result<TypeRef, GenerationError> {
        if let Some(existing) = self.cached(node.id()) {
            trace!(id = %node.id(), "session cache hit");
            return Ok(existing);
        }

        if self.on_chain(node.id()) {
            // a `$ref`-only definition re-entered through a real type
            if let Some(existing) = self.through_references(node)? {
                trace!(id = %node.id(), "reference cycle closed on a registered type");
                self.remember(node.id(), &existing);
                return Ok(existing);
            }
            let err = TypegenError::malformed(node.id(), "circular `$ref` chain with no type in between");
            return Err(GenerationError::from(err).within(self.chain()));
        }

        self.push_chain(node.id().clone());
        let result = self.dispatch(node, ctx).map_err(|e| e.within(self.chain()));
        self.pop_chain();

        let ty = result?;
        self.remember(node.id(), &ty);
        Ok(ty)
    }

    /// Follow `$ref` hops from `node` until one lands on a cached type.
    /// `None` when the hops loop back without ever registering one.
    fn through_references(&mut self, node: &SchemaNode) -> Result<Option<TypeRef>, GenerationError> {
        let mut visited = vec![node.id().clone()];
        let mut current = node.clone();

        while let SchemaKind::Reference(reference) = current.kind() {
            let target = SchemaStore::canonicalize(reference, current.id().document())?;
            if let Some(existing) = self.cached(&target) {
                return Ok(Some(existing));
            }
            if visited.contains(&target) {
                return Ok(None);
            }
            current = SchemaNode::clone(&*self.store_mut().resolve(&target)?);
            visited.push(target);
        }
        Ok(None)
    }

    fn dispatch(&mut self, node: &SchemaNode, ctx: &RuleContext) -> Result<TypeRef, GenerationError> {
        let Some(kind) = RuleKind::for_kind(node.kind()) else {
            return self.unsupported(node);
        };

        debug!(id = %node.id(), ?kind, hint = %ctx.name_hint, "dispatching schema");
        let rule = self.rules().get(kind);
        rule.apply(node, ctx, self)
    }

    /// The single place the unsupported-construct policy is applied
    fn unsupported(&mut self, node: &SchemaNode) -> Result<TypeRef, GenerationError> {
        let construct = match node.kind() {
            SchemaKind::Unsupported(construct) => construct.as_str(),
            _ => "unknown",
        };

        match self.unsupported_policy() {
            UnsupportedPolicy::Fail => Err(TypegenError::unsupported(node.id(), construct).into()),
            UnsupportedPolicy::Degrade => {
                warn!(id = %node.id(), construct, "unsupported construct degraded to an unconstrained type");
                self.record_degraded();
                Ok(TypeRef::Any)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_supported_kind_has_a_rule() {
        let table = RuleTable::standard();
        for kind in RuleKind::ALL {
            let _ = table.get(kind);
        }
        assert_eq!(RuleKind::for_kind(&SchemaKind::Unsupported("oneOf".into())), None);
    }

    #[test]
    fn test_context_transitions() {
        let root = RuleContext::root("Person", "model");
        let nested = root.nested("address");
        assert!(!nested.explicit_name);
        assert!(!nested.via_reference);
        assert_eq!(nested.package, "model");

        let referenced = nested.referenced("Address");
        assert!(referenced.via_reference);
        assert_eq!(referenced.name_hint, "Address");
    }
}
