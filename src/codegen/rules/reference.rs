use crate::codegen::dispatch::{Rule, RuleContext};
use crate::codegen::model::TypeRef;
use crate::codegen::session::Session;
use crate::error::{GenerationError, TypegenError};
use crate::schema::{CanonicalId, SchemaKind, SchemaNode, SchemaStore};

/// Follows `$ref` and generates (or reuses) the target's type
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceRule;

impl Rule for ReferenceRule {
    fn apply(
        &self,
        node: &SchemaNode,
        ctx: &RuleContext,
        session: &mut Session,
    ) -> Result<TypeRef, GenerationError> {
        let SchemaKind::Reference(reference) = node.kind() else {
            return Err(TypegenError::malformed(node.id(), "expected a `$ref` schema").into());
        };

        // relative references resolve against the document they appear in
        let target_id = SchemaStore::canonicalize(reference, node.id().document())?;
        let target = session.store_mut().resolve(&target_id)?;
        let hint = reference_hint(&target_id, node.id(), &ctx.name_hint);

        session.apply(&target, &ctx.referenced(hint))
    }
}

/// Name hint for a reference target.
///
/// `#/definitions/Address` suggests `Address` and `address.json` suggests
/// `address`; a reference back to the referring document's root keeps the
/// referring site's own hint.
pub fn reference_hint(target: &CanonicalId, site: &CanonicalId, site_hint: &str) -> String {
    if let Some(segment) = target.last_segment() {
        return segment;
    }
    if target.document() != site.document() {
        if let Some(stem) = target.document_stem() {
            return stem;
        }
    }
    site_hint.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn id(s: &str) -> CanonicalId {
        CanonicalId::from_url(&Url::parse(s).unwrap()).unwrap()
    }

    #[test]
    fn test_reference_hints() {
        let site = id("file:///s/person.json#/properties/home");

        assert_eq!(reference_hint(&id("file:///s/person.json#/definitions/Address"), &site, "home"), "Address");
        assert_eq!(reference_hint(&id("file:///s/address.schema.json"), &site, "home"), "address");
        assert_eq!(reference_hint(&id("file:///s/person.json#"), &site, "home"), "home");
    }
}
