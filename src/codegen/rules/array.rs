use serde_json::Value;

use crate::codegen::dispatch::{Rule, RuleContext};
use crate::codegen::model::{DeclKind, TypeKind, TypeRef};
use crate::codegen::names::singularize;
use crate::codegen::session::Session;
use crate::error::{GenerationError, TypegenError};
use crate::schema::{json_type_name, SchemaNode};

/// Array schemas.
///
/// A single `items` schema yields a list (a set under `uniqueItems`); a list
/// of `items` yields a declared tuple with one slot per entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayRule;

impl Rule for ArrayRule {
    fn apply(
        &self,
        node: &SchemaNode,
        ctx: &RuleContext,
        session: &mut Session,
    ) -> Result<TypeRef, GenerationError> {
        let unique = node.get("uniqueItems") == Some(&Value::Bool(true));

        match node.get("items") {
            None => {
                let id = session.reserve(node, ctx, DeclKind::ArrayOf)?;
                session.complete(id, TypeKind::ArrayOf { element: TypeRef::Any, unique });
                Ok(TypeRef::Named(id))
            }
            Some(Value::Object(_) | Value::Bool(_)) => {
                let id = session.reserve(node, ctx, DeclKind::ArrayOf)?;
                let items = node.child(&["items"])?;
                let hint = element_hint(&ctx.name_hint, &session.generation().element_suffix);
                let element = session.apply(&items, &ctx.nested(hint))?;

                session.complete(id, TypeKind::ArrayOf { element, unique });
                Ok(TypeRef::Named(id))
            }
            Some(Value::Array(entries)) => {
                let id = session.reserve(node, ctx, DeclKind::Tuple)?;
                let tuple_name = session.type_name(id).to_string();

                let mut slots = Vec::with_capacity(entries.len());
                for index in 0..entries.len() {
                    let slot = node.child(&["items".to_string(), index.to_string()])?;
                    let hint = format!("{tuple_name}{}{}", session.generation().element_suffix, index + 1);
                    slots.push(session.apply(&slot, &ctx.nested(hint))?);
                }

                session.complete(id, TypeKind::Tuple { slots });
                Ok(TypeRef::Named(id))
            }
            Some(other) => {
                let reason = format!("`items` must be a schema or a list of schemas, found {}", json_type_name(other));
                Err(TypegenError::malformed(node.id(), reason).into())
            }
        }
    }
}

/// `addresses` → `address`; a hint that is already singular gets `suffix`
fn element_hint(hint: &str, suffix: &str) -> String {
    let singular = singularize(hint);
    if singular == hint {
        format!("{hint}{suffix}")
    } else {
        singular
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_hint() {
        assert_eq!(element_hint("addresses", "Item"), "address");
        assert_eq!(element_hint("children", "Item"), "child");
        assert_eq!(element_hint("data", "Item"), "dataItem");
    }
}
