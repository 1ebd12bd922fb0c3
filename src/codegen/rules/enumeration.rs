use serde_json::Value;

use crate::codegen::dispatch::{Rule, RuleContext};
use crate::codegen::model::{DeclKind, EnumConstant, TypeKind, TypeRef};
use crate::codegen::names::IdentifierStyle;
use crate::codegen::session::Session;
use crate::error::{GenerationError, TypegenError};
use crate::schema::{json_type_name, SchemaNode};

/// `enum` schemas become enumerations with one constant per distinct literal
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumRule;

impl Rule for EnumRule {
    fn apply(
        &self,
        node: &SchemaNode,
        ctx: &RuleContext,
        session: &mut Session,
    ) -> Result<TypeRef, GenerationError> {
        let literals = match node.get("enum") {
            Some(Value::Array(values)) if !values.is_empty() => values,
            Some(Value::Array(_)) => {
                return Err(TypegenError::malformed(node.id(), "`enum` must list at least one value").into())
            }
            Some(other) => {
                let reason = format!("`enum` must be an array, found {}", json_type_name(other));
                return Err(TypegenError::malformed(node.id(), reason).into());
            }
            None => return Err(TypegenError::malformed(node.id(), "missing `enum`").into()),
        };

        let id = session.reserve(node, ctx, DeclKind::Enumeration)?;

        let mut scope = session.names().scope();
        let mut constants: Vec<EnumConstant> = Vec::with_capacity(literals.len());
        for literal in literals {
            if constants.iter().any(|c| &c.literal == literal) {
                continue;
            }
            let identifier = session
                .names()
                .resolve(&constant_candidate(literal), IdentifierStyle::Constant, &mut scope)?;
            constants.push(EnumConstant {
                identifier,
                literal: literal.clone(),
            });
        }

        session.complete(id, TypeKind::Enumeration { constants });
        Ok(TypeRef::Named(id))
    }
}

/// Text an identifier is derived from
fn constant_candidate(literal: &Value) -> String {
    match literal {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constant_candidates() {
        assert_eq!(constant_candidate(&json!("in-progress")), "in-progress");
        assert_eq!(constant_candidate(&json!(null)), "null");
        assert_eq!(constant_candidate(&json!(42)), "42");
        assert_eq!(constant_candidate(&json!(true)), "true");
    }
}
