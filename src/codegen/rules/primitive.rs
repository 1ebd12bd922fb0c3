use crate::codegen::dispatch::{Rule, RuleContext};
use crate::codegen::model::{DeclKind, PrimitiveType, TypeKind, TypeRef};
use crate::codegen::session::Session;
use crate::error::{GenerationError, TypegenError};
use crate::schema::{JsonScalarKind, SchemaKind, SchemaNode};

/// Scalar schemas. Inline scalars map straight to a primitive; a scalar
/// reached through `$ref` gets a named alias so the definition's name survives.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveRule;

impl Rule for PrimitiveRule {
    fn apply(
        &self,
        node: &SchemaNode,
        ctx: &RuleContext,
        session: &mut Session,
    ) -> Result<TypeRef, GenerationError> {
        let SchemaKind::Primitive(scalar) = node.kind() else {
            return Err(TypegenError::malformed(node.id(), "expected a scalar schema").into());
        };
        let primitive = refine_primitive(*scalar, node.format());

        if !ctx.via_reference {
            return Ok(TypeRef::Primitive(primitive));
        }

        let id = session.reserve(node, ctx, DeclKind::Alias)?;
        session.complete(id, TypeKind::Alias { target: primitive });
        Ok(TypeRef::Named(id))
    }
}

/// Schemas with no type constraint at all
#[derive(Debug, Clone, Copy, Default)]
pub struct UntypedRule;

impl Rule for UntypedRule {
    fn apply(&self, _node: &SchemaNode, _ctx: &RuleContext, _session: &mut Session) -> Result<TypeRef, GenerationError> {
        Ok(TypeRef::Any)
    }
}

/// Apply a `format` hint to a JSON scalar type
pub fn refine_primitive(scalar: JsonScalarKind, format: Option<&str>) -> PrimitiveType {
    match (scalar, format) {
        (JsonScalarKind::String, Some("date-time")) => PrimitiveType::DateTime,
        (JsonScalarKind::String, Some("date")) => PrimitiveType::Date,
        (JsonScalarKind::String, Some("time")) => PrimitiveType::Time,
        (JsonScalarKind::String, Some("uri" | "uri-reference")) => PrimitiveType::Uri,
        (JsonScalarKind::String, Some("uuid")) => PrimitiveType::Uuid,
        (JsonScalarKind::String, Some("email")) => PrimitiveType::Email,
        (JsonScalarKind::String, _) => PrimitiveType::String,
        (JsonScalarKind::Integer, Some("int64" | "utc-millisec")) => PrimitiveType::Long,
        (JsonScalarKind::Integer, _) => PrimitiveType::Integer,
        (JsonScalarKind::Number, _) => PrimitiveType::Number,
        (JsonScalarKind::Boolean, _) => PrimitiveType::Boolean,
        (JsonScalarKind::Null, _) => PrimitiveType::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_refinement() {
        assert_eq!(refine_primitive(JsonScalarKind::String, Some("date-time")), PrimitiveType::DateTime);
        assert_eq!(refine_primitive(JsonScalarKind::String, Some("hostname")), PrimitiveType::String);
        assert_eq!(refine_primitive(JsonScalarKind::Integer, Some("utc-millisec")), PrimitiveType::Long);
        assert_eq!(refine_primitive(JsonScalarKind::Number, Some("date")), PrimitiveType::Number);
    }
}
