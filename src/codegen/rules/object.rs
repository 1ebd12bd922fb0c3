use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::codegen::dispatch::{Rule, RuleContext};
use crate::codegen::model::{DeclKind, Extension, Field, TypeKind, TypeRef};
use crate::codegen::names::IdentifierStyle;
use crate::codegen::session::Session;
use crate::error::{GenerationError, TypegenError};
use crate::schema::{json_type_name, SchemaNode};

/// Object schemas become classes with one field per property
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectRule;

impl Rule for ObjectRule {
    fn apply(
        &self,
        node: &SchemaNode,
        ctx: &RuleContext,
        session: &mut Session,
    ) -> Result<TypeRef, GenerationError> {
        let empty = Map::new();
        let properties = match node.get("properties") {
            None => &empty,
            Some(Value::Object(map)) => map,
            Some(other) => {
                let reason = format!("`properties` must be an object, found {}", json_type_name(other));
                return Err(TypegenError::malformed(node.id(), reason).into());
            }
        };
        let required = required_properties(node)?;

        // registered before any property is visited so self references terminate
        let id = session.reserve(node, ctx, DeclKind::Class)?;
        let class_name = session.type_name(id).to_string();

        let mut field_scope = session.names().scope();
        let mut fields = Vec::with_capacity(properties.len());
        for (key, raw) in properties {
            let name = session.names().resolve(key, IdentifierStyle::Field, &mut field_scope)?;
            let property = node.child(&["properties", key.as_str()])?;
            let ty = session.apply(&property, &ctx.nested(key.as_str()))?;

            // draft 3 marks required-ness on the property itself
            let required = required.contains(key.as_str()) || raw.get("required") == Some(&Value::Bool(true));

            fields.push(Field {
                name,
                json_name: key.clone(),
                ty,
                required,
                description: property.description().map(str::to_string),
                default: raw.get("default").cloned(),
            });
        }

        let extension = match node.get("additionalProperties") {
            None | Some(Value::Bool(true)) => Extension::Open,
            Some(Value::Bool(false)) => Extension::Closed,
            Some(Value::Object(_)) => {
                let schema = node.child(&["additionalProperties"])?;
                let hint = format!("{class_name}Property");
                Extension::Typed(session.apply(&schema, &ctx.nested(hint))?)
            }
            Some(other) => {
                let reason = format!(
                    "`additionalProperties` must be a boolean or a schema, found {}",
                    json_type_name(other)
                );
                return Err(TypegenError::malformed(node.id(), reason).into());
            }
        };

        session.complete(id, TypeKind::Class { fields, extension });
        Ok(TypeRef::Named(id))
    }
}

/// Property names listed in `required`. A boolean `required` is the draft 3
/// per-property flag and lists nothing.
fn required_properties(node: &SchemaNode) -> Result<HashSet<&str>, GenerationError> {
    match node.get("required") {
        None | Some(Value::Bool(_)) => Ok(HashSet::new()),
        Some(Value::Array(names)) => names
            .iter()
            .map(|name| {
                name.as_str()
                    .ok_or_else(|| {
                        GenerationError::from(TypegenError::malformed(node.id(), "`required` entries must be strings"))
                    })
            })
            .collect(),
        Some(other) => {
            let reason = format!("`required` must be an array, found {}", json_type_name(other));
            Err(TypegenError::malformed(node.id(), reason).into())
        }
    }
}
