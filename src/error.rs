//! Error types for schema resolution and type generation

use std::fmt;

use thiserror::Error;

use crate::schema::CanonicalId;

/// Result type for typegen operations
pub type Result<T> = std::result::Result<T, TypegenError>;

/// Errors raised while resolving schemas or generating types
#[derive(Error, Debug)]
pub enum TypegenError {
    #[error("Schema unreachable: {uri}: {reason}")]
    SchemaUnreachable { uri: String, reason: String },

    #[error("Malformed schema at {id}: {reason}")]
    SchemaMalformed { id: String, reason: String },

    #[error("Unsupported construct `{construct}` at {id}")]
    UnsupportedConstruct { id: String, construct: String },

    #[error("Name resolution exhausted for `{candidate}` after {attempts} attempts")]
    NameResolutionExhausted { candidate: String, attempts: usize },

    #[error("Generation session was aborted by an earlier failure")]
    SessionAborted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl TypegenError {
    pub fn malformed(id: &CanonicalId, reason: impl Into<String>) -> Self {
        Self::SchemaMalformed {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(id: &CanonicalId, construct: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            id: id.to_string(),
            construct: construct.into(),
        }
    }

    pub fn unreachable(uri: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::SchemaUnreachable {
            uri: uri.to_string(),
            reason: reason.into(),
        }
    }
}

/// A fatal error that aborted a generation session.
///
/// Carries the chain of canonical identities, root first, that the dispatcher
/// was walking when the failure happened.
#[derive(Debug)]
pub struct GenerationError {
    pub error: TypegenError,
    pub chain: Vec<CanonicalId>,
}

impl GenerationError {
    /// Attach a reference chain unless an inner frame already did
    pub(crate) fn within(mut self, chain: &[CanonicalId]) -> Self {
        if self.chain.is_empty() {
            self.chain = chain.to_vec();
        }
        self
    }
}

impl From<TypegenError> for GenerationError {
    fn from(error: TypegenError) -> Self {
        Self {
            error,
            chain: Vec::new(),
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if !self.chain.is_empty() {
            let path: Vec<String> = self.chain.iter().map(|id| id.to_string()).collect();
            write!(f, "\n  via {}", path.join("\n   -> "))?;
        }
        Ok(())
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn id(pointer: &str) -> CanonicalId {
        CanonicalId::new(Url::parse("file:///schemas/root.json").unwrap(), pointer)
    }

    #[test]
    fn test_chain_is_attached_once() {
        let err: GenerationError = TypegenError::malformed(&id("/properties/a"), "enum is not an array").into();
        let err = err.within(&[id(""), id("/properties/a")]);
        let err = err.within(&[id("")]);

        assert_eq!(err.chain.len(), 2);
        let rendered = err.to_string();
        assert!(rendered.contains("enum is not an array"));
        assert!(rendered.contains("file:///schemas/root.json#/properties/a"));
    }
}
