//! Schema Typegen
//!
//! Rule-driven generation of type declarations from JSON Schema documents.
//!
//! ## Features
//!
//! - **Canonical Identity**: every schema is keyed by (document URI, JSON pointer),
//!   so all spellings of a `$ref` share one generated type
//! - **Cycle Safety**: types are registered before their bodies, so recursive
//!   schemas terminate
//! - **Deterministic Naming**: collisions take the lowest free numeric suffix,
//!   claimed in generation order
//! - **Pluggable Output**: declarations go to any [`CodeSink`]; Rust source and a
//!   JSON model are bundled
//!
//! ## Architecture
//!
//! ```text
//! schema/            canonical identity, kind detection, document store
//! codegen/
//! ├── session.rs     per-run state (cache, type graph, naming scopes)
//! ├── dispatch.rs    kind → rule table, reference chain, unsupported policy
//! ├── rules/         object, array, enumeration, primitive, reference
//! ├── names.rs       sanitization and scoped uniqueness
//! ├── model.rs       generated type graph
//! └── sink/          CodeSink trait, Rust source and recording sinks
//! config.rs          layered TOML/env configuration
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use schema_typegen::{file_url, RustSink, SchemaStore, Session};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = file_url(std::path::Path::new("schemas/person.json"))?;
//! let mut session = Session::with_store(SchemaStore::from_filesystem());
//! session.generate(&root, "Person", Some("model"))?;
//!
//! let mut sink = RustSink::default();
//! session.emit(&mut sink)?;
//! println!("{}", sink.into_source());
//! # Ok(())
//! # }
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod schema;

use std::path::Path;

pub use codegen::{
    CodeSink, DeclKind, GenerationReport, NameResolver, RecordingSink, RuleTable, RustSink,
    Session, TypeGraph, TypeRef,
};
pub use config::{OutputFormat, TypegenConfig};
pub use error::{GenerationError, Result, TypegenError};
pub use schema::store::file_url;
pub use schema::{CanonicalId, SchemaKind, SchemaNode, SchemaStore};

/// Generate one schema file into `sink` with a fresh filesystem-backed session
pub fn generate_file<S: CodeSink>(
    path: &Path,
    class_name: &str,
    package: Option<&str>,
    config: &TypegenConfig,
    sink: &mut S,
) -> std::result::Result<GenerationReport, GenerationError> {
    let root = file_url(path)?;
    let mut session = Session::new(
        SchemaStore::from_filesystem(),
        config.naming.clone(),
        config.generation.clone(),
    );
    session.generate(&root, class_name, package)?;
    session.emit(sink)
}
