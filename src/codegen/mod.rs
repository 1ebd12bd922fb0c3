//! Code Generation
//!
//! Generates type declarations from JSON Schema.
//!
//! Architecture:
//! - Session: owns the schema store, identity cache, type graph and naming scopes
//! - Dispatcher: maps a node's declared kind to a rule via an explicit RuleTable
//! - Rules: object, array, enum, primitive, reference, untyped
//! - Sinks: receive finished declarations (Rust source, recorded model)
//!
//! The key constraint: sinks NEVER read raw schema JSON, only rendered declarations.

pub mod config;
pub mod dispatch;
pub mod model;
pub mod names;
pub mod rules;
pub mod session;
pub mod sink;

pub use config::{
    Casing, GenerationConfig, NamingConfig, RenderProfile, TypeMappings, UnsupportedPolicy,
};
pub use dispatch::{Rule, RuleContext, RuleKind, RuleTable};
pub use model::{
    DeclKind, EnumConstant, Extension, Field, GeneratedType, PrimitiveType, TypeGraph, TypeId,
    TypeKind, TypeRef,
};
pub use names::{singularize, IdentifierStyle, NameResolver, NamingScope};
pub use session::{GenerationReport, Session};
pub use sink::{render, CodeSink, Declaration, FieldDecl, RecordingSink, RustSink, SinkType};
