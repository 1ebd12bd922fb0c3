//! Built-in generation rules, one per dispatchable schema kind.

mod array;
mod enumeration;
mod object;
mod primitive;
mod reference;

pub use array::ArrayRule;
pub use enumeration::EnumRule;
pub use object::ObjectRule;
pub use primitive::{refine_primitive, PrimitiveRule, UntypedRule};
pub use reference::{reference_hint, ReferenceRule};
