pub mod field;
pub mod form;

pub use field::{FieldKind, FieldSpec, Requirement, Rule};
pub use form::FormSpec;
