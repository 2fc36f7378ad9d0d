#![allow(missing_docs)]

pub mod answers_schema;
pub mod expr;
pub mod forms;
pub mod outcome;
pub mod render;
pub mod schema;
pub mod spec;
pub mod state;
pub mod validate;
pub mod values;
pub mod visibility;

pub use answers_schema::generate as answers_schema;
pub use expr::Expr;
pub use forms::{BUILTIN_FORMS, builtin};
pub use outcome::{ErrorMap, SubmissionResult};
pub use render::{
    RenderField, RenderPayload, RenderProgress, RenderStatus, build_render_payload,
    render_json_ui, render_summary, render_text,
};
pub use schema::{CustomValidator, Schema, SchemaError};
pub use spec::{FieldKind, FieldSpec, FormSpec, Requirement, Rule};
pub use state::{FormState, submit};
pub use validate::validate;
pub use values::{FieldChange, FieldValue, FormError, FormValues, parse_instant};
pub use visibility::{VisibilityMap, VisibilityMode, resolve_visibility, visible_fields};
