use std::collections::{BTreeMap, BTreeSet};

use crate::schema::Schema;
use crate::values::FormValues;

/// Field key to whether it is shown; covers every field of the schema.
pub type VisibilityMap = BTreeMap<String, bool>;

/// Fallback for a `visible_if` that reads a field absent from the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityMode {
    Visible,
    Hidden,
}

impl VisibilityMode {
    fn fallback(self) -> bool {
        matches!(self, VisibilityMode::Visible)
    }
}

pub fn resolve_visibility(schema: &Schema, values: &FormValues, mode: VisibilityMode) -> VisibilityMap {
    schema
        .fields()
        .iter()
        .map(|field| {
            let shown = field.visible_if.as_ref().is_none_or(|expr| {
                expr.evaluate(values).unwrap_or_else(|| {
                    tracing::debug!(field = %field.key, ?mode, "visibility predicate unresolved");
                    mode.fallback()
                })
            });
            (field.key.clone(), shown)
        })
        .collect()
}

/// Keys of the fields currently shown to the user.
pub fn visible_fields(schema: &Schema, values: &FormValues) -> BTreeSet<String> {
    resolve_visibility(schema, values, VisibilityMode::Visible)
        .into_iter()
        .filter_map(|(key, visible)| visible.then_some(key))
        .collect()
}
