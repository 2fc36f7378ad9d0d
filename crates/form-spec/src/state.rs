use crate::outcome::{ErrorMap, SubmissionResult};
use crate::schema::Schema;
use crate::validate::validate;
use crate::values::{FieldChange, FormError, FormValues};

/// Per-session form state, passed into and returned from every transition.
#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Editing { values: FormValues, errors: ErrorMap },
    /// Terminal; resetting is up to the host.
    Submitted { snapshot: FormValues },
}

impl FormState {
    pub fn new(schema: &Schema) -> Self {
        FormState::Editing {
            values: FormValues::defaults(schema),
            errors: ErrorMap::new(),
        }
    }

    /// Starts editing from previously captured values.
    pub fn with_values(values: FormValues) -> Self {
        FormState::Editing {
            values,
            errors: ErrorMap::new(),
        }
    }

    pub fn values(&self) -> &FormValues {
        match self {
            FormState::Editing { values, .. } => values,
            FormState::Submitted { snapshot } => snapshot,
        }
    }

    /// Errors from the last rejected submit; always empty once submitted.
    pub fn errors(&self) -> Option<&ErrorMap> {
        match self {
            FormState::Editing { errors, .. } => Some(errors),
            FormState::Submitted { .. } => None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, FormState::Submitted { .. })
    }

    /// Applies one field change. Errors from the last run stay until the next submit.
    pub fn on_field_change(
        self,
        schema: &Schema,
        key: &str,
        change: FieldChange,
    ) -> Result<FormState, FormError> {
        match self {
            FormState::Editing { mut values, errors } => {
                tracing::trace!(form = %schema.id(), field = key, ?change, "field change");
                values.apply(schema, key, change)?;
                Ok(FormState::Editing { values, errors })
            }
            FormState::Submitted { .. } => Err(FormError::AlreadySubmitted),
        }
    }

    pub fn on_submit(self, schema: &Schema) -> FormState {
        match self {
            FormState::Editing { values, .. } => {
                let errors = validate(schema, &values);
                if errors.is_empty() {
                    tracing::info!(form = %schema.id(), "submission accepted");
                    FormState::Submitted { snapshot: values }
                } else {
                    tracing::info!(form = %schema.id(), errors = errors.len(), "submission rejected");
                    FormState::Editing { values, errors }
                }
            }
            submitted @ FormState::Submitted { .. } => submitted,
        }
    }
}

/// Validates `values` and captures an owned snapshot when they pass.
pub fn submit(schema: &Schema, values: &FormValues) -> SubmissionResult {
    let errors = validate(schema, values);
    if errors.is_empty() {
        SubmissionResult::Accepted(values.clone())
    } else {
        SubmissionResult::Rejected(errors)
    }
}
