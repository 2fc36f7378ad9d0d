use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

use crate::spec::field::{FieldKind, FieldSpec, Requirement, Rule};
use crate::spec::form::FormSpec;
use crate::values::{FieldValue, FormError, FormValues};

/// Host-supplied check: `(value, values) -> Some(message)` on failure.
pub type CustomValidator = Arc<dyn Fn(&FieldValue, &FormValues) -> Option<String> + Send + Sync>;

/// Structural problems found while building a [`Schema`].
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse form spec: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("form '{form}' declares field '{key}' more than once")]
    DuplicateField { form: String, key: String },
    #[error("field '{field}' references unknown field '{reference}'")]
    UnknownReference { field: String, reference: String },
    #[error("choice field '{0}' declares no choices")]
    MissingChoices(String),
    #[error("group field '{0}' declares no members")]
    MissingMembers(String),
    #[error("field '{field}' has an invalid pattern: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
    #[error("field '{field}' has an invalid default: {source}")]
    InvalidDefault {
        field: String,
        #[source]
        source: FormError,
    },
    #[error("no built-in form named '{0}'")]
    UnknownBuiltin(String),
    #[error("cannot attach a validator to unknown field '{0}'")]
    UnknownValidatorTarget(String),
}

/// A [`FormSpec`] that passed structural checks, ready for validation.
#[derive(Clone)]
pub struct Schema {
    spec: FormSpec,
    defaults: HashMap<String, FieldValue>,
    patterns: HashMap<String, Regex>,
    custom: HashMap<String, Vec<CustomValidator>>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("id", &self.spec.id)
            .field("fields", &self.spec.fields.len())
            .field("custom_validators", &self.custom.len())
            .finish()
    }
}

impl Schema {
    pub fn new(spec: FormSpec) -> Result<Self, SchemaError> {
        let mut seen = BTreeSet::new();
        for field in &spec.fields {
            if !seen.insert(field.key.as_str()) {
                return Err(SchemaError::DuplicateField {
                    form: spec.id.clone(),
                    key: field.key.clone(),
                });
            }
        }

        let mut patterns = HashMap::new();
        let mut defaults = HashMap::new();
        for field in &spec.fields {
            check_references(field, &seen)?;
            match field.kind {
                FieldKind::Choice if field.choices.as_ref().is_none_or(Vec::is_empty) => {
                    return Err(SchemaError::MissingChoices(field.key.clone()));
                }
                FieldKind::Group if field.members.as_ref().is_none_or(Vec::is_empty) => {
                    return Err(SchemaError::MissingMembers(field.key.clone()));
                }
                _ => {}
            }
            if let Some(Rule::Pattern { pattern }) = &field.rule {
                let regex = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
                    field: field.key.clone(),
                    source,
                })?;
                patterns.insert(field.key.clone(), regex);
            }
            if let Some(raw) = &field.default_value {
                let value = FieldValue::from_json(field, raw).map_err(|source| {
                    SchemaError::InvalidDefault {
                        field: field.key.clone(),
                        source,
                    }
                })?;
                defaults.insert(field.key.clone(), value);
            }
        }

        tracing::debug!(form = %spec.id, fields = spec.fields.len(), "schema built");
        Ok(Self {
            spec,
            defaults,
            patterns,
            custom: HashMap::new(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let spec: FormSpec = serde_json::from_str(json).map_err(SchemaError::Parse)?;
        Self::new(spec)
    }

    /// Attaches a host validator to `key`; runs after the field's built-in rule.
    pub fn with_validator<F>(mut self, key: &str, validator: F) -> Result<Self, SchemaError>
    where
        F: Fn(&FieldValue, &FormValues) -> Option<String> + Send + Sync + 'static,
    {
        if self.field(key).is_none() {
            return Err(SchemaError::UnknownValidatorTarget(key.to_string()));
        }
        self.custom
            .entry(key.to_string())
            .or_default()
            .push(Arc::new(validator));
        Ok(self)
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.spec.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.spec.fields.iter().find(|field| field.key == key)
    }

    pub(crate) fn default_for(&self, field: &FieldSpec) -> FieldValue {
        self.defaults
            .get(&field.key)
            .cloned()
            .unwrap_or_else(|| FieldValue::empty_for(field))
    }

    pub(crate) fn pattern(&self, key: &str) -> Option<&Regex> {
        self.patterns.get(key)
    }

    pub(crate) fn custom_validators(&self, key: &str) -> &[CustomValidator] {
        self.custom.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn check_references(field: &FieldSpec, known: &BTreeSet<&str>) -> Result<(), SchemaError> {
    let mut references = Vec::new();
    if let Some(expr) = &field.visible_if {
        references.extend(expr.references());
    }
    if let Requirement::When(expr) = &field.required {
        references.extend(expr.references());
    }
    if let Some(rule) = &field.rule {
        references.extend(rule.references());
    }
    match references.into_iter().find(|reference| !known.contains(reference)) {
        Some(reference) => Err(SchemaError::UnknownReference {
            field: field.key.clone(),
            reference: reference.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use serde_json::json;

    fn base() -> FormSpec {
        FormSpec::new("test", "Test").field(FieldSpec::new("name", FieldKind::Text, "Name"))
    }

    #[test]
    fn rejects_duplicate_keys() {
        let spec = base().field(FieldSpec::new("name", FieldKind::Text, "Again"));
        assert!(matches!(
            Schema::new(spec),
            Err(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn rejects_unknown_visibility_reference() {
        let spec = base()
            .field(FieldSpec::new("guest", FieldKind::Text, "Guest").visible_if(Expr::var("ghost")));
        let err = Schema::new(spec).unwrap_err();
        assert_eq!(
            err.to_string(),
            "field 'guest' references unknown field 'ghost'"
        );
    }

    #[test]
    fn rejects_invalid_pattern() {
        let spec = base().field(
            FieldSpec::new("code", FieldKind::Text, "Code").with_rule(Rule::Pattern {
                pattern: "([".into(),
            }),
        );
        assert!(matches!(
            Schema::new(spec),
            Err(SchemaError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn rejects_group_without_members() {
        let spec = base().field(FieldSpec::new("skills", FieldKind::Group, "Skills"));
        assert!(matches!(
            Schema::new(spec),
            Err(SchemaError::MissingMembers(_))
        ));
    }

    #[test]
    fn rejects_mistyped_default() {
        let spec = base()
            .field(FieldSpec::new("flag", FieldKind::Boolean, "Flag").with_default(json!("yes")));
        assert!(matches!(
            Schema::new(spec),
            Err(SchemaError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn validator_target_must_exist() {
        let schema = Schema::new(base()).expect("schema");
        let err = schema.with_validator("ghost", |_, _| None).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownValidatorTarget(_)));
    }

    #[test]
    fn defaults_apply_declared_values() {
        let spec = base()
            .field(FieldSpec::new("flag", FieldKind::Boolean, "Flag").with_default(json!(true)));
        let schema = Schema::new(spec).expect("schema");
        let values = FormValues::defaults(&schema);
        assert_eq!(values.get("flag"), Some(&FieldValue::Bool(true)));
        assert_eq!(values.get("name"), Some(&FieldValue::text("")));
    }
}
