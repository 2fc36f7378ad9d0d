use chrono::{DateTime, NaiveDateTime};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::schema::Schema;
use crate::spec::field::{FieldKind, FieldSpec};

const INSTANT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Boundary errors raised when values are assigned or state is changed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{field}' expects a {expected} value, got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("field '{0}' is not a checkbox group")]
    NotAGroup(String),
    #[error("field '{field}' has no member '{member}'")]
    UnknownMember { field: String, member: String },
    #[error("'{value}' is not a valid date/time for field '{field}'")]
    InvalidInstant { field: String, value: String },
    #[error("form was already submitted")]
    AlreadySubmitted,
}

/// Value held by a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Instant(NaiveDateTime),
    Group(IndexMap<String, bool>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Blank values fail a `required` check.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Number(_) | FieldValue::Instant(_) => false,
            FieldValue::Bool(flag) => !flag,
            FieldValue::Group(members) => !members.values().any(|checked| *checked),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Text(_) => "text",
            FieldValue::Number(_) => "number",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Instant(_) => "instant",
            FieldValue::Group(_) => "group",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Whether this value may be stored in a field of `kind`.
    pub fn fits(&self, kind: FieldKind) -> bool {
        matches!(
            (kind, self),
            (FieldKind::Text | FieldKind::Choice, FieldValue::Text(_))
                | (FieldKind::Number, FieldValue::Number(_) | FieldValue::Null)
                | (FieldKind::Boolean, FieldValue::Bool(_))
                | (FieldKind::Instant, FieldValue::Instant(_) | FieldValue::Null)
                | (FieldKind::Group, FieldValue::Group(_))
                | (FieldKind::Virtual, FieldValue::Null)
        )
    }

    /// Empty value of a field before any default applies.
    pub fn empty_for(field: &FieldSpec) -> Self {
        match field.kind {
            FieldKind::Text | FieldKind::Choice => FieldValue::Text(String::new()),
            FieldKind::Number | FieldKind::Instant | FieldKind::Virtual => FieldValue::Null,
            FieldKind::Boolean => FieldValue::Bool(false),
            FieldKind::Group => FieldValue::Group(
                field
                    .members
                    .iter()
                    .flatten()
                    .map(|member| (member.clone(), false))
                    .collect(),
            ),
        }
    }

    /// Converts a JSON value into the variant declared by `field`.
    pub fn from_json(field: &FieldSpec, value: &Value) -> Result<Self, FormError> {
        let mismatch = || FormError::TypeMismatch {
            field: field.key.clone(),
            expected: field.kind.as_str(),
            found: json_label(value),
        };
        match (field.kind, value) {
            (FieldKind::Text | FieldKind::Choice, Value::String(text)) => {
                Ok(FieldValue::Text(text.clone()))
            }
            (FieldKind::Text, Value::Number(number)) => Ok(FieldValue::Text(number.to_string())),
            (FieldKind::Number, Value::Null) => Ok(FieldValue::Null),
            (FieldKind::Number, Value::Number(number)) => {
                number.as_f64().map(FieldValue::Number).ok_or_else(mismatch)
            }
            (FieldKind::Boolean, Value::Bool(flag)) => Ok(FieldValue::Bool(*flag)),
            (FieldKind::Instant, Value::Null) => Ok(FieldValue::Null),
            (FieldKind::Instant, Value::String(text)) => {
                parse_instant(text)
                    .map(FieldValue::Instant)
                    .ok_or_else(|| FormError::InvalidInstant {
                        field: field.key.clone(),
                        value: text.clone(),
                    })
            }
            (FieldKind::Group, Value::Object(map)) => {
                let mut members = match FieldValue::empty_for(field) {
                    FieldValue::Group(members) => members,
                    _ => IndexMap::new(),
                };
                for (member, checked) in map {
                    let Some(slot) = members.get_mut(member) else {
                        return Err(FormError::UnknownMember {
                            field: field.key.clone(),
                            member: member.clone(),
                        });
                    };
                    *slot = checked.as_bool().ok_or_else(mismatch)?;
                }
                Ok(FieldValue::Group(members))
            }
            (FieldKind::Virtual, Value::Null) => Ok(FieldValue::Null),
            _ => Err(mismatch()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Number(number) => number_to_json(*number),
            FieldValue::Bool(flag) => Value::Bool(*flag),
            FieldValue::Instant(instant) => {
                Value::String(instant.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            FieldValue::Group(members) => Value::Object(
                members
                    .iter()
                    .map(|(member, checked)| (member.clone(), Value::Bool(*checked)))
                    .collect(),
            ),
        }
    }
}

/// Accepts RFC 3339 timestamps (offset dropped, wall clock kept) and plain local forms.
pub fn parse_instant(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.naive_local());
    }
    INSTANT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Whole numbers go out as integers so `2` reads back as `2`, not `2.0`.
fn number_to_json(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
        Value::from(number as i64)
    } else {
        Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn json_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Change event emitted by the host for a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    /// Replace the whole value.
    Set(FieldValue),
    /// Toggle one member of a checkbox group, leaving siblings untouched.
    Member { member: String, checked: bool },
}

/// Current values keyed by field, in schema order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct FormValues {
    entries: IndexMap<String, FieldValue>,
}

impl FormValues {
    /// One entry per schema field, holding its default.
    pub fn defaults(schema: &Schema) -> Self {
        let entries = schema
            .fields()
            .iter()
            .map(|field| (field.key.clone(), schema.default_for(field)))
            .collect();
        Self { entries }
    }

    /// Defaults overlaid with the keys present in `json`.
    pub fn from_json(schema: &Schema, json: &Value) -> Result<Self, FormError> {
        let mut values = Self::defaults(schema);
        let Some(map) = json.as_object() else {
            return Err(FormError::TypeMismatch {
                field: "<root>".into(),
                expected: "object",
                found: json_label(json),
            });
        };
        for (key, raw) in map {
            let field = schema
                .field(key)
                .ok_or_else(|| FormError::UnknownField(key.clone()))?;
            let value = FieldValue::from_json(field, raw)?;
            values.entries.insert(key.clone(), value);
        }
        Ok(values)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies a change after checking it against the field's declared kind.
    pub fn apply(&mut self, schema: &Schema, key: &str, change: FieldChange) -> Result<(), FormError> {
        let field = schema
            .field(key)
            .ok_or_else(|| FormError::UnknownField(key.to_string()))?;
        match change {
            FieldChange::Set(value) => {
                if !value.fits(field.kind) {
                    return Err(FormError::TypeMismatch {
                        field: key.to_string(),
                        expected: field.kind.as_str(),
                        found: value.label(),
                    });
                }
                if let FieldValue::Group(members) = &value
                    && let Some(unknown) = members
                        .keys()
                        .find(|member| !field.members.iter().flatten().any(|known| known == *member))
                {
                    return Err(FormError::UnknownMember {
                        field: key.to_string(),
                        member: unknown.clone(),
                    });
                }
                self.entries.insert(key.to_string(), value);
            }
            FieldChange::Member { member, checked } => {
                if field.kind != FieldKind::Group {
                    return Err(FormError::NotAGroup(key.to_string()));
                }
                let entry = self
                    .entries
                    .entry(key.to_string())
                    .or_insert_with(|| FieldValue::empty_for(field));
                let FieldValue::Group(members) = entry else {
                    return Err(FormError::NotAGroup(key.to_string()));
                };
                let Some(slot) = members.get_mut(&member) else {
                    return Err(FormError::UnknownMember {
                        field: key.to_string(),
                        member,
                    });
                };
                *slot = checked;
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        Value::Object(map)
    }
}
