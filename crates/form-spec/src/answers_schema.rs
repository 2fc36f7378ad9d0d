use serde_json::{Map, Value, json};

use crate::schema::Schema;
use crate::spec::field::{FieldKind, FieldSpec, Rule};
use crate::values::FormValues;
use crate::visibility::VisibilityMap;

/// JSON Schema describing the values of the visible inputs.
///
/// `required` lists the visible fields whose requirement currently holds.
pub fn generate(schema: &Schema, values: &FormValues, visibility: &VisibilityMap) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in schema.fields() {
        if !field.kind.has_input() || !visibility.get(&field.key).copied().unwrap_or(true) {
            continue;
        }
        properties.insert(field.key.clone(), property_schema(field));
        if field.required.holds(values) {
            required.push(Value::String(field.key.clone()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": schema.spec().title,
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn property_schema(field: &FieldSpec) -> Value {
    let mut map = Map::new();
    map.insert("title".into(), Value::String(field.title.clone()));
    if let Some(description) = &field.description {
        map.insert("description".into(), Value::String(description.clone()));
    }
    match field.kind {
        FieldKind::Text => {
            map.insert("type".into(), json!("string"));
            match &field.rule {
                Some(Rule::Email) => {
                    map.insert("format".into(), json!("email"));
                }
                Some(Rule::Url) => {
                    map.insert("format".into(), json!("uri"));
                }
                Some(Rule::Digits { count }) => {
                    map.insert("pattern".into(), json!(format!("^[0-9]{{{count}}}$")));
                }
                Some(Rule::Pattern { pattern }) => {
                    map.insert("pattern".into(), json!(pattern));
                }
                Some(Rule::Length { min, max }) => {
                    if let Some(min) = min {
                        map.insert("minLength".into(), json!(min));
                    }
                    if let Some(max) = max {
                        map.insert("maxLength".into(), json!(max));
                    }
                }
                _ => {}
            }
        }
        FieldKind::Number => {
            map.insert("type".into(), json!(["number", "null"]));
            if matches!(field.rule, Some(Rule::PositiveNumber)) {
                map.insert("exclusiveMinimum".into(), json!(0));
            }
        }
        FieldKind::Boolean => {
            map.insert("type".into(), json!("boolean"));
        }
        FieldKind::Choice => {
            let mut options = field
                .choices
                .iter()
                .flatten()
                .map(|choice| Value::String(choice.clone()))
                .collect::<Vec<_>>();
            options.push(Value::String(String::new()));
            map.insert("type".into(), json!("string"));
            map.insert("enum".into(), Value::Array(options));
        }
        FieldKind::Instant => {
            map.insert("type".into(), json!(["string", "null"]));
            map.insert("format".into(), json!("date-time"));
        }
        FieldKind::Group => {
            let members = field
                .members
                .iter()
                .flatten()
                .map(|member| (member.clone(), json!({ "type": "boolean" })))
                .collect::<Map<_, _>>();
            map.insert("type".into(), json!("object"));
            map.insert("properties".into(), Value::Object(members));
            map.insert("additionalProperties".into(), json!(false));
        }
        FieldKind::Virtual => {}
    }
    Value::Object(map)
}
