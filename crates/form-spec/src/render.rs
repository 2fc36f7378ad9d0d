use serde_json::{Map, Value, json};

use crate::{
    answers_schema,
    outcome::ErrorMap,
    schema::Schema,
    spec::field::FieldKind,
    state::FormState,
    values::{FieldValue, FormValues},
    visibility::{VisibilityMode, resolve_visibility},
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Editing without reported errors.
    Editing,
    /// Editing after a rejected submit.
    Invalid,
    /// Accepted submission.
    Submitted,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Editing => "editing",
            RenderStatus::Invalid => "invalid",
            RenderStatus::Submitted => "submitted",
        }
    }
}

/// Counters exposed to renderers.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub filled: usize,
    pub total: usize,
}

/// Describes a single field for render outputs.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: FieldKind,
    pub required: bool,
    pub visible: bool,
    pub value: FieldValue,
    pub error: Option<String>,
    pub choices: Option<Vec<String>>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub form_version: String,
    pub status: RenderStatus,
    pub progress: RenderProgress,
    pub help: Option<String>,
    pub submit_label: String,
    pub fields: Vec<RenderField>,
    pub schema: Value,
}

pub fn build_render_payload(schema: &Schema, state: &FormState) -> RenderPayload {
    let values = state.values();
    let empty = ErrorMap::new();
    let errors = state.errors().unwrap_or(&empty);
    let visibility = resolve_visibility(schema, values, VisibilityMode::Visible);

    let fields = schema
        .fields()
        .iter()
        .map(|field| RenderField {
            key: field.key.clone(),
            title: field.title.clone(),
            description: field.description.clone(),
            kind: field.kind,
            required: field.required.holds(values),
            visible: visibility.get(&field.key).copied().unwrap_or(true),
            value: values.get(&field.key).cloned().unwrap_or(FieldValue::Null),
            error: errors.get(&field.key).map(str::to_string),
            choices: field.choices.clone(),
        })
        .collect::<Vec<_>>();

    let inputs = fields
        .iter()
        .filter(|field| field.visible && field.kind.has_input());
    let total = inputs.clone().count();
    let filled = inputs.filter(|field| !field.value.is_blank()).count();

    let status = if state.is_submitted() {
        RenderStatus::Submitted
    } else if errors.is_empty() {
        RenderStatus::Editing
    } else {
        RenderStatus::Invalid
    };

    let spec = schema.spec();
    RenderPayload {
        form_id: spec.id.clone(),
        form_title: spec.title.clone(),
        form_version: spec.version.clone(),
        status,
        progress: RenderProgress { filled, total },
        help: spec.description.clone(),
        submit_label: spec.submit_label.clone().unwrap_or_else(|| "Submit".into()),
        fields,
        schema: answers_schema::generate(schema, values, &visibility),
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("key".into(), Value::String(field.key.clone()));
            map.insert("title".into(), Value::String(field.title.clone()));
            map.insert(
                "description".into(),
                field
                    .description
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            map.insert("type".into(), Value::String(field.kind.as_str().to_string()));
            map.insert("required".into(), Value::Bool(field.required));
            map.insert("visible".into(), Value::Bool(field.visible));
            map.insert("value".into(), field.value.to_json());
            if let Some(error) = &field.error {
                map.insert("error".into(), Value::String(error.clone()));
            }
            if let Some(choices) = &field.choices {
                map.insert(
                    "choices".into(),
                    Value::Array(
                        choices
                            .iter()
                            .map(|choice| Value::String(choice.clone()))
                            .collect(),
                    ),
                );
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "form_version": payload.form_version,
        "status": payload.status.as_str(),
        "progress": {
            "filled": payload.progress.filled,
            "total": payload.progress.total,
        },
        "help": payload.help,
        "submit_label": payload.submit_label,
        "fields": fields,
        "schema": payload.schema,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", payload.form_title, payload.form_id));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.filled,
        payload.progress.total
    ));
    if let Some(help) = &payload.help {
        lines.push(format!("Help: {}", help));
    }

    lines.push("Visible fields:".to_string());
    for field in payload
        .fields
        .iter()
        .filter(|field| field.visible && field.kind.has_input())
    {
        let mut entry = format!(" - {} ({})", field.key, field.title);
        if field.required {
            entry.push_str(" [required]");
        }
        if !field.value.is_blank() {
            entry.push_str(&format!(" = {}", value_to_display(&field.value)));
        }
        lines.push(entry);
    }

    let errors = payload
        .fields
        .iter()
        .filter_map(|field| field.error.as_ref().map(|error| (&field.key, error)))
        .collect::<Vec<_>>();
    if !errors.is_empty() {
        lines.push("Errors:".to_string());
        for (key, error) in errors {
            lines.push(format!("  {} - {}", key, error));
        }
    }

    lines.join("\n")
}

/// Title/value lines for the visible inputs of an accepted submission.
pub fn render_summary(schema: &Schema, snapshot: &FormValues) -> String {
    let visibility = resolve_visibility(schema, snapshot, VisibilityMode::Visible);
    let mut lines = vec![
        format!("{} submitted successfully", schema.spec().title),
        "Summary:".to_string(),
    ];
    for field in schema.fields() {
        if !field.kind.has_input() || !visibility.get(&field.key).copied().unwrap_or(true) {
            continue;
        }
        let value = snapshot.get(&field.key).unwrap_or(&FieldValue::Null);
        lines.push(format!("  {}: {}", field.title, value_to_display(value)));
    }
    lines.join("\n")
}

/// Text shown for a value; groups list their checked members.
pub fn value_to_display(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => String::new(),
        FieldValue::Text(text) => text.clone(),
        FieldValue::Number(number) => number.to_string(),
        FieldValue::Bool(flag) => (if *flag { "yes" } else { "no" }).to_string(),
        FieldValue::Instant(instant) => instant.format("%B %-d, %Y %-I:%M %p").to_string(),
        FieldValue::Group(members) => members
            .iter()
            .filter(|(_, checked)| **checked)
            .map(|(member, _)| member.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}
