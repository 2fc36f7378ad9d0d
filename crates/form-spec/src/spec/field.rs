use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expr::Expr;
use crate::values::FormValues;

/// Declared kind of a field; fixes which [`FieldValue`](crate::FieldValue) variant it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text, including numbers typed as text.
    Text,
    /// Numeric value, `null` while unset.
    Number,
    /// Toggle or single checkbox.
    Boolean,
    /// One entry out of `choices`, empty string while unselected.
    Choice,
    /// Selected date and time, `null` while unset.
    Instant,
    /// Checkbox group keyed by `members`.
    Group,
    /// Synthetic key without an input; carries cross-field rules.
    Virtual,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Choice => "choice",
            FieldKind::Instant => "instant",
            FieldKind::Group => "group",
            FieldKind::Virtual => "virtual",
        }
    }

    /// Whether the host renders an input for this kind.
    pub fn has_input(&self) -> bool {
        !matches!(self, FieldKind::Virtual)
    }
}

/// Requirement flag: either fixed or computed from the current values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Requirement {
    Always(bool),
    When(Expr),
}

impl Default for Requirement {
    fn default() -> Self {
        Requirement::Always(false)
    }
}

impl Requirement {
    /// An expression that cannot be evaluated does not make the field required.
    pub fn holds(&self, values: &FormValues) -> bool {
        match self {
            Requirement::Always(required) => *required,
            Requirement::When(expr) => expr.evaluate(values).unwrap_or(false),
        }
    }
}

/// Built-in validators attached to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    /// `<non-space>+@<non-space>+.<non-space>+` anywhere in the text.
    Email,
    /// Parses as a finite number strictly greater than zero.
    PositiveNumber,
    /// Exactly `count` ASCII digits.
    Digits { count: usize },
    /// `ftp://`, `http://` or `https://` followed by non-space, non-quote characters.
    Url,
    /// Regular expression, compiled when the schema is built.
    Pattern { pattern: String },
    /// Character count bounds.
    Length {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },
    /// At least one of the listed boolean fields is set.
    AtLeastOneOf { fields: Vec<String> },
    /// Equal to the value of another field.
    Matches { field: String },
}

impl Rule {
    /// Field keys this rule reads besides its own field.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Rule::AtLeastOneOf { fields } => fields.iter().map(String::as_str).collect(),
            Rule::Matches { field } => vec![field.as_str()],
            _ => Vec::new(),
        }
    }
}

/// A single field of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: Requirement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<Expr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_message: Option<String>,
}

impl FieldSpec {
    pub fn new(key: impl Into<String>, kind: FieldKind, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            title: title.into(),
            description: None,
            required: Requirement::default(),
            visible_if: None,
            rule: None,
            choices: None,
            members: None,
            default_value: None,
            required_message: None,
            invalid_message: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = Requirement::Always(true);
        self
    }

    pub fn required_when(mut self, expr: Expr) -> Self {
        self.required = Requirement::When(expr);
        self
    }

    pub fn visible_if(mut self, expr: Expr) -> Self {
        self.visible_if = Some(expr);
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = Some(members.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_required_message(mut self, message: impl Into<String>) -> Self {
        self.required_message = Some(message.into());
        self
    }

    pub fn with_invalid_message(mut self, message: impl Into<String>) -> Self {
        self.invalid_message = Some(message.into());
        self
    }

    pub fn required_message(&self) -> String {
        self.required_message
            .clone()
            .unwrap_or_else(|| format!("{} is required", self.title))
    }
}
