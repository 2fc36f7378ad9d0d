use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::values::{FieldValue, FormValues};

/// Lightweight expression AST used for `visible_if` and conditional `required`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    LiteralBool { value: bool },
    Var { field: String },
    Eq { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    IsSet { field: String },
    And { expressions: Vec<Expr> },
    Or { expressions: Vec<Expr> },
    Not { expression: Box<Expr> },
}

impl Expr {
    pub fn var(field: impl Into<String>) -> Self {
        Expr::Var {
            field: field.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn one_of<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Expr::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn negate(expression: Expr) -> Self {
        Expr::Not {
            expression: Box::new(expression),
        }
    }

    /// Evaluates the expression to a boolean if possible.
    pub fn evaluate(&self, values: &FormValues) -> Option<bool> {
        match self {
            Expr::LiteralBool { value } => Some(*value),
            Expr::Var { field } => values.get(field)?.as_bool(),
            Expr::Eq { field, value } => Some(same_value(values.get(field)?, value)),
            Expr::In { field, values: candidates } => {
                let current = values.get(field)?;
                Some(candidates.iter().any(|candidate| same_value(current, candidate)))
            }
            Expr::IsSet { field } => Some(!values.get(field)?.is_blank()),
            Expr::And { expressions } => {
                for expr in expressions {
                    match expr.evaluate(values) {
                        Some(true) => continue,
                        Some(false) => return Some(false),
                        None => return None,
                    }
                }
                Some(true)
            }
            Expr::Or { expressions } => {
                for expr in expressions {
                    if let Some(true) = expr.evaluate(values) {
                        return Some(true);
                    }
                }
                Some(false)
            }
            Expr::Not { expression } => expression.evaluate(values).map(|value| !value),
        }
    }

    /// Every field key the expression reads.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::LiteralBool { .. } => {}
            Expr::Var { field }
            | Expr::Eq { field, .. }
            | Expr::In { field, .. }
            | Expr::IsSet { field } => out.push(field),
            Expr::And { expressions } | Expr::Or { expressions } => {
                for expr in expressions {
                    expr.collect_references(out);
                }
            }
            Expr::Not { expression } => expression.collect_references(out),
        }
    }
}

/// Numbers compare by value so `2` in a schema matches a stored `2.0`.
fn same_value(current: &FieldValue, literal: &Value) -> bool {
    match (current, literal.as_f64()) {
        (FieldValue::Number(number), Some(expected)) => *number == expected,
        _ => current.to_json() == *literal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::spec::{FieldKind, FieldSpec, FormSpec};
    use serde_json::json;

    #[test]
    fn deserializes_tagged_ops() {
        let expr: Expr = serde_json::from_value(json!({
            "op": "or",
            "expressions": [
                { "op": "eq", "field": "position", "value": "Designer" },
                { "op": "not", "expression": { "op": "var", "field": "flag" } }
            ]
        }))
        .expect("expr");
        assert_eq!(expr.references(), vec!["position", "flag"]);
    }

    #[test]
    fn missing_field_cannot_be_evaluated() {
        let values = FormValues::default();
        assert_eq!(Expr::var("flag").evaluate(&values), None);
        assert_eq!(
            Expr::And {
                expressions: vec![Expr::LiteralBool { value: true }, Expr::var("flag")]
            }
            .evaluate(&values),
            None
        );
        assert_eq!(
            Expr::Or {
                expressions: vec![Expr::var("flag"), Expr::LiteralBool { value: true }]
            }
            .evaluate(&values),
            Some(true)
        );
    }

    #[test]
    fn number_fields_compare_numerically() {
        let schema = Schema::new(
            FormSpec::new("party", "Party")
                .field(FieldSpec::new("guests", FieldKind::Number, "Guests"))
                .field(FieldSpec::new("price", FieldKind::Number, "Price")),
        )
        .expect("schema");
        let values = FormValues::from_json(&schema, &json!({ "guests": 2, "price": 2.5 }))
            .expect("values");
        assert_eq!(Expr::eq("guests", 2).evaluate(&values), Some(true));
        assert_eq!(Expr::eq("guests", 2.0).evaluate(&values), Some(true));
        assert_eq!(Expr::eq("guests", "2").evaluate(&values), Some(false));
        assert_eq!(Expr::one_of("guests", [1, 2, 3]).evaluate(&values), Some(true));
        assert_eq!(Expr::one_of("price", [2, 3]).evaluate(&values), Some(false));
        assert_eq!(
            Expr::negate(Expr::one_of("price", [2.5])).evaluate(&values),
            Some(false)
        );
    }
}
