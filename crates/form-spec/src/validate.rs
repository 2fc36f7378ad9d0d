use std::sync::LazyLock;

use regex::Regex;

use crate::outcome::ErrorMap;
use crate::schema::Schema;
use crate::spec::field::{FieldKind, FieldSpec, Rule};
use crate::values::{FieldValue, FormValues};
use crate::visibility::{VisibilityMode, resolve_visibility};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"));
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(ftp|http|https)://[^ "]+$"#).expect("url pattern compiles")
});

/// Validates every visible field; hidden fields never produce errors.
pub fn validate(schema: &Schema, values: &FormValues) -> ErrorMap {
    let visibility = resolve_visibility(schema, values, VisibilityMode::Visible);
    let mut errors = ErrorMap::new();

    for field in schema.fields() {
        if !visibility.get(&field.key).copied().unwrap_or(true) {
            continue;
        }
        let value = values.get(&field.key).unwrap_or(&FieldValue::Null);
        if let Some(message) = check_field(schema, field, value, values) {
            errors.insert(field.key.clone(), message);
        }
    }

    tracing::debug!(form = %schema.id(), errors = errors.len(), "validation run");
    errors
}

fn check_field(
    schema: &Schema,
    field: &FieldSpec,
    value: &FieldValue,
    values: &FormValues,
) -> Option<String> {
    if field.kind != FieldKind::Virtual && value.is_blank() {
        return field
            .required
            .holds(values)
            .then(|| field.required_message());
    }

    if !value.fits(field.kind) {
        return Some(format!("{} has an unexpected value", field.title));
    }

    if field.kind == FieldKind::Choice
        && let Some(choices) = &field.choices
        && let Some(text) = value.as_text()
        && !choices.iter().any(|choice| choice == text)
    {
        return Some(format!(
            "{} must be one of: {}",
            field.title,
            choices.join(", ")
        ));
    }

    if let Some(rule) = &field.rule
        && let Some(default_message) = enforce_rule(schema, field, rule, value, values)
    {
        return Some(field.invalid_message.clone().unwrap_or(default_message));
    }

    schema
        .custom_validators(&field.key)
        .iter()
        .find_map(|validator| validator(value, values))
}

fn enforce_rule(
    schema: &Schema,
    field: &FieldSpec,
    rule: &Rule,
    value: &FieldValue,
    values: &FormValues,
) -> Option<String> {
    let title = &field.title;
    match rule {
        Rule::Email => value
            .as_text()
            .is_none_or(|text| !EMAIL.is_match(text))
            .then(|| format!("{title} is not valid")),
        Rule::PositiveNumber => {
            let number = match value {
                FieldValue::Number(number) => Some(*number),
                FieldValue::Text(text) => text.trim().parse::<f64>().ok(),
                _ => None,
            };
            number
                .is_none_or(|number| !number.is_finite() || number <= 0.0)
                .then(|| format!("{title} must be a number greater than 0"))
        }
        Rule::Digits { count } => value
            .as_text()
            .is_none_or(|text| {
                text.chars().count() != *count || !text.chars().all(|c| c.is_ascii_digit())
            })
            .then(|| format!("{title} must be exactly {count} digits")),
        Rule::Url => value
            .as_text()
            .is_none_or(|text| !URL.is_match(text))
            .then(|| format!("{title} must be a valid URL")),
        Rule::Pattern { .. } => {
            let regex = schema.pattern(&field.key)?;
            value
                .as_text()
                .is_none_or(|text| !regex.is_match(text))
                .then(|| format!("{title} does not match the expected format"))
        }
        Rule::Length { min, max } => {
            let length = value.as_text()?.chars().count();
            let too_short = min.is_some_and(|min| length < min);
            let too_long = max.is_some_and(|max| length > max);
            (too_short || too_long).then(|| match (min, max) {
                (Some(min), Some(max)) => {
                    format!("{title} must be between {min} and {max} characters")
                }
                (Some(min), None) => format!("{title} must be at least {min} characters"),
                (None, Some(max)) => format!("{title} must be at most {max} characters"),
                (None, None) => format!("{title} has an invalid length"),
            })
        }
        Rule::AtLeastOneOf { fields } => {
            let any_set = fields
                .iter()
                .any(|key| values.get(key).and_then(FieldValue::as_bool) == Some(true));
            (!any_set).then(|| {
                let titles = fields
                    .iter()
                    .map(|key| {
                        schema
                            .field(key)
                            .map(|other| other.title.as_str())
                            .unwrap_or(key.as_str())
                    })
                    .collect::<Vec<_>>();
                format!("Select at least one of: {}", titles.join(", "))
            })
        }
        Rule::Matches { field: other } => {
            let other_value = values.get(other).unwrap_or(&FieldValue::Null);
            (other_value != value).then(|| {
                let other_title = schema
                    .field(other)
                    .map(|spec| spec.title.as_str())
                    .unwrap_or(other.as_str());
                format!("{title} must match {other_title}")
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::form::FormSpec;
    use crate::values::FieldChange;

    fn single(field: FieldSpec) -> Schema {
        Schema::new(FormSpec::new("single", "Single").field(field)).expect("schema")
    }

    fn errors_for(schema: &Schema, key: &str, value: FieldValue) -> ErrorMap {
        let mut values = FormValues::defaults(schema);
        values
            .apply(schema, key, FieldChange::Set(value))
            .expect("assign");
        validate(schema, &values)
    }

    #[test]
    fn email_is_structural() {
        let schema = single(FieldSpec::new("email", FieldKind::Text, "Email").with_rule(Rule::Email));
        assert!(errors_for(&schema, "email", FieldValue::text("a@b.co")).is_empty());
        assert_eq!(
            errors_for(&schema, "email", FieldValue::text("a@b")).get("email"),
            Some("Email is not valid")
        );
        assert!(errors_for(&schema, "email", FieldValue::text("x y@b.co")).is_empty());
        assert!(errors_for(&schema, "email", FieldValue::text("x @b.co")).contains_key("email"));
    }

    #[test]
    fn positive_number_parses_text() {
        let schema = single(
            FieldSpec::new("age", FieldKind::Text, "Age").with_rule(Rule::PositiveNumber),
        );
        assert!(errors_for(&schema, "age", FieldValue::text(" 5 ")).is_empty());
        assert!(errors_for(&schema, "age", FieldValue::text("0.5")).is_empty());
        for bad in ["0", "-3", "abc", "5abc", "NaN", "inf"] {
            assert_eq!(
                errors_for(&schema, "age", FieldValue::text(bad)).get("age"),
                Some("Age must be a number greater than 0"),
                "input {bad:?}"
            );
        }
    }

    #[test]
    fn digits_require_exact_count() {
        let schema = single(
            FieldSpec::new("phone", FieldKind::Text, "Phone").with_rule(Rule::Digits { count: 10 }),
        );
        assert!(errors_for(&schema, "phone", FieldValue::text("0123456789")).is_empty());
        assert!(errors_for(&schema, "phone", FieldValue::text("012345678")).contains_key("phone"));
        assert!(errors_for(&schema, "phone", FieldValue::text("012345678a")).contains_key("phone"));
        assert!(errors_for(&schema, "phone", FieldValue::text("٠١٢٣٤٥٦٧٨٩")).contains_key("phone"));
    }

    #[test]
    fn url_requires_scheme_and_no_spaces() {
        let schema = single(FieldSpec::new("site", FieldKind::Text, "Site").with_rule(Rule::Url));
        for good in ["https://example.com", "ftp://files/x", "http://a"] {
            assert!(errors_for(&schema, "site", FieldValue::text(good)).is_empty(), "{good}");
        }
        for bad in ["example.com", "https://exa mple.com", "https://\"x\"", "mailto://x"] {
            assert!(errors_for(&schema, "site", FieldValue::text(bad)).contains_key("site"), "{bad}");
        }
    }

    #[test]
    fn optional_blank_skips_rules() {
        let schema = single(FieldSpec::new("site", FieldKind::Text, "Site").with_rule(Rule::Url));
        assert!(validate(&schema, &FormValues::defaults(&schema)).is_empty());
    }

    #[test]
    fn invalid_message_overrides_default() {
        let schema = single(
            FieldSpec::new("email", FieldKind::Text, "Email")
                .with_rule(Rule::Email)
                .with_invalid_message("Email is invalid"),
        );
        assert_eq!(
            errors_for(&schema, "email", FieldValue::text("nope")).get("email"),
            Some("Email is invalid")
        );
    }

    #[test]
    fn choice_outside_options_is_reported() {
        let schema = single(
            FieldSpec::new("size", FieldKind::Choice, "Size").with_choices(["S", "M"]),
        );
        assert_eq!(
            errors_for(&schema, "size", FieldValue::text("XL")).get("size"),
            Some("Size must be one of: S, M")
        );
    }

    #[test]
    fn length_bounds() {
        let schema = single(FieldSpec::new("code", FieldKind::Text, "Code").with_rule(
            Rule::Length {
                min: Some(2),
                max: Some(4),
            },
        ));
        assert!(errors_for(&schema, "code", FieldValue::text("abc")).is_empty());
        assert_eq!(
            errors_for(&schema, "code", FieldValue::text("abcde")).get("code"),
            Some("Code must be between 2 and 4 characters")
        );
    }

    #[test]
    fn matches_compares_other_field() {
        let spec = FormSpec::new("pw", "Password")
            .field(FieldSpec::new("password", FieldKind::Text, "Password"))
            .field(
                FieldSpec::new("confirm", FieldKind::Text, "Confirmation").with_rule(Rule::Matches {
                    field: "password".into(),
                }),
            );
        let schema = Schema::new(spec).expect("schema");
        let mut values = FormValues::defaults(&schema);
        values
            .apply(&schema, "password", FieldChange::Set(FieldValue::text("hunter2")))
            .expect("assign");
        values
            .apply(&schema, "confirm", FieldChange::Set(FieldValue::text("hunter3")))
            .expect("assign");
        assert_eq!(
            validate(&schema, &values).get("confirm"),
            Some("Confirmation must match Password")
        );
    }
}
