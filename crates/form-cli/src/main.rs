mod wizard;

use clap::{Parser, Subcommand, ValueEnum};
use form_spec::{
    BUILTIN_FORMS, FieldChange, FieldKind, FieldSpec, FieldValue, FormSpec, FormState, FormValues,
    Schema, VisibilityMode, answers_schema, build_render_payload, builtin, parse_instant,
    render_json_ui, render_text, resolve_visibility, visible_fields,
};
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wizard::{AnswerParseError, PromptContext, Verbosity, WizardPresenter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOG_ENV: &str = "FORMCHECK_LOG";
const FORM_ENV: &str = "FORMCHECK_FORM";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Schema-driven form validation",
    long_about = "Validates form values against a form schema, resolves conditional fields, and runs interactive fill sessions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List the built-in forms.
    Forms,
    /// Print the form definition as JSON.
    Describe {
        /// Built-in form name or path to a form JSON file (defaults to FORMCHECK_FORM).
        #[arg(long, value_name = "FORM")]
        form: Option<String>,
    },
    /// Print the JSON Schema of the values accepted by the visible fields.
    Schema {
        /// Built-in form name or path to a form JSON file (defaults to FORMCHECK_FORM).
        #[arg(long, value_name = "FORM")]
        form: Option<String>,
        /// Optional JSON file with the current values.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Print the JSON Schema of the form definition format instead.
        #[arg(long)]
        format_spec: bool,
    },
    /// List the fields visible for the given values, in form order.
    Visible {
        /// Built-in form name or path to a form JSON file (defaults to FORMCHECK_FORM).
        #[arg(long, value_name = "FORM")]
        form: Option<String>,
        /// Optional JSON file with the current values.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
    },
    /// Validate values against a form.
    Validate {
        /// Built-in form name or path to a form JSON file (defaults to FORMCHECK_FORM).
        #[arg(long, value_name = "FORM")]
        form: Option<String>,
        /// JSON file with the values to check.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
    },
    /// Submit values: print the summary when accepted, the errors otherwise.
    Submit {
        /// Built-in form name or path to a form JSON file (defaults to FORMCHECK_FORM).
        #[arg(long, value_name = "FORM")]
        form: Option<String>,
        /// JSON file with the values to submit.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
        /// Also print the accepted values as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Fill a form interactively on stdin.
    Fill {
        /// Built-in form name or path to a form JSON file (defaults to FORMCHECK_FORM).
        #[arg(long, value_name = "FORM")]
        form: Option<String>,
        /// Optional JSON file with initial values.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Show verbose output (status, visible fields, parse expectations).
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Also print the accepted values as JSON.
        #[arg(long)]
        json: bool,
        /// Render output mode shown before each prompt.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Forms => {
            for name in BUILTIN_FORMS {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Describe { form } => run_describe(form),
        Command::Schema {
            form,
            values,
            format_spec,
        } => run_schema(form, values, format_spec),
        Command::Visible { form, values } => run_visible(form, values),
        Command::Validate { form, values } => run_validate(form, values),
        Command::Submit { form, values, json } => run_submit(form, values, json),
        Command::Fill {
            form,
            values,
            verbose,
            json,
            format,
        } => run_fill(form, values, verbose, json, format),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn resolve_form_name(form: Option<String>) -> CliResult<String> {
    match form {
        Some(name) => Ok(name),
        None => env::var(FORM_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| format!("no form given; pass --form or set {}", FORM_ENV).into()),
    }
}

fn load_schema(form: Option<String>) -> CliResult<Schema> {
    let name = resolve_form_name(form)?;
    if BUILTIN_FORMS.contains(&name.as_str()) {
        tracing::debug!(form = %name, "loading built-in form");
        return Ok(builtin(&name)?);
    }
    tracing::debug!(path = %name, "loading form file");
    let json = fs::read_to_string(&name)
        .map_err(|err| format!("cannot read form '{}': {}", name, err))?;
    Ok(Schema::from_json(&json)?)
}

fn load_values(schema: &Schema, path: Option<&Path>) -> CliResult<FormValues> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            let json: Value = serde_json::from_str(&contents)?;
            Ok(FormValues::from_json(schema, &json)?)
        }
        None => Ok(FormValues::defaults(schema)),
    }
}

fn run_describe(form: Option<String>) -> CliResult<()> {
    let schema = load_schema(form)?;
    println!("{}", serde_json::to_string_pretty(schema.spec())?);
    Ok(())
}

fn run_schema(form: Option<String>, values: Option<PathBuf>, format_spec: bool) -> CliResult<()> {
    if format_spec {
        let format = schemars::schema_for!(FormSpec);
        println!("{}", serde_json::to_string_pretty(&format)?);
        return Ok(());
    }
    let schema = load_schema(form)?;
    let values = load_values(&schema, values.as_deref())?;
    let visibility = resolve_visibility(&schema, &values, VisibilityMode::Visible);
    let generated = answers_schema(&schema, &values, &visibility);
    println!("{}", serde_json::to_string_pretty(&generated)?);
    Ok(())
}

fn run_visible(form: Option<String>, values: Option<PathBuf>) -> CliResult<()> {
    let schema = load_schema(form)?;
    let values = load_values(&schema, values.as_deref())?;
    let visible = visible_fields(&schema, &values);
    for field in schema.fields() {
        if visible.contains(&field.key) {
            println!("{}", field.key);
        }
    }
    Ok(())
}

fn run_validate(form: Option<String>, values: PathBuf) -> CliResult<()> {
    let schema = load_schema(form)?;
    let values = load_values(&schema, Some(values.as_path()))?;

    let errors = form_spec::validate(&schema, &values);
    println!(
        "Validation result: {}",
        if errors.is_empty() { "valid" } else { "invalid" }
    );
    for (key, message) in errors.iter() {
        println!("  {} - {}", key, message);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn run_submit(form: Option<String>, values: PathBuf, json: bool) -> CliResult<()> {
    let schema = load_schema(form)?;
    let values = load_values(&schema, Some(values.as_path()))?;
    let presenter = WizardPresenter::new(Verbosity::Clean, json);

    match FormState::with_values(values).on_submit(&schema) {
        FormState::Submitted { snapshot } => {
            presenter.show_completion(&schema, &snapshot);
            Ok(())
        }
        FormState::Editing { errors, .. } => {
            presenter.show_errors(&errors);
            Err("submission rejected".into())
        }
    }
}

fn run_fill(
    form: Option<String>,
    values: Option<PathBuf>,
    verbose: bool,
    json: bool,
    format: RenderMode,
) -> CliResult<()> {
    let schema = load_schema(form)?;
    let mut state = FormState::with_values(load_values(&schema, values.as_deref())?);
    let presenter = WizardPresenter::new(Verbosity::from_verbose(verbose), json);
    presenter.show_header(&schema);

    let mut pending: Option<Vec<String>> = None;
    loop {
        for field in schema.fields() {
            if !field.kind.has_input() {
                continue;
            }
            if let Some(keys) = &pending
                && !keys.contains(&field.key)
            {
                continue;
            }
            let visible = visible_fields(&schema, state.values());
            if !visible.contains(&field.key) {
                continue;
            }
            let (index, total) = prompt_position(&schema, &visible, &field.key);
            print_render_output(format, &presenter, &schema, &state)?;
            let prompt = PromptContext::new(field, state.values(), index, total);
            state = prompt_field(&schema, state, field, &prompt, &presenter)?;
        }

        state = state.on_submit(&schema);
        match &state {
            FormState::Submitted { snapshot } => {
                presenter.show_completion(&schema, snapshot);
                return Ok(());
            }
            FormState::Editing { errors, .. } => {
                presenter.show_errors(errors);
                let retry = errors
                    .keys()
                    .filter(|key| schema.field(key).is_some_and(|field| field.kind.has_input()))
                    .map(String::from)
                    .collect::<Vec<_>>();
                pending = (!retry.is_empty()).then_some(retry);
            }
        }
    }
}

fn prompt_position(
    schema: &Schema,
    visible: &std::collections::BTreeSet<String>,
    key: &str,
) -> (usize, usize) {
    let inputs = schema
        .fields()
        .iter()
        .filter(|field| field.kind.has_input() && visible.contains(&field.key))
        .map(|field| field.key.as_str())
        .collect::<Vec<_>>();
    let index = inputs
        .iter()
        .position(|candidate| *candidate == key)
        .map(|position| position + 1)
        .unwrap_or(0);
    (index, inputs.len())
}

fn prompt_field(
    schema: &Schema,
    state: FormState,
    field: &FieldSpec,
    prompt: &PromptContext,
    presenter: &WizardPresenter,
) -> CliResult<FormState> {
    loop {
        presenter.show_prompt(prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err("input ended before the form was submitted".into());
        }

        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Err("fill aborted by user".into());
        }

        match parse_answer(field, trimmed) {
            Ok(None) => return Ok(state),
            Ok(Some(change)) => return Ok(state.on_field_change(schema, &field.key, change)?),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

/// Blank input keeps the current value; `-` clears it.
fn parse_answer(field: &FieldSpec, raw: &str) -> Result<Option<FieldChange>, AnswerParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if raw == "-" {
        return Ok(Some(FieldChange::Set(FieldValue::empty_for(field))));
    }

    let value = match field.kind {
        FieldKind::Text => FieldValue::text(raw),
        FieldKind::Number => parse_number(raw)?,
        FieldKind::Boolean => parse_boolean(raw)?,
        FieldKind::Choice => parse_choice(field, raw)?,
        FieldKind::Instant => parse_instant(raw).map(FieldValue::Instant).ok_or_else(|| {
            AnswerParseError::new(
                "Please enter a date and time.",
                Some("expected YYYY-MM-DD HH:MM".to_string()),
            )
        })?,
        FieldKind::Group => parse_group(field, raw)?,
        FieldKind::Virtual => return Ok(None),
    };
    Ok(Some(FieldChange::Set(value)))
}

fn parse_boolean(raw: &str) -> Result<FieldValue, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(FieldValue::Bool(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(FieldValue::Bool(false)),
        _ => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (y/n/true/false)".to_string()),
        )),
    }
}

fn parse_number(raw: &str) -> Result<FieldValue, AnswerParseError> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(FieldValue::Number)
        .ok_or_else(|| {
            AnswerParseError::new(
                "Please enter a number.",
                Some("expected finite number".to_string()),
            )
        })
}

fn parse_choice(field: &FieldSpec, raw: &str) -> Result<FieldValue, AnswerParseError> {
    let allowed = field.choices.clone().unwrap_or_default();
    allowed
        .iter()
        .find(|choice| choice.eq_ignore_ascii_case(raw))
        .map(|choice| FieldValue::text(choice.as_str()))
        .ok_or_else(|| {
            AnswerParseError::new(
                format!("Choose one of: {}.", allowed.join(", ")),
                Some(format!("allowed values: {}", allowed.join(", "))),
            )
        })
}

fn parse_group(field: &FieldSpec, raw: &str) -> Result<FieldValue, AnswerParseError> {
    let members = field.members.clone().unwrap_or_default();
    let mut selected = Map::new();
    for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let member = members
            .iter()
            .find(|member| member.eq_ignore_ascii_case(item))
            .ok_or_else(|| {
                AnswerParseError::new(
                    format!("'{}' is not an option. Pick from: {}.", item, members.join(", ")),
                    Some("expected comma-separated members".to_string()),
                )
            })?;
        selected.insert(member.clone(), Value::Bool(true));
    }
    FieldValue::from_json(field, &Value::Object(selected))
        .map_err(|err| AnswerParseError::new("Could not record the selection.", Some(err.to_string())))
}

fn print_render_output(
    mode: RenderMode,
    presenter: &WizardPresenter,
    schema: &Schema,
    state: &FormState,
) -> CliResult<()> {
    let payload = build_render_payload(schema, state);
    match mode {
        RenderMode::Text => {
            if presenter.verbosity().is_verbose() {
                println!("{}", render_text(&payload));
            }
            Ok(())
        }
        RenderMode::Json => {
            println!("JSON UI:\n{}", serde_json::to_string_pretty(&render_json_ui(&payload))?);
            Ok(())
        }
    }
}
