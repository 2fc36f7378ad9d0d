use form_spec::{
    ErrorMap, FieldKind, FieldSpec, FormValues, Schema, render::value_to_display, render_summary,
};

/// Controls which bits of state the fill session prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: prompts and results only.
    Clean,
    /// Verbose output: status, visible fields, parse expectations.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints prompts, errors, and the final summary of a fill session.
pub struct WizardPresenter {
    verbosity: Verbosity,
    show_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_json: bool) -> Self {
        Self {
            verbosity,
            show_json,
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn show_header(&self, schema: &Schema) {
        println!("Form: {}", schema.spec().title);
        if self.verbosity.is_verbose()
            && let Some(help) = &schema.spec().description
        {
            println!("Help: {}", help);
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = if prompt.total > 0 {
            format!("{}/{} {}", prompt.index, prompt.total, prompt.title)
        } else {
            format!("{} {}", prompt.index, prompt.title)
        };
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        if let Some(current) = &prompt.current {
            line.push_str(&format!(" [{}]", current));
        }
        println!("{}", line);
        if let Some(description) = &prompt.description {
            println!("{}", description);
        }
        if self.verbosity.is_verbose() && !prompt.choices.is_empty() {
            println!("Choices: {}", prompt.choices.join(", "));
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_errors(&self, errors: &ErrorMap) {
        println!("Please fix the following:");
        for (key, message) in errors.iter() {
            println!("  {} - {}", key, message);
        }
    }

    pub fn show_completion(&self, schema: &Schema, snapshot: &FormValues) {
        println!("Done ✅");
        println!("{}", render_summary(schema, snapshot));
        if self.show_json {
            match serde_json::to_string_pretty(&snapshot.to_json()) {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => eprintln!("Failed to serialize values to JSON: {}", err),
            }
        }
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub title: String,
    pub description: Option<String>,
    pub required: bool,
    pub hint: Option<String>,
    pub choices: Vec<String>,
    pub current: Option<String>,
}

impl PromptContext {
    pub fn new(field: &FieldSpec, values: &FormValues, index: usize, total: usize) -> Self {
        let choices = match field.kind {
            FieldKind::Choice => field.choices.clone().unwrap_or_default(),
            FieldKind::Group => field.members.clone().unwrap_or_default(),
            _ => Vec::new(),
        };
        let current = values
            .get(&field.key)
            .filter(|value| !value.is_blank())
            .map(value_to_display);
        Self {
            index: index.max(1),
            total,
            title: field.title.clone(),
            description: field.description.clone(),
            required: field.required.holds(values),
            hint: kind_hint(field.kind, &choices),
            choices,
            current,
        }
    }
}

fn kind_hint(kind: FieldKind, choices: &[String]) -> Option<String> {
    match kind {
        FieldKind::Boolean => Some("(yes/no, y/n, true/false)".to_string()),
        FieldKind::Number => Some("(number)".to_string()),
        FieldKind::Choice if !choices.is_empty() => Some(format!("({})", choices.join("/"))),
        FieldKind::Group => Some(format!("(comma-separated: {})", choices.join(", "))),
        FieldKind::Instant => Some("(YYYY-MM-DD HH:MM)".to_string()),
        _ => None,
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}
