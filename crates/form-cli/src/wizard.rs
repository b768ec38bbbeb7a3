use std::fmt::Write;

use form_spec::Submission;
use serde_json::Value;

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: field prompts only.
    Clean,
    /// Verbose output: status, visible fields, error details, help text.
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

/// Prints the header, step banners and prompts of the text wizard.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_values_json: bool,
    last_step_shown: Option<usize>,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_values_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_values_json,
            last_step_shown: None,
        }
    }

    pub fn show_header(&mut self, payload: &WizardPayload) {
        if self.header_printed {
            return;
        }
        println!("Form: {}", payload.form_title);
        if self.verbosity.is_verbose()
            && let Some(help) = &payload.help
        {
            println!("Help: {}", help);
        }
        self.header_printed = true;
    }

    /// Announces a step once per visit.
    pub fn show_step(&mut self, payload: &WizardPayload) {
        if self.last_step_shown == Some(payload.progress.current) {
            return;
        }
        self.last_step_shown = Some(payload.progress.current);
        if payload.progress.show_stepper {
            println!(
                "Step {}/{}",
                payload.progress.current + 1,
                payload.progress.total
            );
        }
        if self.verbosity.is_verbose() {
            println!("Status: {}", payload.status);
            println!("Visible fields:");
            for field in payload.current_fields() {
                let mut entry = format!(" - {} ({})", field.id, field.label);
                if field.required {
                    entry.push_str(" [required]");
                }
                if !field.enabled {
                    entry.push_str(" [disabled]");
                }
                println!("{}", entry);
            }
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = prompt.label.clone();
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

    pub fn show_field_error(&self, label: &str, message: &str) {
        eprintln!("{}: {}", label, message);
    }

    pub fn show_completion(&self, submission: &Submission, message: Option<&str>) {
        println!("Done ✅");
        if let Some(message) = message {
            println!("{}", message);
        }
        match submission.to_cbor() {
            Ok(bytes) => {
                println!("Submission (CBOR hex): {}", encode_hex(&bytes));
            }
            Err(err) => {
                eprintln!("Failed to serialize submission to CBOR: {}", err);
            }
        }
        if self.show_values_json {
            match submission.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => {
                    eprintln!("Failed to serialize submission to JSON: {}", err);
                }
            }
        }
    }
}

/// Render payload extracted from the component output.
pub struct WizardPayload {
    pub form_title: String,
    pub help: Option<String>,
    pub status: String,
    pub progress: WizardProgress,
    pub fields: Vec<WizardField>,
}

impl WizardPayload {
    pub fn from_json(json: &Value) -> Result<Self, String> {
        let form_title = json
            .get("form_title")
            .and_then(Value::as_str)
            .ok_or_else(|| "wizard payload missing form_title".to_string())?
            .to_string();
        let help = json
            .get("help")
            .and_then(Value::as_str)
            .map(|value| value.to_string());
        let status = json
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("need_input")
            .to_string();
        let progress = json
            .get("progress")
            .and_then(Value::as_object)
            .ok_or_else(|| "wizard payload missing progress".to_string())?;
        let current = progress.get("current").and_then(Value::as_u64).unwrap_or(0) as usize;
        let total = progress.get("total").and_then(Value::as_u64).unwrap_or(1) as usize;
        let show_stepper = progress
            .get("show_stepper")
            .and_then(Value::as_bool)
            .unwrap_or(total > 1);
        let fields = json
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| "wizard payload missing fields".to_string())?
            .iter()
            .map(WizardField::from_json)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            form_title,
            help,
            status,
            progress: WizardProgress {
                current,
                total,
                show_stepper,
            },
            fields,
        })
    }

    /// Visible fields of the current step, in declaration order.
    pub fn current_fields(&self) -> impl Iterator<Item = &WizardField> {
        self.fields
            .iter()
            .filter(|field| field.on_current_step && field.visible)
    }

    pub fn field(&self, id: &str) -> Option<&WizardField> {
        self.fields.iter().find(|field| field.id == id)
    }
}

/// Wizard position from the render payload.
pub struct WizardProgress {
    pub current: usize,
    pub total: usize,
    pub show_stepper: bool,
}

impl WizardProgress {
    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.total
    }
}

/// Minimal view of a field used for prompting.
pub struct WizardField {
    pub id: String,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: String,
    pub value: Value,
    pub required: bool,
    pub visible: bool,
    pub enabled: bool,
    pub on_current_step: bool,
    pub choices: Vec<String>,
}

impl WizardField {
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| "field missing id".to_string())?
            .to_string();
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&id)
            .to_string();
        let label = value
            .get("label")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("field '{}' missing label", id))?
            .to_string();
        let description = value
            .get("description")
            .and_then(Value::as_str)
            .map(|value| value.to_string());
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("text")
            .to_string();
        let flag = |key: &str, default: bool| value.get(key).and_then(Value::as_bool).unwrap_or(default);
        let choices = value
            .get("options")
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|option| option.get("value").and_then(Value::as_str))
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(Self {
            name,
            label,
            description,
            value: value.get("value").cloned().unwrap_or(Value::Null),
            required: flag("required", false),
            visible: flag("visible", true),
            enabled: flag("enabled", true),
            on_current_step: flag("on_current_step", true),
            kind,
            choices,
            id,
        })
    }

    /// Headings and disabled fields are shown but never prompted.
    pub fn is_promptable(&self) -> bool {
        self.kind != "heading" && self.visible && self.enabled
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub label: String,
    pub description: Option<String>,
    pub required: bool,
    pub hint: Option<String>,
    pub current: Option<String>,
    pub choices: Vec<String>,
}

impl PromptContext {
    pub fn new(field: &WizardField) -> Self {
        let current = match &field.value {
            Value::Null => None,
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        };
        Self {
            label: field.label.clone(),
            description: field.description.clone(),
            required: field.required,
            hint: hint_for(&field.kind, &field.choices),
            current,
            choices: field.choices.clone(),
        }
    }
}

fn hint_for(kind: &str, choices: &[String]) -> Option<String> {
    match kind {
        "checkbox" => Some("(yes/no, y/n, true/false)".to_string()),
        "number" => Some("(number)".to_string()),
        "date" => Some("(YYYY-MM-DD)".to_string()),
        "select" | "radio" if !choices.is_empty() => Some(format!("({})", choices.join("/"))),
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

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut encoded, "{:02x}", byte);
    }
    encoded
}
