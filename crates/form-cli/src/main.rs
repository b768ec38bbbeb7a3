mod wizard;

use clap::{Parser, Subcommand, ValueEnum};
use component_form::{
    next_step, previous_step, render_json_ui, render_text, submit_all, validate_field,
};
use form_spec::{
    EngineConfig, FormEngine, FormSchema, RuleSet, SubmitReport, Submission, ValueSnapshot,
    dependency::audit_references, group_steps, schema::rule_set_json_schema, form_json_schema,
};
use serde_json::{Number, Value, json};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wizard::{
    AnswerParseError, PromptContext, Verbosity, WizardField, WizardPayload, WizardPresenter,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const CONFIG_ENV: &str = "FORMFLOW_CONFIG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Schema-driven form CLI",
    long_about = "Validates values against form schemas, inspects wizard steps and rules, and fills forms in a text wizard"
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

/// Paths shared by every command that builds an engine.
#[derive(clap::Args)]
struct FormArgs {
    /// Path to the form schema JSON.
    #[arg(long, value_name = "SCHEMA")]
    schema: PathBuf,
    /// Optional JSON file with field dependencies and cross-field rules.
    #[arg(long, value_name = "RULES")]
    rules: Option<PathBuf>,
    /// Optional engine config JSON (falls back to FORMFLOW_CONFIG).
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Fill a form step by step in a text shell.
    Wizard {
        #[command(flatten)]
        form: FormArgs,
        /// Optional JSON file with starting values (defaults come from the schema).
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Show verbose output (statuses, visible fields, parse expectations).
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Also print the submission as JSON.
        #[arg(long)]
        values_json: bool,
        /// Render output mode for each wizard screen.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Run submit-time validation over a values file.
    Validate {
        #[command(flatten)]
        form: FormArgs,
        /// Path to the values JSON file.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
    },
    /// Render the derived field state for one wizard step.
    Evaluate {
        #[command(flatten)]
        form: FormArgs,
        /// Optional JSON file with values.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Zero-based wizard position to render.
        #[arg(long, default_value_t = 0)]
        step: usize,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Summarize steps and rules, and flag references to unknown fields.
    Inspect {
        #[command(flatten)]
        form: FormArgs,
    },
    /// Print the JSON Schema of the schema document (or of the rules document).
    JsonSchema {
        #[arg(long)]
        rules: bool,
    },
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Wizard {
            form,
            values,
            verbose,
            values_json,
            format,
        } => run_wizard(form, values, verbose, values_json, format),
        Command::Validate { form, values } => run_validate(form, values),
        Command::Evaluate {
            form,
            values,
            step,
            format,
        } => run_evaluate(form, values, step, format),
        Command::Inspect { form } => run_inspect(form),
        Command::JsonSchema { rules } => run_json_schema(rules),
    }
}

/// Logs go to stderr so stdout stays parseable; RUST_LOG overrides the default level.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Raw documents plus the parsed pieces an engine is built from.
struct LoadedForm {
    schema_json: String,
    rules_json: Option<String>,
    schema: FormSchema,
    rules: RuleSet,
    config: EngineConfig,
}

impl LoadedForm {
    fn load(args: &FormArgs) -> CliResult<Self> {
        let schema_json = fs::read_to_string(&args.schema)?;
        let schema: FormSchema = serde_json::from_str(&schema_json)?;
        let rules_json = args.rules.as_ref().map(fs::read_to_string).transpose()?;
        let rules = match &rules_json {
            Some(raw) => serde_json::from_str(raw)?,
            None => RuleSet::default(),
        };
        let config = load_config(args.config.as_deref())?;
        Ok(Self {
            schema_json,
            rules_json,
            schema,
            rules,
            config,
        })
    }

    fn engine(&self) -> CliResult<FormEngine> {
        Ok(FormEngine::with_config(
            self.schema.clone(),
            self.rules.clone(),
            self.config,
        )?)
    }

    /// Config document understood by the component facade.
    fn component_config(&self) -> CliResult<String> {
        Ok(json!({
            "form_schema_json": self.schema_json,
            "rules_json": self.rules_json,
            "engine": serde_json::to_value(self.config)?,
        })
        .to_string())
    }
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => env::var_os(CONFIG_ENV).map(PathBuf::from),
    };
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading engine config");
            let raw = fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn read_values(path: Option<&Path>, schema: &FormSchema) -> CliResult<ValueSnapshot> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        }
        None => Ok(ValueSnapshot::from_defaults(schema)),
    }
}

fn run_validate(form: FormArgs, values_path: PathBuf) -> CliResult<()> {
    let loaded = LoadedForm::load(&form)?;
    let engine = loaded.engine()?;
    let values = read_values(Some(&values_path), engine.schema())?;

    let report = engine.validate_submission(&values);
    println!(
        "Validation result: {}",
        if report.is_valid() { "valid" } else { "invalid" }
    );
    describe_report(&report);

    if report.is_valid() {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_report(report: &SubmitReport) {
    if !report.field_errors.is_empty() {
        println!("Field errors:");
        for (field_id, message) in &report.field_errors {
            println!("  {} - {}", field_id, message);
        }
    }
    if !report.cross_field_errors.is_empty() {
        println!("Form errors:");
        for message in &report.cross_field_errors {
            println!("  {}", message);
        }
    }
}

fn run_evaluate(
    form: FormArgs,
    values_path: Option<PathBuf>,
    step: usize,
    format: RenderMode,
) -> CliResult<()> {
    let loaded = LoadedForm::load(&form)?;
    let values = read_values(values_path.as_deref(), &loaded.schema)?;
    let config_json = loaded.component_config()?;
    let values_json = serde_json::to_string(&values)?;
    let form_id = &loaded.schema.id;
    match format {
        RenderMode::Text => {
            let text = render_text(form_id, &config_json, &values_json, step);
            if text.starts_with('{') {
                parse_component_result(&text)?;
            }
            println!("{}", text);
        }
        RenderMode::Json => {
            let ui = parse_component_result(&render_json_ui(form_id, &config_json, &values_json, step))?;
            println!("{}", serde_json::to_string_pretty(&ui)?);
        }
    }
    Ok(())
}

fn run_inspect(form: FormArgs) -> CliResult<()> {
    let loaded = LoadedForm::load(&form)?;
    let engine = loaded.engine()?;
    let schema = engine.schema();

    println!("Form: {} ({})", schema.title, schema.id);
    println!(
        "Layout: {}",
        serde_json::to_value(schema.layout)?.as_str().unwrap_or("single")
    );
    let steps = group_steps(schema);
    println!("Steps: {}", steps.len());
    for (index, step) in steps.iter().enumerate() {
        println!(
            "  Step {} (wizardStep {}): {}",
            index + 1,
            step.step,
            step.field_ids.join(", ")
        );
    }
    println!("Dependencies: {}", engine.rules().dependencies.len());
    println!("Custom validations: {}", engine.rules().custom_validations.len());

    let mut warnings = audit_references(schema, &engine.rules().dependencies)
        .into_iter()
        .map(|issue| {
            format!(
                "{} {} '{}' does not match any field",
                issue.owner, issue.role, issue.reference
            )
        })
        .collect::<Vec<_>>();
    for rule in &engine.rules().custom_validations {
        for reference in std::iter::once(&rule.field1).chain(rule.field2.as_ref()) {
            if schema.find_field(reference).is_none() {
                warnings.push(format!(
                    "{} field '{}' does not match any field",
                    rule.id, reference
                ));
            }
        }
    }
    for warning in &warnings {
        println!("Warning: {}", warning);
    }
    Ok(())
}

fn run_json_schema(rules: bool) -> CliResult<()> {
    let schema = if rules {
        rule_set_json_schema()
    } else {
        form_json_schema()
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_wizard(
    form: FormArgs,
    values_path: Option<PathBuf>,
    verbose: bool,
    values_json: bool,
    format: RenderMode,
) -> CliResult<()> {
    let loaded = LoadedForm::load(&form)?;
    // Authoring errors surface before the first prompt.
    loaded.engine()?;
    let form_id = loaded.schema.id.clone();
    let config_json = loaded.component_config()?;
    let mut values = read_values(values_path.as_deref(), &loaded.schema)?;

    let mut presenter = WizardPresenter::new(Verbosity::from_verbose(verbose), values_json);
    let mut step = 0usize;
    let mut prompted: BTreeSet<String> = BTreeSet::new();

    loop {
        let values_str = serde_json::to_string(&values)?;
        let ui_raw = render_json_ui(&form_id, &config_json, &values_str, step);
        let ui = parse_component_result(&ui_raw)?;
        print_render_output(format, &ui)?;
        let payload =
            WizardPayload::from_json(&ui).map_err(|err| format!("wizard UI error: {}", err))?;
        presenter.show_header(&payload);
        presenter.show_step(&payload);

        let pending = payload
            .current_fields()
            .find(|field| field.is_promptable() && !prompted.contains(&field.id));
        if let Some(field) = pending {
            match prompt_field(field, &presenter)? {
                PromptAction::Back => {
                    let response =
                        parse_component_result(&previous_step(&form_id, &config_json, step))?;
                    if response["status"] == "moved" {
                        step = response_position(&response)?;
                        prompted.clear();
                    } else {
                        println!("Already on the first step.");
                    }
                }
                PromptAction::Answer(value) => {
                    let mut candidate = values.clone();
                    if value.is_null() {
                        candidate.remove(&field.name);
                    } else {
                        candidate.set(field.name.clone(), value);
                    }
                    let check = parse_component_result(&validate_field(
                        &form_id,
                        &config_json,
                        &serde_json::to_string(&candidate)?,
                        &field.id,
                    ))?;
                    if check["valid"] == false {
                        presenter.show_field_error(
                            &field.label,
                            check["message"].as_str().unwrap_or("invalid value"),
                        );
                        continue;
                    }
                    values = candidate;
                    prompted.insert(field.id.clone());
                }
            }
            continue;
        }

        if !payload.progress.is_last() {
            let response =
                parse_component_result(&next_step(&form_id, &config_json, &values_str, step))?;
            match response["status"].as_str() {
                Some("moved") => {
                    step = response_position(&response)?;
                    prompted.clear();
                }
                Some("blocked") => {
                    for blocked in response["blocked"].as_array().into_iter().flatten() {
                        let field_id = blocked["fieldId"].as_str().unwrap_or_default();
                        let label = payload
                            .field(field_id)
                            .map(|field| field.label.as_str())
                            .unwrap_or(field_id);
                        presenter.show_field_error(
                            label,
                            blocked["message"].as_str().unwrap_or("needs attention"),
                        );
                        prompted.remove(field_id);
                    }
                }
                _ => return Err("wizard could not advance".into()),
            }
            continue;
        }

        let response = parse_component_result(&submit_all(&form_id, &config_json, &values_str))?;
        if response["status"] == "complete" {
            let submission: Submission = serde_json::from_value(response["submission"].clone())?;
            presenter.show_completion(&submission, response["message"].as_str());
            return Ok(());
        }
        if let Some(message) = response["message"].as_str() {
            eprintln!("{}", message);
        }
        let report: SubmitReport = serde_json::from_value(response["report"].clone())?;
        describe_report(&report);
        return Err("submission rejected".into());
    }
}

fn response_position(response: &Value) -> CliResult<usize> {
    response["current"]
        .as_u64()
        .map(|current| current as usize)
        .ok_or_else(|| "navigation response missing current step".into())
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

enum PromptAction {
    Answer(Value),
    Back,
}

fn prompt_field(field: &WizardField, presenter: &WizardPresenter) -> CliResult<PromptAction> {
    let prompt = PromptContext::new(field);
    loop {
        presenter.show_prompt(&prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err("input closed before the form was complete".into());
        }

        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Err("wizard aborted by user".into());
        }
        if trimmed.eq_ignore_ascii_case("back") {
            return Ok(PromptAction::Back);
        }

        match parse_answer(field, trimmed) {
            Ok(value) => return Ok(PromptAction::Answer(value)),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

/// Blank input keeps the current value; `null` clears an optional field.
fn parse_answer(field: &WizardField, raw: &str) -> Result<Value, AnswerParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        let has_value = match &field.value {
            Value::Null => false,
            Value::String(text) => !text.is_empty(),
            _ => true,
        };
        if has_value {
            return Ok(field.value.clone());
        }
        if !field.required {
            return Ok(Value::Null);
        }
        return Err(AnswerParseError::new("This field requires an answer.", None));
    }

    match field.kind.as_str() {
        "checkbox" => parse_boolean(raw),
        "number" => parse_number(raw),
        "select" | "radio" => parse_choice(field, raw),
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn parse_boolean(raw: &str) -> Result<Value, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
        _ => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (y/n/true/false)".to_string()),
        )),
    }
}

fn parse_number(raw: &str) -> Result<Value, AnswerParseError> {
    if let Ok(whole) = raw.parse::<i64>() {
        return Ok(Value::Number(Number::from(whole)));
    }
    raw.parse::<f64>()
        .map_err(|_| {
            AnswerParseError::new(
                "Please enter a number.",
                Some("expected number".to_string()),
            )
        })
        .and_then(|value| {
            Number::from_f64(value).map(Value::Number).ok_or_else(|| {
                AnswerParseError::new(
                    "Please enter a finite number.",
                    Some("number must be finite".to_string()),
                )
            })
        })
}

fn parse_choice(field: &WizardField, raw: &str) -> Result<Value, AnswerParseError> {
    if field.choices.is_empty() {
        return Err(AnswerParseError::new(
            "Options are not defined for this field.",
            None,
        ));
    }
    if let Some(choice) = field
        .choices
        .iter()
        .find(|choice| choice.eq_ignore_ascii_case(raw))
    {
        Ok(Value::String(choice.to_string()))
    } else {
        Err(AnswerParseError::new(
            format!("Choose one of: {}.", field.choices.join(", ")),
            Some(format!("allowed values: {}", field.choices.join(", "))),
        ))
    }
}

fn print_render_output(mode: RenderMode, ui: &Value) -> CliResult<()> {
    match mode {
        RenderMode::Text => Ok(()),
        RenderMode::Json => {
            println!("JSON UI:\n{}", serde_json::to_string_pretty(ui)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::{ffi::OsString, path::Path};
    use tempfile::TempDir;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<OsString>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: &Path) -> Self {
            let original = env::var_os(key);
            unsafe { env::set_var(key, value) };
            EnvVarGuard { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            if let Some(ref value) = self.original {
                unsafe { env::set_var(self.key, value) };
            } else {
                unsafe { env::remove_var(self.key) };
            }
        }
    }

    fn field(value: Value) -> WizardField {
        WizardField::from_json(&value).expect("field")
    }

    #[test]
    fn parse_answer_checkbox_accepts_yes() {
        let field = field(json!({ "id": "agree", "label": "Agree", "type": "checkbox", "required": true }));
        assert_eq!(parse_answer(&field, "yes").unwrap(), Value::Bool(true));
        assert!(parse_answer(&field, "maybe").is_err());
    }

    #[test]
    fn parse_answer_number_keeps_integers_whole() {
        let field = field(json!({ "id": "n", "label": "N", "type": "number" }));
        assert_eq!(parse_answer(&field, "42").unwrap(), json!(42));
        assert_eq!(parse_answer(&field, "1.5").unwrap(), json!(1.5));
        assert!(parse_answer(&field, "many").is_err());
    }

    #[test]
    fn parse_answer_select_checks_options() {
        let field = field(json!({
            "id": "trip",
            "label": "Trip",
            "type": "select",
            "options": [
                { "label": "Domestic", "value": "domestic" },
                { "label": "International", "value": "international" }
            ]
        }));
        assert!(parse_answer(&field, "space").is_err());
        assert_eq!(
            parse_answer(&field, "International").unwrap(),
            Value::String("international".into())
        );
    }

    #[test]
    fn parse_answer_blank_keeps_current_or_clears_optional() {
        let current = field(json!({ "id": "n", "label": "N", "type": "number", "value": 3 }));
        assert_eq!(parse_answer(&current, "").unwrap(), json!(3));

        let optional = field(json!({ "id": "t", "label": "T", "type": "text" }));
        assert_eq!(parse_answer(&optional, "").unwrap(), Value::Null);

        let required = field(json!({ "id": "t", "label": "T", "type": "text", "required": true }));
        assert!(parse_answer(&required, "").is_err());
    }

    #[test]
    fn load_config_falls_back_to_env() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{ "errorsForUntouched": true }"#).expect("write config");
        let _guard = EnvVarGuard::set(CONFIG_ENV, &path);
        let config = load_config(None).expect("config");
        assert!(config.errors_for_untouched);
    }
}
