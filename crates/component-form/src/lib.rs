use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use form_spec::{
    EngineConfig, FormEngine, FormSchema, NavigationError, RenderPayload, RuleSet, SchemaError,
    ValueSnapshot, WizardState, build_render_payload, group_steps,
    render_json_ui as form_render_json_ui, render_text as form_render_text,
};

const DEFAULT_SCHEMA: &str = include_str!("../../form-spec/tests/fixtures/travel_form.json");
const DEFAULT_RULES: &str = include_str!("../../form-spec/tests/fixtures/travel_rules.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config/{0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse values: {0}")]
    ValuesParse(#[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("field '{0}' is not part of the form")]
    UnknownField(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error("schema rejected: {0}")]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_schema_json: Option<String>,
    #[serde(default)]
    rules_json: Option<String>,
    #[serde(default)]
    engine: EngineConfig,
}

fn load_engine(config_json: &str) -> Result<FormEngine, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    // The bundled rules only make sense next to the bundled schema.
    let (schema_json, rules_json) = match config.form_schema_json.as_deref() {
        Some(schema_json) => (schema_json, config.rules_json.as_deref()),
        None => (DEFAULT_SCHEMA, config.rules_json.as_deref().or(Some(DEFAULT_RULES))),
    };
    let schema: FormSchema = serde_json::from_str(schema_json).map_err(ComponentError::ConfigParse)?;
    let rules: RuleSet = match rules_json {
        Some(rules_json) => serde_json::from_str(rules_json).map_err(ComponentError::ConfigParse)?,
        None => RuleSet::default(),
    };
    Ok(FormEngine::with_config(schema, rules, config.engine)?)
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<FormEngine, ComponentError> {
    let engine = load_engine(config_json)?;
    if engine.schema().id != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(engine)
    }
}

/// Empty input means an empty snapshot; anything else must be a JSON object.
fn parse_values(values_json: &str) -> Result<ValueSnapshot, ComponentError> {
    if values_json.trim().is_empty() {
        return Ok(ValueSnapshot::new());
    }
    serde_json::from_str(values_json).map_err(ComponentError::ValuesParse)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|engine| to_json(engine.schema())))
}

/// Field outputs (value, error, visibility, enablement, requiredness) for a snapshot.
pub fn evaluate(form_id: &str, config_json: &str, values_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|engine| {
        let values = parse_values(values_json)?;
        to_json(&engine.evaluate(&values))
    }))
}

pub fn validate_field(form_id: &str, config_json: &str, values_json: &str, field_id: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|engine| {
        let values = parse_values(values_json)?;
        let check = engine
            .check_field(field_id, &values)
            .ok_or_else(|| ComponentError::UnknownField(field_id.to_string()))?;
        to_json(&check)
    }))
}

pub fn steps(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|engine| {
        let steps = group_steps(engine.schema());
        Ok(json!({
            "total": steps.len(),
            "show_stepper": steps.len() > 1,
            "steps": to_json(&steps)?,
        }))
    }))
}

fn navigation_response(
    wizard: &WizardState,
    result: Result<usize, NavigationError>,
) -> Result<Value, ComponentError> {
    let base = |status: &str| {
        json!({
            "status": status,
            "current": wizard.current(),
            "total": wizard.step_count(),
            "is_last": wizard.is_last(),
        })
    };
    Ok(match result {
        Ok(_) => base("moved"),
        Err(NavigationError::Blocked { fields, .. }) => {
            let mut value = base("blocked");
            value["blocked"] = to_json(&fields)?;
            value
        }
        Err(err) => {
            let mut value = base("unchanged");
            value["reason"] = Value::String(err.to_string());
            value
        }
    })
}

/// Attempts to leave step `current` forwards; the host keeps the position.
pub fn next_step(form_id: &str, config_json: &str, values_json: &str, current: usize) -> String {
    respond(ensure_form(form_id, config_json).and_then(|engine| {
        let values = parse_values(values_json)?;
        let mut wizard = WizardState::at(engine.schema(), current);
        let result = wizard.next(&engine, &values);
        navigation_response(&wizard, result)
    }))
}

pub fn previous_step(form_id: &str, config_json: &str, current: usize) -> String {
    respond(ensure_form(form_id, config_json).and_then(|engine| {
        let mut wizard = WizardState::at(engine.schema(), current);
        let result = wizard.previous();
        navigation_response(&wizard, result)
    }))
}

/// Full submit-time validation; a clean form also returns the submission payload.
pub fn submit_all(form_id: &str, config_json: &str, values_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|engine| {
        let values = parse_values(values_json)?;
        let report = engine.validate_submission(&values);
        if !report.is_valid() {
            return Ok(json!({
                "status": "error",
                "message": engine.schema().error_message,
                "report": to_json(&report)?,
            }));
        }
        Ok(json!({
            "status": "complete",
            "message": engine.schema().success_message,
            "submission": to_json(&engine.submission(&values))?,
        }))
    }))
}

fn render_payload(
    form_id: &str,
    config_json: &str,
    values_json: &str,
    step: usize,
) -> Result<RenderPayload, ComponentError> {
    let engine = ensure_form(form_id, config_json)?;
    let values = parse_values(values_json)?;
    let wizard = WizardState::at(engine.schema(), step);
    Ok(build_render_payload(&engine, &wizard, &values))
}

pub fn render_text(form_id: &str, config_json: &str, values_json: &str, step: usize) -> String {
    respond_string(
        render_payload(form_id, config_json, values_json, step)
            .map(|payload| form_render_text(&payload)),
    )
}

pub fn render_json_ui(form_id: &str, config_json: &str, values_json: &str, step: usize) -> String {
    respond(
        render_payload(form_id, config_json, values_json, step)
            .map(|payload| form_render_json_ui(&payload)),
    )
}
