use serde_json::{Map, Value, json};

use crate::{
    engine::{FieldOutput, FormEngine},
    spec::FieldOption,
    value::{ValueSnapshot, value_to_display},
    wizard::WizardState,
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Required fields are still empty.
    NeedInput,
    /// Every active field passes.
    Complete,
    /// At least one entered value is invalid.
    Error,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
            RenderStatus::Error => "error",
        }
    }
}

/// Wizard position exposed to renderers.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub current: usize,
    pub total: usize,
    pub show_stepper: bool,
}

/// A field plus the bits of its schema a renderer needs beyond the engine output.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub output: FieldOutput,
    pub placeholder: Option<String>,
    pub description: Option<String>,
    pub options: Vec<FieldOption>,
    pub on_current_step: bool,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub help: Option<String>,
    pub status: RenderStatus,
    pub progress: RenderProgress,
    pub fields: Vec<RenderField>,
}

/// Build the renderer payload from the engine, wizard position and values.
pub fn build_render_payload(
    engine: &FormEngine,
    wizard: &WizardState,
    snapshot: &ValueSnapshot,
) -> RenderPayload {
    let schema = engine.schema();
    let evaluation = engine.evaluate(snapshot);
    let current_ids = &wizard.current_step().field_ids;

    let fields = evaluation
        .fields
        .into_iter()
        .filter_map(|output| {
            let field = schema.field_by_id(&output.id)?;
            Some(RenderField {
                on_current_step: current_ids.contains(&output.id),
                placeholder: field.placeholder.clone(),
                description: field.description.clone(),
                options: field.options.clone().unwrap_or_default(),
                output,
            })
        })
        .collect::<Vec<_>>();

    let all_ids = schema
        .fields
        .iter()
        .map(|field| field.id.clone())
        .collect::<Vec<_>>();
    let status = if fields.iter().any(|field| field.output.error.is_some()) {
        RenderStatus::Error
    } else if engine.blocking_fields(&all_ids, snapshot).is_empty() {
        RenderStatus::Complete
    } else {
        RenderStatus::NeedInput
    };

    RenderPayload {
        form_id: schema.id.clone(),
        form_title: schema.title.clone(),
        help: schema.description.clone(),
        status,
        progress: RenderProgress {
            current: wizard.current(),
            total: wizard.step_count(),
            show_stepper: wizard.shows_stepper(),
        },
        fields,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let output = &field.output;
            let mut map = Map::new();
            map.insert("id".into(), Value::String(output.id.clone()));
            map.insert("name".into(), Value::String(output.name.clone()));
            map.insert("label".into(), Value::String(output.label.clone()));
            map.insert("type".into(), Value::String(output.kind.as_str().to_string()));
            map.insert("step".into(), json!(output.step));
            map.insert("value".into(), output.value.clone());
            if let Some(error) = &output.error {
                map.insert("error".into(), Value::String(error.clone()));
            }
            map.insert("visible".into(), Value::Bool(output.visible));
            map.insert("enabled".into(), Value::Bool(output.enabled));
            map.insert("required".into(), Value::Bool(output.required));
            map.insert("on_current_step".into(), Value::Bool(field.on_current_step));
            if let Some(placeholder) = &field.placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            if let Some(description) = &field.description {
                map.insert("description".into(), Value::String(description.clone()));
            }
            if !field.options.is_empty() {
                map.insert(
                    "options".into(),
                    Value::Array(
                        field
                            .options
                            .iter()
                            .map(|option| json!({ "label": option.label, "value": option.value }))
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
        "help": payload.help,
        "status": payload.status.as_str(),
        "progress": {
            "current": payload.progress.current,
            "total": payload.progress.total,
            "show_stepper": payload.progress.show_stepper,
        },
        "fields": fields,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", payload.form_title, payload.form_id));
    if payload.progress.show_stepper {
        lines.push(format!(
            "Status: {} (step {}/{})",
            payload.status.as_str(),
            payload.progress.current + 1,
            payload.progress.total
        ));
    } else {
        lines.push(format!("Status: {}", payload.status.as_str()));
    }
    if let Some(help) = &payload.help {
        lines.push(format!("Help: {}", help));
    }

    lines.push("Visible fields:".to_string());
    for field in payload
        .fields
        .iter()
        .filter(|field| field.on_current_step && field.output.visible)
    {
        let output = &field.output;
        let mut entry = format!(" - {} ({})", output.id, output.label);
        if output.required {
            entry.push_str(" [required]");
        }
        if !output.enabled {
            entry.push_str(" [disabled]");
        }
        if !output.value.is_null() {
            entry.push_str(&format!(" = {}", value_to_display(&output.value)));
        }
        lines.push(entry);
        if let Some(error) = &output.error {
            lines.push(format!("     ! {}", error));
        }
    }

    lines.join("\n")
}
