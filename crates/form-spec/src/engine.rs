use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_cbor::{to_vec, value::to_value};
use serde_json::Value;
use tracing::{debug, warn};

use crate::compile::{CompiledSchema, CustomChecks, FieldCheck};
use crate::cross_field::evaluate_rules;
use crate::dependency::{
    FieldState, FieldStateMap, ResolutionMode, audit_references, resolve_field_states,
};
use crate::error::SchemaError;
use crate::spec::{FieldType, FormSchema, RuleSet};
use crate::value::ValueSnapshot;

/// Engine tuning knobs; every key is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub resolution: ResolutionMode,
    /// Report field errors before the host has stored any value for the field.
    pub errors_for_untouched: bool,
}

/// What the rendering layer needs to draw one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOutput {
    pub id: String,
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub step: u32,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub visible: bool,
    pub enabled: bool,
    pub required: bool,
}

/// Derived state for every field after one value change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormEvaluation {
    pub form_id: String,
    pub fields: Vec<FieldOutput>,
}

impl FormEvaluation {
    pub fn field(&self, id: &str) -> Option<&FieldOutput> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn has_errors(&self) -> bool {
        self.fields.iter().any(|field| field.error.is_some())
    }
}

/// A field that failed its check, with the message to show beside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field_id: String,
    pub name: String,
    pub message: String,
}

/// Form-level result of a submit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReport {
    pub field_errors: BTreeMap<String, String>,
    pub cross_field_errors: Vec<String>,
}

impl SubmitReport {
    pub fn is_valid(&self) -> bool {
        self.field_errors.is_empty() && self.cross_field_errors.is_empty()
    }
}

/// Payload handed to the host once a submit passes validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub form_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_url: Option<String>,
    /// Values of visible fields only.
    pub values: ValueSnapshot,
}

impl Submission {
    /// Serializes the submission as canonical CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        let canonical = to_value(self)?;
        to_vec(&canonical)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Read-only interpreter for one schema plus its cross-field rules.
#[derive(Debug, Clone)]
pub struct FormEngine {
    schema: FormSchema,
    compiled: CompiledSchema,
    rules: RuleSet,
    config: EngineConfig,
}

impl FormEngine {
    pub fn new(schema: FormSchema, rules: RuleSet) -> Result<Self, SchemaError> {
        Self::with_config(schema, rules, EngineConfig::default())
    }

    pub fn with_config(
        schema: FormSchema,
        rules: RuleSet,
        config: EngineConfig,
    ) -> Result<Self, SchemaError> {
        Self::with_checks(schema, rules, config, &CustomChecks::default())
    }

    /// Compiles the schema and reports dangling rule references once.
    pub fn with_checks(
        schema: FormSchema,
        rules: RuleSet,
        config: EngineConfig,
        checks: &CustomChecks,
    ) -> Result<Self, SchemaError> {
        let compiled = CompiledSchema::compile_with(&schema, checks)?;
        for issue in audit_references(&schema, &rules.dependencies) {
            warn!(
                owner = %issue.owner,
                reference = %issue.reference,
                role = issue.role,
                "reference to an unknown field; the rule is ignored"
            );
        }
        for rule in &rules.custom_validations {
            for reference in std::iter::once(&rule.field1).chain(rule.field2.as_ref()) {
                if schema.find_field(reference).is_none() {
                    warn!(
                        rule = %rule.id,
                        reference = %reference,
                        "custom validation refers to an unknown field"
                    );
                }
            }
        }
        Ok(Self {
            schema,
            compiled,
            rules,
            config,
        })
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn compiled(&self) -> &CompiledSchema {
        &self.compiled
    }

    pub fn field_states(&self, snapshot: &ValueSnapshot) -> FieldStateMap {
        resolve_field_states(
            &self.schema,
            &self.rules.dependencies,
            snapshot,
            self.config.resolution,
        )
    }

    /// Checks one field against its rules with dependency-resolved requiredness.
    pub fn check_field(&self, field_id: &str, snapshot: &ValueSnapshot) -> Option<FieldCheck> {
        let field = self.schema.field_by_id(field_id)?;
        let validator = self.compiled.validator(field_id)?;
        let states = self.field_states(snapshot);
        let state = states.get(field_id)?;
        if !state.is_active() {
            return Some(FieldCheck::pass());
        }
        Some(validator.check_as(snapshot.get(&field.name), state.required))
    }

    /// Recomputes every field's output for the current snapshot.
    pub fn evaluate(&self, snapshot: &ValueSnapshot) -> FormEvaluation {
        let states = self.field_states(snapshot);
        let fields = self
            .schema
            .fields
            .iter()
            .filter_map(|field| {
                let state = states.get(&field.id)?;
                let validator = self.compiled.validator(&field.id)?;
                let value = snapshot.get(&field.name);
                let touched = value.is_some() || self.config.errors_for_untouched;
                let error = if state.is_active() && touched {
                    validator.check_as(value, state.required).message
                } else {
                    None
                };
                Some(FieldOutput {
                    id: field.id.clone(),
                    name: field.name.clone(),
                    label: field.label.clone(),
                    kind: field.kind,
                    step: field.step(),
                    value: value.cloned().unwrap_or(Value::Null),
                    error,
                    visible: state.visible,
                    enabled: state.enabled,
                    required: state.required,
                })
            })
            .collect();
        FormEvaluation {
            form_id: self.schema.id.clone(),
            fields,
        }
    }

    /// Call after the host commits a new value for `field_name`.
    pub fn on_value_change(&self, snapshot: &ValueSnapshot, field_name: &str) -> FormEvaluation {
        debug!(form = %self.schema.id, field = field_name, "value changed");
        self.evaluate(snapshot)
    }

    /// Required, active fields among `field_ids` whose value fails its check.
    pub fn blocking_fields(&self, field_ids: &[String], snapshot: &ValueSnapshot) -> Vec<FieldError> {
        let states = self.field_states(snapshot);
        field_ids
            .iter()
            .filter_map(|id| {
                let field = self.schema.field_by_id(id)?;
                let state = states.get(id)?;
                if !state.gates_progress() {
                    return None;
                }
                let check = self.compiled.validator(id)?.check_as(snapshot.get(&field.name), true);
                check.message.map(|message| FieldError {
                    field_id: field.id.clone(),
                    name: field.name.clone(),
                    message,
                })
            })
            .collect()
    }

    /// Submit-time validation: every active field first, then the cross-field rules.
    ///
    /// Cross-field rules only run once every field passes on its own.
    pub fn validate_submission(&self, snapshot: &ValueSnapshot) -> SubmitReport {
        let states = self.field_states(snapshot);
        let mut report = SubmitReport::default();
        for field in &self.schema.fields {
            let (Some(state), Some(validator)) =
                (states.get(&field.id), self.compiled.validator(&field.id))
            else {
                continue;
            };
            if !state.is_active() {
                continue;
            }
            if let Some(message) = validator.check_as(snapshot.get(&field.name), state.required).message {
                report.field_errors.insert(field.id.clone(), message);
            }
        }
        if report.field_errors.is_empty() {
            report.cross_field_errors =
                evaluate_rules(&self.schema, &self.rules.custom_validations, snapshot);
        }
        debug!(
            form = %self.schema.id,
            field_errors = report.field_errors.len(),
            cross_field_errors = report.cross_field_errors.len(),
            "validated submission"
        );
        report
    }

    /// Values of active fields, ready to send. Hidden and disabled fields are left out.
    pub fn submission(&self, snapshot: &ValueSnapshot) -> Submission {
        let states = self.field_states(snapshot);
        let values = self
            .schema
            .fields
            .iter()
            .filter(|field| states.get(&field.id).is_some_and(FieldState::is_active))
            .filter_map(|field| {
                snapshot
                    .get(&field.name)
                    .map(|value| (field.name.clone(), value.clone()))
            })
            .collect();
        Submission {
            form_id: self.schema.id.clone(),
            submit_url: self.schema.submit_url.clone(),
            values,
        }
    }
}
