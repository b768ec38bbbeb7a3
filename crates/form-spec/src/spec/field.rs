use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::rules::{RuleKind, ValidationRule};

/// Supported input types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Date,
    Select,
    Textarea,
    Checkbox,
    Radio,
    File,
    Phone,
    Url,
    Heading,
}

/// Shape of the value a field type stores in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Numeric,
    Boolean,
    Date,
    Choice,
    File,
    /// Display-only types never carry a value.
    None,
}

impl FieldType {
    pub fn value_kind(self) -> ValueKind {
        match self {
            FieldType::Text
            | FieldType::Email
            | FieldType::Textarea
            | FieldType::Phone
            | FieldType::Url => ValueKind::Text,
            FieldType::Number => ValueKind::Numeric,
            FieldType::Date => ValueKind::Date,
            FieldType::Select | FieldType::Radio => ValueKind::Choice,
            FieldType::Checkbox => ValueKind::Boolean,
            FieldType::File => ValueKind::File,
            FieldType::Heading => ValueKind::None,
        }
    }

    /// Whether the type collects a value at all.
    pub fn is_input(self) -> bool {
        !matches!(self.value_kind(), ValueKind::None)
    }

    pub fn needs_options(self) -> bool {
        matches!(self.value_kind(), ValueKind::Choice)
    }

    /// `false` counts as empty for checkboxes only.
    pub fn false_is_empty(self) -> bool {
        matches!(self.value_kind(), ValueKind::Boolean)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Textarea => "textarea",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::File => "file",
            FieldType::Phone => "phone",
            FieldType::Url => "url",
            FieldType::Heading => "heading",
        }
    }
}

/// One entry of a select or radio group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

/// Inline single-condition visibility rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Conditional {
    /// Name of the field whose value is compared.
    pub field: String,
    pub value: Value,
}

/// Definition of a single input inside a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub id: String,
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wizard_step: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<Conditional>,
}

impl FieldSchema {
    /// Minimal field whose `name` equals its `id`.
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: FieldType) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            label: label.into(),
            kind,
            placeholder: None,
            default_value: None,
            validations: Vec::new(),
            options: None,
            description: None,
            wizard_step: None,
            conditional: None,
        }
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.validations.push(rule);
        self
    }

    pub fn with_step(mut self, step: u32) -> Self {
        self.wizard_step = Some(step);
        self
    }

    pub fn with_options<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = values
            .into_iter()
            .map(|value| {
                let value = value.into();
                FieldOption {
                    label: value.clone(),
                    value,
                }
            })
            .collect();
        self.options = Some(options);
        self
    }

    pub fn shown_when(mut self, field: impl Into<String>, value: Value) -> Self {
        self.conditional = Some(Conditional {
            field: field.into(),
            value,
        });
        self
    }

    /// Step the field belongs to; absent means step 0.
    pub fn step(&self) -> u32 {
        self.wizard_step.unwrap_or(0)
    }

    /// Whether the declared rules make this field mandatory.
    pub fn declares_required(&self) -> bool {
        self.kind.is_input()
            && self
                .validations
                .iter()
                .any(|rule| rule.kind == RuleKind::Required)
    }
}
