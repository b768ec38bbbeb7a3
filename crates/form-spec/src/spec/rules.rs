use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kinds of per-field constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    Required,
    MinLength,
    MaxLength,
    Min,
    Max,
    Pattern,
    Email,
    Url,
    Custom,
}

impl RuleKind {
    /// Evaluation phase; lower phases run first.
    pub(crate) fn phase(self) -> u8 {
        match self {
            RuleKind::Required => 0,
            RuleKind::Email | RuleKind::Url | RuleKind::Pattern => 1,
            RuleKind::MinLength | RuleKind::MaxLength => 2,
            RuleKind::Min | RuleKind::Max => 3,
            RuleKind::Custom => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Required => "required",
            RuleKind::MinLength => "minLength",
            RuleKind::MaxLength => "maxLength",
            RuleKind::Min => "min",
            RuleKind::Max => "max",
            RuleKind::Pattern => "pattern",
            RuleKind::Email => "email",
            RuleKind::Url => "url",
            RuleKind::Custom => "custom",
        }
    }
}

/// One per-field constraint with the text shown when it fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationRule {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub message: String,
}

impl ValidationRule {
    pub fn new(kind: RuleKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_value(kind: RuleKind, value: impl Into<Value>, message: impl Into<String>) -> Self {
        Self {
            kind,
            value: Some(value.into()),
            message: message.into(),
        }
    }

    pub fn required(message: impl Into<String>) -> Self {
        Self::new(RuleKind::Required, message)
    }
}

/// Effect a dependency has on its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DependencyAction {
    Show,
    Hide,
    Enable,
    Disable,
    Require,
    Unrequire,
}

/// Cross-field rule toggling one field based on another field's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDependency {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub source_field: String,
    pub source_value: Value,
    pub target_field: String,
    pub action: DependencyAction,
}

impl FieldDependency {
    pub fn new(
        id: impl Into<String>,
        source_field: impl Into<String>,
        source_value: impl Into<Value>,
        target_field: impl Into<String>,
        action: DependencyAction,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            source_field: source_field.into(),
            source_value: source_value.into(),
            target_field: target_field.into(),
            action,
        }
    }
}

/// Comparison applied by a submit-time rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    GreaterThan,
    LessThan,
    EqualTo,
    NotEqualTo,
    Contains,
    NotContains,
    Before,
    After,
}

/// Submit-time comparison between two fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomValidationRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub field1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field2: Option<String>,
    pub operator: ComparisonOperator,
    pub error_message: String,
}

impl CustomValidationRule {
    pub fn new(
        id: impl Into<String>,
        field1: impl Into<String>,
        operator: ComparisonOperator,
        field2: Option<&str>,
        error_message: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            field1: field1.into(),
            field2: field2.map(str::to_string),
            operator,
            error_message: error_message.into(),
        }
    }
}

/// Cross-field rules authored next to, not inside, a schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<FieldDependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_validations: Vec<CustomValidationRule>,
}
