use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::spec::{FieldSchema, FieldType, FormSchema, RuleKind, ValidationRule};
use crate::template::{MessageContext, MessageTemplates};
use crate::value::{coerce_number, is_empty_value, value_to_display};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$")
        .case_insensitive(true)
        .build()
        .expect("email pattern compiles")
});

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^https?://.+\..+")
        .case_insensitive(true)
        .build()
        .expect("url pattern compiles")
});

/// Outcome of checking one value against one field's rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCheck {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FieldCheck {
    pub fn pass() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }
}

/// Host-supplied predicate referenced by a field-level `custom` rule.
#[derive(Clone)]
pub struct CustomCheck(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomCheck(..)")
    }
}

/// Named predicates available to `custom` rules.
#[derive(Debug, Clone, Default)]
pub struct CustomChecks {
    checks: BTreeMap<String, CustomCheck>,
}

impl CustomChecks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, check: F) -> &mut Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.checks.insert(name.into(), CustomCheck(Arc::new(check)));
        self
    }

    fn get(&self, name: &str) -> Option<CustomCheck> {
        self.checks.get(name).cloned()
    }
}

#[derive(Debug, Clone)]
enum Check {
    Email,
    Url,
    Pattern(Regex),
    MinLength(usize),
    MaxLength(usize),
    Min(f64),
    Max(f64),
    Custom(Option<CustomCheck>),
}

#[derive(Debug, Clone)]
struct CompiledRule {
    check: Check,
    message: String,
}

impl CompiledRule {
    fn passes(&self, value: &Value) -> bool {
        match &self.check {
            Check::Email => EMAIL_PATTERN.is_match(&value_to_display(value)),
            Check::Url => URL_PATTERN.is_match(&value_to_display(value)),
            Check::Pattern(regex) => regex.is_match(&value_to_display(value)),
            Check::MinLength(min) => value
                .as_str()
                .is_none_or(|text| text.chars().count() >= *min),
            Check::MaxLength(max) => value
                .as_str()
                .is_none_or(|text| text.chars().count() <= *max),
            Check::Min(min) => coerce_number(value).is_some_and(|num| num >= *min),
            Check::Max(max) => coerce_number(value).is_some_and(|num| num <= *max),
            Check::Custom(Some(check)) => (check.0)(value),
            Check::Custom(None) => true,
        }
    }
}

/// Ordered constraint check compiled from one field's rules.
#[derive(Debug, Clone)]
pub struct FieldValidator {
    field_id: String,
    name: String,
    kind: FieldType,
    required: bool,
    required_message: String,
    rules: Vec<CompiledRule>,
}

impl FieldValidator {
    pub fn field_id(&self) -> &str {
        &self.field_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the declared rules include `required`.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Checks a value with the field's declared requiredness.
    pub fn check(&self, value: Option<&Value>) -> FieldCheck {
        self.check_as(value, self.required)
    }

    /// Checks a value with requiredness decided by the caller.
    ///
    /// Rules run `required`, then formats, then lengths, then bounds, then custom
    /// checks; the first failure wins. Empty optional values skip every rule.
    pub fn check_as(&self, value: Option<&Value>, required: bool) -> FieldCheck {
        if !self.kind.is_input() {
            return FieldCheck::pass();
        }
        if is_empty_value(value, self.kind) {
            return if required {
                FieldCheck::fail(self.required_message.clone())
            } else {
                FieldCheck::pass()
            };
        }
        let Some(value) = value else {
            return FieldCheck::pass();
        };
        self.rules
            .iter()
            .find(|rule| !rule.passes(value))
            .map(|rule| FieldCheck::fail(rule.message.clone()))
            .unwrap_or_else(FieldCheck::pass)
    }
}

/// Validators for every field of a schema, in declaration order.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    validators: Vec<FieldValidator>,
    index: BTreeMap<String, usize>,
}

impl CompiledSchema {
    pub fn compile(schema: &FormSchema) -> Result<Self, SchemaError> {
        Self::compile_with(schema, &CustomChecks::default())
    }

    pub fn compile_with(schema: &FormSchema, checks: &CustomChecks) -> Result<Self, SchemaError> {
        schema.ensure_unique_ids()?;
        let templates = MessageTemplates::new();
        let validators = schema
            .fields
            .iter()
            .map(|field| compile_field(field, &templates, checks))
            .collect::<Result<Vec<_>, _>>()?;
        let index = validators
            .iter()
            .enumerate()
            .map(|(position, validator)| (validator.field_id.clone(), position))
            .collect();
        debug!(form = %schema.id, fields = validators.len(), "compiled form schema");
        Ok(Self { validators, index })
    }

    pub fn validator(&self, field_id: &str) -> Option<&FieldValidator> {
        self.index
            .get(field_id)
            .and_then(|position| self.validators.get(*position))
    }

    pub fn validators(&self) -> &[FieldValidator] {
        &self.validators
    }
}

/// Compiles one field's rules, failing fast on authoring errors.
pub fn compile_field(
    field: &FieldSchema,
    templates: &MessageTemplates,
    checks: &CustomChecks,
) -> Result<FieldValidator, SchemaError> {
    if field.kind.needs_options() && field.options.as_ref().is_none_or(Vec::is_empty) {
        return Err(SchemaError::MissingOptions {
            field: field.id.clone(),
            kind: field.kind.as_str(),
        });
    }

    let mut required_message = None;
    let mut rules = Vec::new();
    for rule in &field.validations {
        if rule.message.trim().is_empty() {
            return Err(SchemaError::EmptyMessage {
                field: field.id.clone(),
                rule: rule.kind.as_str(),
            });
        }
        let ctx = MessageContext {
            label: &field.label,
            name: &field.name,
            value: rule.value.as_ref(),
        };
        let message = templates.render(&field.id, &rule.message, &ctx)?;
        if rule.kind == RuleKind::Required {
            required_message.get_or_insert(message);
            continue;
        }
        if let Some(check) = compile_check(field, rule, checks)? {
            rules.push((rule.kind.phase(), CompiledRule { check, message }));
        }
    }
    rules.sort_by_key(|(phase, _)| *phase);

    if !field.kind.is_input() && !field.validations.is_empty() {
        debug!(field = %field.id, "rules on a display-only field are ignored");
    }

    Ok(FieldValidator {
        field_id: field.id.clone(),
        name: field.name.clone(),
        kind: field.kind,
        required: field.declares_required(),
        required_message: required_message
            .unwrap_or_else(|| format!("{} is required", field.label)),
        rules: rules.into_iter().map(|(_, rule)| rule).collect(),
    })
}

fn compile_check(
    field: &FieldSchema,
    rule: &ValidationRule,
    checks: &CustomChecks,
) -> Result<Option<Check>, SchemaError> {
    let invalid = |expected: &'static str| SchemaError::InvalidRuleValue {
        field: field.id.clone(),
        rule: rule.kind.as_str(),
        expected,
    };
    let length = || {
        rule.value
            .as_ref()
            .and_then(|value| match value {
                Value::Number(num) => num.as_u64(),
                Value::String(text) => text.trim().parse::<u64>().ok(),
                _ => None,
            })
            .and_then(|len| usize::try_from(len).ok())
            .ok_or_else(|| invalid("a non-negative integer"))
    };
    let bound = || {
        rule.value
            .as_ref()
            .and_then(coerce_number)
            .ok_or_else(|| invalid("a numeric"))
    };

    let check = match rule.kind {
        RuleKind::Email => Check::Email,
        RuleKind::Url => Check::Url,
        RuleKind::Pattern => {
            let pattern = rule
                .value
                .as_ref()
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("a string"))?;
            let regex = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
                field: field.id.clone(),
                pattern: pattern.to_string(),
                source,
            })?;
            Check::Pattern(regex)
        }
        RuleKind::MinLength => Check::MinLength(length()?),
        RuleKind::MaxLength => Check::MaxLength(length()?),
        RuleKind::Min => Check::Min(bound()?),
        RuleKind::Max => Check::Max(bound()?),
        RuleKind::Custom => {
            let name = rule.value.as_ref().and_then(Value::as_str);
            let check = name.and_then(|name| checks.get(name));
            if check.is_none() {
                warn!(
                    field = %field.id,
                    check = name.unwrap_or("<unnamed>"),
                    "custom rule has no registered check; it always passes"
                );
            }
            Check::Custom(check)
        }
        RuleKind::Required => return Ok(None),
    };
    Ok(Some(check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator(field: FieldSchema) -> FieldValidator {
        compile_field(&field, &MessageTemplates::new(), &CustomChecks::new()).expect("compile")
    }

    #[test]
    fn required_runs_before_format_rules() {
        let field = FieldSchema::new("email", "Email", FieldType::Email)
            .with_rule(ValidationRule::new(RuleKind::Email, "Bad email"))
            .with_rule(ValidationRule::required("Email is needed"));
        let v = validator(field);
        assert_eq!(v.check(Some(&json!(""))), FieldCheck::fail("Email is needed"));
        assert_eq!(v.check(Some(&json!("nope"))), FieldCheck::fail("Bad email"));
    }

    #[test]
    fn format_rules_run_before_lengths_regardless_of_declaration() {
        let field = FieldSchema::new("code", "Code", FieldType::Text)
            .with_rule(ValidationRule::with_value(RuleKind::MinLength, 5, "Too short"))
            .with_rule(ValidationRule::with_value(
                RuleKind::Pattern,
                "^[A-Z]+$",
                "Capitals only",
            ));
        let v = validator(field);
        assert_eq!(v.check(Some(&json!("ab"))), FieldCheck::fail("Capitals only"));
        assert_eq!(v.check(Some(&json!("AB"))), FieldCheck::fail("Too short"));
        assert!(v.check(Some(&json!("ABCDE"))).valid);
    }

    #[test]
    fn bounds_reject_non_numeric_input() {
        let field = FieldSchema::new("age", "Age", FieldType::Number)
            .with_rule(ValidationRule::with_value(RuleKind::Min, 18, "Adults only"))
            .with_rule(ValidationRule::with_value(RuleKind::Max, 120, "Too old"));
        let v = validator(field);
        assert_eq!(v.check(Some(&json!("twelve"))), FieldCheck::fail("Adults only"));
        assert_eq!(v.check(Some(&json!(17))), FieldCheck::fail("Adults only"));
        assert_eq!(v.check(Some(&json!("130"))), FieldCheck::fail("Too old"));
        assert!(v.check(Some(&json!("42"))).valid);
    }

    #[test]
    fn optional_empty_values_skip_rules() {
        let field = FieldSchema::new("site", "Website", FieldType::Url)
            .with_rule(ValidationRule::new(RuleKind::Url, "Bad url"));
        let v = validator(field);
        assert!(v.check(None).valid);
        assert!(v.check(Some(&json!(""))).valid);
        assert!(!v.check(Some(&json!("ftp://x"))).valid);
        assert!(v.check(Some(&json!("HTTPS://Example.org/path"))).valid);
    }

    #[test]
    fn required_override_uses_default_message() {
        let field = FieldSchema::new("notes", "Notes", FieldType::Textarea);
        let v = validator(field);
        assert!(v.check(None).valid);
        assert_eq!(v.check_as(None, true), FieldCheck::fail("Notes is required"));
    }

    #[test]
    fn invalid_pattern_fails_at_compile_time() {
        let field = FieldSchema::new("zip", "Zip", FieldType::Text).with_rule(
            ValidationRule::with_value(RuleKind::Pattern, "([0-9]", "Bad zip"),
        );
        let err = compile_field(&field, &MessageTemplates::new(), &CustomChecks::new())
            .expect_err("pattern should not compile");
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
    }

    #[test]
    fn length_rule_without_value_is_rejected() {
        let field = FieldSchema::new("zip", "Zip", FieldType::Text)
            .with_rule(ValidationRule::new(RuleKind::MaxLength, "Too long"));
        let err = compile_field(&field, &MessageTemplates::new(), &CustomChecks::new())
            .expect_err("length needs a value");
        assert!(matches!(err, SchemaError::InvalidRuleValue { .. }));
    }

    #[test]
    fn select_without_options_is_rejected() {
        let field = FieldSchema::new("plan", "Plan", FieldType::Select);
        let err = compile_field(&field, &MessageTemplates::new(), &CustomChecks::new())
            .expect_err("select needs options");
        assert!(matches!(err, SchemaError::MissingOptions { .. }));
    }

    #[test]
    fn registered_custom_check_runs_last() {
        let mut checks = CustomChecks::new();
        checks.register("even", |value| {
            coerce_number(value).is_some_and(|num| num % 2.0 == 0.0)
        });
        let field = FieldSchema::new("seats", "Seats", FieldType::Number)
            .with_rule(ValidationRule::with_value(RuleKind::Custom, "even", "Seats come in pairs"))
            .with_rule(ValidationRule::with_value(RuleKind::Max, 10, "At most {{value}}"));
        let v = compile_field(&field, &MessageTemplates::new(), &checks).expect("compile");
        assert_eq!(v.check(Some(&json!(12))), FieldCheck::fail("At most 10"));
        assert_eq!(v.check(Some(&json!(3))), FieldCheck::fail("Seats come in pairs"));
        assert!(v.check(Some(&json!(4))).valid);
    }

    #[test]
    fn headings_always_pass() {
        let field = FieldSchema::new("intro", "Intro", FieldType::Heading)
            .with_rule(ValidationRule::required("ignored"));
        let v = validator(field);
        assert!(!v.is_required());
        assert!(v.check(None).valid);
    }

    #[test]
    fn duplicate_ids_fail_schema_compilation() {
        let mut schema = FormSchema::new("dup", "Dup");
        schema.fields.push(FieldSchema::new("a", "A", FieldType::Text));
        schema.fields.push(FieldSchema::new("a", "A again", FieldType::Text));
        let err = CompiledSchema::compile(&schema).expect_err("duplicate ids");
        assert!(matches!(err, SchemaError::DuplicateFieldId(id) if id == "a"));
    }
}
