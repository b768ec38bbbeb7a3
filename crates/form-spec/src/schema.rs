use schemars::schema_for;
use serde_json::Value;

use crate::spec::{FormSchema, RuleSet};

/// JSON Schema describing the `FormSchema` document.
pub fn form_json_schema() -> Value {
    schema_for!(FormSchema).to_value()
}

/// JSON Schema describing the `RuleSet` document.
pub fn rule_set_json_schema() -> Value {
    schema_for!(RuleSet).to_value()
}
