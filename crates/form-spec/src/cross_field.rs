use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::spec::{ComparisonOperator, CustomValidationRule, FormSchema};
use crate::value::{ValueSnapshot, coerce_number, value_to_display, values_equal};

/// Runs every rule and collects the messages of those that fail, in rule order.
pub fn evaluate_rules(
    schema: &FormSchema,
    rules: &[CustomValidationRule],
    snapshot: &ValueSnapshot,
) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| !rule_passes(schema, rule, snapshot))
        .map(|rule| rule.error_message.clone())
        .collect()
}

/// A rule without `field2` is informational and always passes, as does a rule
/// with a blank operand; blank values are the per-field validators' concern.
pub fn rule_passes(schema: &FormSchema, rule: &CustomValidationRule, snapshot: &ValueSnapshot) -> bool {
    let Some(field2) = &rule.field2 else {
        return true;
    };
    let (Some(left), Some(right)) = (
        lookup(schema, snapshot, &rule.field1),
        lookup(schema, snapshot, field2),
    ) else {
        return true;
    };
    compare(rule.operator, left, right)
}

fn lookup<'a>(schema: &FormSchema, snapshot: &'a ValueSnapshot, reference: &str) -> Option<&'a Value> {
    let name = schema
        .find_field(reference)
        .map(|field| field.name.as_str())
        .unwrap_or(reference);
    snapshot.get(name).filter(|value| !is_blank(value))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

pub fn compare(operator: ComparisonOperator, left: &Value, right: &Value) -> bool {
    match operator {
        ComparisonOperator::GreaterThan => ordering(left, right) == Some(Ordering::Greater),
        ComparisonOperator::LessThan => ordering(left, right) == Some(Ordering::Less),
        ComparisonOperator::EqualTo => loosely_equal(left, right),
        ComparisonOperator::NotEqualTo => !loosely_equal(left, right),
        ComparisonOperator::Contains => contains(left, right),
        ComparisonOperator::NotContains => !contains(left, right),
        ComparisonOperator::Before => date_ordering(left, right) == Some(Ordering::Less),
        ComparisonOperator::After => date_ordering(left, right) == Some(Ordering::Greater),
    }
}

/// Numeric when both sides read as numbers, textual otherwise.
fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (coerce_number(left), coerce_number(right)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ if left.is_array() || right.is_array() || left.is_object() || right.is_object() => None,
        _ => Some(value_to_display(left).cmp(&value_to_display(right))),
    }
}

fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (coerce_number(left), coerce_number(right)) {
        (Some(a), Some(b)) => a == b,
        _ if left.is_array() || right.is_array() => values_equal(left, right),
        _ => value_to_display(left) == value_to_display(right),
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| loosely_equal(item, needle)),
        Value::String(text) => text.contains(value_to_display(needle).as_str()),
        _ => false,
    }
}

fn date_ordering(left: &Value, right: &Value) -> Option<Ordering> {
    Some(parse_date(left)?.cmp(&parse_date(right)?))
}

/// Accepts `YYYY-MM-DD`, `datetime-local` input values and RFC 3339 timestamps.
pub fn parse_date(value: &Value) -> Option<NaiveDateTime> {
    let text = value.as_str()?.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(op: ComparisonOperator, field2: Option<&str>) -> CustomValidationRule {
        CustomValidationRule::new("r", "a", op, field2, "failed")
    }

    fn values(a: Value, b: Value) -> ValueSnapshot {
        [("a", a), ("b", b)].into_iter().collect()
    }

    fn passes(op: ComparisonOperator, a: Value, b: Value) -> bool {
        let schema = FormSchema::new("f", "F");
        rule_passes(&schema, &rule(op, Some("b")), &values(a, b))
    }

    #[test]
    fn numeric_strings_compare_as_numbers() {
        assert!(passes(ComparisonOperator::GreaterThan, json!("10"), json!("9")));
        assert!(passes(ComparisonOperator::LessThan, json!(2), json!("3.5")));
        assert!(passes(ComparisonOperator::EqualTo, json!(5), json!("5.0")));
        assert!(passes(ComparisonOperator::GreaterThan, json!("pear"), json!("apple")));
        assert!(!passes(ComparisonOperator::NotEqualTo, json!("x"), json!("x")));
    }

    #[test]
    fn contains_handles_text_and_arrays() {
        assert!(passes(ComparisonOperator::Contains, json!("hello world"), json!("world")));
        assert!(passes(ComparisonOperator::Contains, json!(["a", "b"]), json!("b")));
        assert!(passes(ComparisonOperator::NotContains, json!(["a", "b"]), json!("c")));
        assert!(!passes(ComparisonOperator::Contains, json!(42), json!("4")));
    }

    #[test]
    fn dates_accept_several_input_formats() {
        assert!(passes(ComparisonOperator::Before, json!("2025-12-01"), json!("2025-12-15")));
        assert!(passes(
            ComparisonOperator::After,
            json!("2025-12-01T10:30"),
            json!("2025-12-01T09:00:00Z")
        ));
        assert!(!passes(ComparisonOperator::Before, json!("2025-12-01"), json!("2025-12-01")));
        assert!(!passes(ComparisonOperator::Before, json!("soon"), json!("2025-12-01")));
    }

    #[test]
    fn missing_field2_or_blank_operand_passes() {
        let schema = FormSchema::new("f", "F");
        let snapshot = values(json!(1), json!(2));
        assert!(rule_passes(&schema, &rule(ComparisonOperator::GreaterThan, None), &snapshot));
        assert!(passes(ComparisonOperator::GreaterThan, json!(""), json!(3)));
        assert!(passes(ComparisonOperator::EqualTo, json!(null), json!(3)));
    }

    #[test]
    fn every_failing_rule_surfaces() {
        let schema = FormSchema::new("f", "F");
        let rules = vec![
            CustomValidationRule::new("r1", "a", ComparisonOperator::GreaterThan, Some("b"), "first"),
            CustomValidationRule::new("r2", "a", ComparisonOperator::EqualTo, Some("b"), "second"),
            CustomValidationRule::new("r3", "a", ComparisonOperator::LessThan, Some("b"), "third"),
        ];
        let errors = evaluate_rules(&schema, &rules, &values(json!(1), json!(2)));
        assert_eq!(errors, vec!["first".to_string(), "second".to_string()]);
    }
}
