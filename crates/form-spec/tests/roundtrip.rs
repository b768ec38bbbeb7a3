use serde_json::json;

use form_spec::{
    FieldSchema, FieldType, FormSchema, RuleKind, RuleSet, ValidationRule, form_json_schema,
    spec::FormLayout,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "travel_form" => include_str!("../tests/fixtures/travel_form.json"),
        "travel_rules" => include_str!("../tests/fixtures/travel_rules.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

#[test]
fn travel_fixture_survives_a_serialize_cycle() {
    let schema: FormSchema = serde_json::from_str(fixture("travel_form")).expect("schema");
    assert_eq!(schema.layout, FormLayout::Wizard);
    assert_eq!(schema.fields.len(), 10);

    let encoded = serde_json::to_string(&schema).expect("serialize");
    let decoded: FormSchema = serde_json::from_str(&encoded).expect("deserialize");
    assert_eq!(decoded, schema);

    let rules: RuleSet = serde_json::from_str(fixture("travel_rules")).expect("rules");
    let decoded: RuleSet =
        serde_json::from_value(serde_json::to_value(&rules).expect("serialize")).expect("rules");
    assert_eq!(decoded, rules);
}

#[test]
fn built_schema_keeps_optional_keys_out_of_the_document() {
    let mut schema = FormSchema::new("feedback", "Feedback");
    schema.fields = vec![
        FieldSchema::new("rating", "Rating", FieldType::Radio)
            .with_options(["1", "2", "3"])
            .with_rule(ValidationRule::required("Pick a rating")),
        FieldSchema::new("comment", "Comment", FieldType::Textarea)
            .with_rule(ValidationRule::with_value(RuleKind::MaxLength, 500, "Too long")),
    ];

    let value = serde_json::to_value(&schema).expect("serialize");
    assert_eq!(value["fields"][0]["type"], "radio");
    assert_eq!(value["fields"][1]["validations"][0]["type"], "maxLength");
    assert_eq!(value["layout"], "single");
    assert!(value.get("submitUrl").is_none());
    assert!(value["fields"][1].get("options").is_none());

    let decoded: FormSchema = serde_json::from_value(value).expect("deserialize");
    assert_eq!(decoded, schema);
}

#[test]
fn missing_layout_defaults_to_single() {
    let schema: FormSchema = serde_json::from_value(json!({
        "id": "bare",
        "title": "Bare",
        "fields": []
    }))
    .expect("deserialize");
    assert_eq!(schema.layout, FormLayout::Single);
    assert!(schema.fields.is_empty());
}

#[test]
fn published_json_schema_names_every_field_type() {
    let schema = form_json_schema();
    let text = schema.to_string();
    for kind in ["text", "textarea", "checkbox", "heading", "phone"] {
        assert!(text.contains(&format!("\"{kind}\"")), "missing {kind}");
    }
}
