use serde_json::json;

use form_spec::{
    DependencyAction, EngineConfig, FieldDependency, FieldSchema, FieldType, FormEngine,
    FormSchema, ResolutionMode, RuleSet, ValueSnapshot,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "travel_form" => include_str!("../tests/fixtures/travel_form.json"),
        "travel_rules" => include_str!("../tests/fixtures/travel_rules.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn travel_engine() -> FormEngine {
    let schema: FormSchema = serde_json::from_str(fixture("travel_form")).expect("schema");
    let rules: RuleSet = serde_json::from_str(fixture("travel_rules")).expect("rules");
    FormEngine::new(schema, rules).expect("engine")
}

#[test]
fn passport_follows_trip_type() {
    let engine = travel_engine();

    let states = engine.field_states(&ValueSnapshot::new());
    let passport = states["passportNumber"];
    assert!(!passport.visible);
    assert!(!passport.required);

    let values: ValueSnapshot = [("tripType", json!("international"))].into_iter().collect();
    let passport = engine.field_states(&values)["passportNumber"];
    assert!(passport.visible && passport.enabled && passport.required);

    let values: ValueSnapshot = [("tripType", json!("domestic"))].into_iter().collect();
    let passport = engine.field_states(&values)["passportNumber"];
    assert!(!passport.visible);
    assert!(!passport.required);
}

#[test]
fn conditional_field_tracks_checkbox() {
    let engine = travel_engine();
    let values: ValueSnapshot = [("newsletter", json!(true))].into_iter().collect();
    assert!(engine.field_states(&values)["newsletterTopics"].visible);

    let values: ValueSnapshot = [("newsletter", json!(false))].into_iter().collect();
    assert!(!engine.field_states(&values)["newsletterTopics"].visible);
}

#[test]
fn evaluation_reflects_dependency_flags() {
    let engine = travel_engine();
    let values: ValueSnapshot = [("tripType", json!("international"))].into_iter().collect();
    let evaluation = engine.evaluate(&values);
    let passport = evaluation.field("passportNumber").expect("passport");
    assert!(passport.visible && passport.required);
    assert!(passport.error.is_none(), "untouched fields carry no error");

    let values: ValueSnapshot = [
        ("tripType", json!("international")),
        ("passportNumber", json!("short")),
    ]
    .into_iter()
    .collect();
    let evaluation = engine.on_value_change(&values, "passportNumber");
    assert_eq!(
        evaluation
            .field("passportNumber")
            .and_then(|field| field.error.as_deref()),
        Some("Passport numbers are 6-9 letters or digits")
    );
}

#[test]
fn settled_mode_follows_chains_through_hidden_fields() {
    let mut schema = FormSchema::new("chain", "Chain");
    schema.fields = vec![
        FieldSchema::new("a", "A", FieldType::Checkbox),
        FieldSchema::new("b", "B", FieldType::Checkbox),
        FieldSchema::new("c", "C", FieldType::Text),
    ];
    let rules = RuleSet {
        dependencies: vec![
            FieldDependency::new("show-b", "a", true, "b", DependencyAction::Show),
            FieldDependency::new("show-c", "b", true, "c", DependencyAction::Show),
        ],
        custom_validations: Vec::new(),
    };
    let values: ValueSnapshot = [("a", json!(false)), ("b", json!(true))]
        .into_iter()
        .collect();

    let single = FormEngine::new(schema.clone(), rules.clone()).expect("engine");
    assert!(single.field_states(&values)["c"].visible);

    let settled = FormEngine::with_config(
        schema,
        rules,
        EngineConfig {
            resolution: ResolutionMode::Settled { max_passes: 8 },
            ..EngineConfig::default()
        },
    )
    .expect("engine");
    let states = settled.field_states(&values);
    assert!(!states["b"].visible);
    assert!(!states["c"].visible);
}

#[test]
fn engine_config_reads_camel_case_keys() {
    let config: EngineConfig = serde_json::from_value(json!({
        "resolution": { "settled": { "maxPasses": 4 } },
        "errorsForUntouched": true
    }))
    .expect("config");
    assert_eq!(config.resolution, ResolutionMode::Settled { max_passes: 4 });
    assert!(config.errors_for_untouched);

    let config: EngineConfig = serde_json::from_value(json!({})).expect("defaults");
    assert_eq!(config, EngineConfig::default());
}
