use assert_cmd::Command;
use assert_fs::prelude::*;
use serde_json::{Value, json};

const TRAVEL_FORM: &str = include_str!("../../form-spec/tests/fixtures/travel_form.json");
const TRAVEL_RULES: &str = include_str!("../../form-spec/tests/fixtures/travel_rules.json");

fn travel_values() -> Value {
    json!({
        "fullName": "Jane Doe",
        "email": "jane@example.com",
        "tripType": "domestic",
        "travelStartDate": "2025-12-01",
        "travelEndDate": "2025-12-15",
        "travelers": 1,
        "agree": true
    })
}

#[test]
fn validate_command_accepts_complete_values() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let schema = workspace.child("travel_form.json");
    schema.write_str(TRAVEL_FORM)?;
    let rules = workspace.child("travel_rules.json");
    rules.write_str(TRAVEL_RULES)?;
    let values = workspace.child("values.json");
    values.write_str(&travel_values().to_string())?;

    let output = Command::cargo_bin("formflow")?
        .arg("validate")
        .arg("--schema")
        .arg(schema.path())
        .arg("--rules")
        .arg(rules.path())
        .arg("--values")
        .arg(values.path())
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Validation result: valid"));
    Ok(())
}

#[test]
fn validate_command_reports_cross_field_errors() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let schema = workspace.child("travel_form.json");
    schema.write_str(TRAVEL_FORM)?;
    let rules = workspace.child("travel_rules.json");
    rules.write_str(TRAVEL_RULES)?;
    let mut reversed = travel_values();
    reversed["travelEndDate"] = json!("2025-11-01");
    let values = workspace.child("values.json");
    values.write_str(&reversed.to_string())?;

    let output = Command::cargo_bin("formflow")?
        .arg("validate")
        .arg("--schema")
        .arg(schema.path())
        .arg("--rules")
        .arg(rules.path())
        .arg("--values")
        .arg(values.path())
        .output()?;
    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Validation result: invalid"));
    assert!(stdout.contains("Form errors:"));
    assert!(stdout.contains("end must be after start"));
    Ok(())
}

#[test]
fn inspect_command_flags_unknown_references() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let schema = workspace.child("travel_form.json");
    schema.write_str(TRAVEL_FORM)?;
    let rules = workspace.child("rules.json");
    rules.write_str(
        &json!({
            "dependencies": [{
                "id": "dep-ghost",
                "name": "Ghost",
                "sourceField": "tripType",
                "sourceValue": "international",
                "targetField": "visaNumber",
                "action": "show"
            }]
        })
        .to_string(),
    )?;

    let output = Command::cargo_bin("formflow")?
        .arg("inspect")
        .arg("--schema")
        .arg(schema.path())
        .arg("--rules")
        .arg(rules.path())
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Steps: 3"));
    assert!(stdout.contains("Step 2 (wizardStep 1): passportNumber, travelStartDate, travelEndDate"));
    assert!(stdout.contains("Warning: dep-ghost targetField 'visaNumber' does not match any field"));
    Ok(())
}

#[test]
fn evaluate_command_renders_requested_step() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let schema = workspace.child("travel_form.json");
    schema.write_str(TRAVEL_FORM)?;

    let output = Command::cargo_bin("formflow")?
        .arg("evaluate")
        .arg("--schema")
        .arg(schema.path())
        .arg("--step")
        .arg("2")
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("(step 3/3)"));
    assert!(stdout.contains(" - travelers (Travelers) = 1"));
    Ok(())
}

#[test]
fn json_schema_command_prints_document_schema() -> Result<(), Box<dyn std::error::Error>> {
    let output = Command::cargo_bin("formflow")?.arg("json-schema").output()?;
    assert!(output.status.success());
    let schema: Value = serde_json::from_slice(&output.stdout)?;
    assert!(schema["properties"].get("fields").is_some());
    Ok(())
}

#[test]
fn wizard_walks_steps_and_prints_submission() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let schema = workspace.child("mini.json");
    schema.write_str(
        &json!({
            "id": "mini",
            "title": "Mini",
            "successMessage": "Saved",
            "fields": [
                { "id": "name", "name": "name", "label": "Name", "type": "text", "wizardStep": 0,
                  "validations": [{ "type": "required", "message": "Name is required" }] },
                { "id": "size", "name": "size", "label": "Size", "type": "select", "wizardStep": 0,
                  "options": [{ "label": "S", "value": "s" }, { "label": "M", "value": "m" }] },
                { "id": "agree", "name": "agree", "label": "Agree", "type": "checkbox", "wizardStep": 1,
                  "validations": [{ "type": "required", "message": "Please agree" }] }
            ]
        })
        .to_string(),
    )?;
    let answers = ["", "Ada", "", "maybe", "yes"];
    let stdin = format!("{}\n", answers.join("\n"));

    let output = Command::cargo_bin("formflow")?
        .arg("wizard")
        .arg("--schema")
        .arg(schema.path())
        .arg("--values-json")
        .write_stdin(stdin)
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Form: Mini"));
    assert!(stdout.contains("Step 2/2"));
    assert!(stdout.contains("Done ✅"));
    assert!(stdout.contains("Saved"));
    assert!(stdout.contains("Submission (CBOR hex): "));
    assert!(stdout.contains("\"name\": \"Ada\""));
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Invalid answer: This field requires an answer."));
    assert!(stderr.contains("Invalid answer: Please enter yes or no."));
    Ok(())
}

#[test]
fn wizard_exit_aborts() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let schema = workspace.child("travel_form.json");
    schema.write_str(TRAVEL_FORM)?;

    Command::cargo_bin("formflow")?
        .arg("wizard")
        .arg("--schema")
        .arg(schema.path())
        .write_stdin("exit\n")
        .assert()
        .failure();
    Ok(())
}
