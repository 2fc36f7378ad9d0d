use assert_cmd::Command;
use assert_fs::prelude::*;
use serde_json::{Value, json};

fn formcheck() -> Command {
    let mut cmd = Command::cargo_bin("formcheck").expect("binary");
    cmd.env_remove("FORMCHECK_FORM").env_remove("FORMCHECK_LOG");
    cmd
}

fn stdout_of(cmd: &mut Command, success: bool) -> String {
    let assert = cmd.assert();
    let assert = if success {
        assert.success()
    } else {
        assert.failure()
    };
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

#[test]
fn forms_lists_builtins() {
    let out = stdout_of(formcheck().arg("forms"), true);
    assert_eq!(out.lines().collect::<Vec<_>>(), vec!["event-registration", "job-application"]);
}

#[test]
fn validate_reports_missing_name() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let values = workspace.child("values.json");
    values.write_str(&json!({ "name": "", "email": "a@b.com", "age": "5" }).to_string())?;

    let out = stdout_of(
        formcheck()
            .args(["validate", "--form", "event-registration", "--values"])
            .arg(values.path()),
        false,
    );
    assert!(out.contains("Validation result: invalid"));
    assert!(out.contains("  name - Name is required"));
    assert!(!out.contains("email -"));
    Ok(())
}

#[test]
fn validate_accepts_complete_values() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let values = workspace.child("values.json");
    values.write_str(
        &json!({ "name": "Ada", "email": "ada@example.com", "age": "36" }).to_string(),
    )?;

    let out = stdout_of(
        formcheck()
            .args(["validate", "--form", "event-registration", "--values"])
            .arg(values.path()),
        true,
    );
    assert!(out.contains("Validation result: valid"));
    Ok(())
}

#[test]
fn form_can_come_from_environment() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let values = workspace.child("values.json");
    values.write_str(&json!({ "position": "Manager" }).to_string())?;

    let out = stdout_of(
        formcheck()
            .env("FORMCHECK_FORM", "job-application")
            .args(["visible", "--values"])
            .arg(values.path()),
        true,
    );
    assert!(out.lines().any(|line| line == "managementExperience"));
    assert!(!out.lines().any(|line| line == "portfolioURL"));
    Ok(())
}

#[test]
fn missing_form_is_an_error() {
    formcheck().arg("describe").assert().failure();
}

#[test]
fn describe_reads_form_file() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let form = workspace.child("feedback.json");
    form.write_str(
        &json!({
            "id": "feedback",
            "title": "Feedback",
            "version": "0.1.0",
            "fields": [
                { "key": "comment", "type": "text", "title": "Comment", "required": true }
            ]
        })
        .to_string(),
    )?;

    let out = stdout_of(
        formcheck().args(["describe", "--form"]).arg(form.path()),
        true,
    );
    let spec: Value = serde_json::from_str(&out)?;
    assert_eq!(spec["id"], "feedback");
    assert_eq!(spec["fields"][0]["required"], true);
    Ok(())
}

#[test]
fn submit_prints_summary_and_json() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let values = workspace.child("values.json");
    values.write_str(
        &json!({
            "name": "Ada",
            "email": "ada@example.com",
            "age": "36",
            "attendingWithGuest": true,
            "guestName": "Charles"
        })
        .to_string(),
    )?;

    let out = stdout_of(
        formcheck()
            .args(["submit", "--json", "--form", "event-registration", "--values"])
            .arg(values.path()),
        true,
    );
    assert!(out.contains("Event Registration submitted successfully"));
    assert!(out.contains("  Guest Name: Charles"));
    assert!(out.contains("\"guestName\": \"Charles\""));
    Ok(())
}

#[test]
fn schema_lists_visible_properties() -> Result<(), Box<dyn std::error::Error>> {
    let out = stdout_of(
        formcheck().args(["schema", "--form", "event-registration"]),
        true,
    );
    let schema: Value = serde_json::from_str(&out)?;
    let properties = schema["properties"].as_object().expect("properties");
    assert!(properties.contains_key("name"));
    assert!(!properties.contains_key("guestName"));
    Ok(())
}

#[test]
fn fill_reprompts_invalid_fields() {
    let answers = ["Ada", "bad-email", "36", "no", "ada@example.com"];
    let out = stdout_of(
        formcheck()
            .args(["fill", "--form", "event-registration"])
            .write_stdin(format!("{}\n", answers.join("\n"))),
        true,
    );
    assert!(out.contains("Form: Event Registration"));
    assert!(out.contains("  email - Email is not valid"));
    assert!(out.contains("Done ✅"));
    assert!(out.contains("  Email: ada@example.com"));
}

#[test]
fn fill_reveals_guest_name_when_toggled() {
    let answers = ["Ada", "ada@example.com", "36", "yes", "Charles"];
    let out = stdout_of(
        formcheck()
            .args(["fill", "--form", "event-registration"])
            .write_stdin(format!("{}\n", answers.join("\n"))),
        true,
    );
    assert!(out.contains("5/5 Guest Name *"));
    assert!(out.contains("  Guest Name: Charles"));
}

#[test]
fn fill_fails_when_input_ends_early() {
    formcheck()
        .args(["fill", "--form", "event-registration"])
        .write_stdin("Ada\n")
        .assert()
        .failure();
}

#[test]
fn schema_format_spec_describes_form_definitions() -> Result<(), Box<dyn std::error::Error>> {
    let out = stdout_of(formcheck().args(["schema", "--format-spec"]), true);
    let schema: Value = serde_json::from_str(&out)?;
    assert_eq!(schema["title"], "FormSpec");
    let properties = schema["properties"].as_object().expect("properties");
    for key in ["id", "title", "version", "fields"] {
        assert!(properties.contains_key(key), "missing {key}");
    }
    Ok(())
}

#[test]
fn submit_keeps_whole_numbers_as_integers() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let form = workspace.child("party.json");
    form.write_str(
        &json!({
            "id": "party",
            "title": "Party",
            "version": "1.0.0",
            "fields": [
                { "key": "guests", "type": "number", "title": "Guests", "required": true },
                {
                    "key": "names",
                    "type": "text",
                    "title": "Guest Names",
                    "required": true,
                    "visible_if": { "op": "eq", "field": "guests", "value": 2 }
                }
            ]
        })
        .to_string(),
    )?;
    let values = workspace.child("values.json");
    values.write_str(&json!({ "guests": 2 }).to_string())?;

    let out = stdout_of(
        formcheck()
            .args(["validate", "--form"])
            .arg(form.path())
            .arg("--values")
            .arg(values.path()),
        false,
    );
    assert!(out.contains("  names - Guest Names is required"));

    values.write_str(&json!({ "guests": 2, "names": "Ada, Charles" }).to_string())?;
    let out = stdout_of(
        formcheck()
            .args(["submit", "--json", "--form"])
            .arg(form.path())
            .arg("--values")
            .arg(values.path()),
        true,
    );
    assert!(out.contains("\"guests\": 2"));
    assert!(!out.contains("2.0"));
    Ok(())
}
