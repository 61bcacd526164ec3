use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn bin() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("fillkit-cli").expect("binary")
}

fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write fixture");
    path
}

fn profile(dir: &TempDir) -> PathBuf {
    write(
        dir,
        "profile.json",
        r#"{"firstName": "Sam", "email": "sam@example.com", "country": "USA", "state": "NY"}"#,
    )
}

fn stdout_json(cmd: &mut assert_cmd::Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout is JSON")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

#[test]
fn normalize_prints_canonical_leaves() {
    let tmp = tempdir().expect("tmpdir");
    let profile = profile(&tmp);
    let value = stdout_json(bin().args(["normalize", "--profile", path_arg(&profile), "--as-of", "2024-06-01"]));
    let text = value.to_string();
    assert!(text.contains("sam@example.com"), "{text}");
}

#[test]
fn match_reports_the_chosen_option() {
    let tmp = tempdir().expect("tmpdir");
    let profile = profile(&tmp);
    let field = write(&tmp, "field.json", r#"{"label": "Country", "options": [{"text": "USA"}, {"text": "CAN"}]}"#);
    let value = stdout_json(bin().args([
        "match",
        "--profile",
        path_arg(&profile),
        "--field",
        path_arg(&field),
    ]));
    assert_eq!(value["result"]["chosen"]["index"], 0);
    assert_eq!(value["remote"]["status"], "not_attempted");
}

#[test]
fn pass_dry_run_summarizes_fields() {
    let tmp = tempdir().expect("tmpdir");
    let profile = profile(&tmp);
    let fields = write(
        &tmp,
        "fields.json",
        r#"[
            {"label": "Country", "options": [{"text": "USA"}, {"text": "CAN"}]},
            {"label": "Email address", "type": "email"},
            {"label": "Industry", "options": [{"text": "Technology"}, {"text": "Healthcare"}]}
        ]"#,
    );
    let value = stdout_json(bin().args(["pass", "--profile", path_arg(&profile), "--fields", path_arg(&fields)]));
    assert_eq!(value["summary"]["total"], 3);
    assert_eq!(value["outcomes"][0]["status"], "matched");
    assert_eq!(value["outcomes"][1]["value"], "sam@example.com");
    assert_eq!(value["outcomes"][2]["status"], "skipped");
}

#[test]
fn suggest_fills_freeform_fields() {
    let tmp = tempdir().expect("tmpdir");
    let profile = profile(&tmp);
    let value = stdout_json(bin().args([
        "suggest",
        "--profile",
        path_arg(&profile),
        "--label",
        "Email address",
        "--kind",
        "email",
    ]));
    assert_eq!(value["value"], "sam@example.com");
}

#[test]
fn invalid_threshold_fails_fast() {
    let tmp = tempdir().expect("tmpdir");
    let profile = profile(&tmp);
    let fields = write(&tmp, "fields.json", "[]");
    bin()
        .args(["pass", "--profile", path_arg(&profile), "--fields", path_arg(&fields), "--threshold", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("confidence_threshold"));
}

#[test]
fn config_schema_and_check() {
    let tmp = tempdir().expect("tmpdir");
    let schema = stdout_json(bin().args(["config", "schema"]));
    assert!(schema.to_string().contains("confidence_threshold"));

    let good = write(&tmp, "fillkit.toml", "[matching]\nconfidence_threshold = 0.9\n");
    let value = stdout_json(bin().args(["config", "check", path_arg(&good)]));
    assert_eq!(value["matching"]["confidence_threshold"], 0.9);

    let bad = write(&tmp, "bad.toml", "[matching]\nconfidence_threshold = \"high\"\n");
    bin()
        .args(["config", "check", path_arg(&bad)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.toml"));
}

#[test]
fn aliases_resolve_and_validate() {
    let value = stdout_json(bin().args(["aliases", "resolve", "country", "USA"]));
    assert_eq!(value["matches"][0]["key"], "united states");

    bin()
        .args(["aliases", "resolve", "planet", "Mars"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown alias category"));

    bin().args(["aliases", "validate"]).assert().success();

    let tmp = tempdir().expect("tmpdir");
    let table = write(
        &tmp,
        "regions.toml",
        "category = \"region\"\n\n[[entries]]\nkey = \"lemuria\"\nvariants = [\"lemuria\"]\nparent = \"atlantis\"\n",
    );
    bin()
        .args(["aliases", "validate", "--table", path_arg(&table)])
        .assert()
        .failure()
        .stdout(predicate::str::contains("atlantis"));
}
