use std::fs;
use assert_cmd::Command;

fn cli() -> Command {
    Command::new(assert_cmd::cargo_bin!("chatmark-cli"))
}

fn stdout_of(args: &[&str], stdin: &str) -> String {
    let output = cli()
        .args(args)
        .write_stdin(stdin)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(output).expect("utf-8 stdout")
}

#[test]
fn render_prints_sanitized_html() {
    let out = stdout_of(&[], "**hi** <script>alert(1)</script>");
    assert_eq!(out.trim_end(), "<p><strong>hi</strong> </p>");
}

#[test]
fn render_escapes_plain_text() {
    let out = stdout_of(&["render", "-"], "a < b");
    assert_eq!(out.trim_end(), "a &lt; b");
}

#[test]
fn render_reads_a_file_argument() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("message.md");
    fs::write(&input, "[docs](javascript:alert(1))").expect("write input");

    let output = cli()
        .arg(input.to_string_lossy().as_ref())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8_lossy(&output).trim_end(), "<p><a>docs</a></p>");
}

#[test]
fn detect_prints_the_matching_rule() {
    assert_eq!(stdout_of(&["detect"], "| a | b |").trim_end(), "table");
    assert_eq!(stdout_of(&["detect"], "hello world").trim_end(), "none");
}

#[test]
fn tree_prints_tagged_json() {
    let out = stdout_of(&["tree"], "`x`");
    let value: serde_json::Value = serde_json::from_str(&out).expect("json");
    assert_eq!(value["kind"], "structured");
    assert_eq!(value["tree"]["children"][0]["tag"], "p");
    assert_eq!(value["tree"]["children"][0]["children"][0]["tag"], "code");

    let out = stdout_of(&["tree", "--pretty"], "plain");
    assert!(out.contains('\n'));
    let value: serde_json::Value = serde_json::from_str(&out).expect("json");
    assert_eq!(value["kind"], "literal");
    assert_eq!(value["html"], "plain");
}

#[test]
fn policy_reflects_the_config_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("chatmark.json");
    fs::write(
        &config,
        r#"{ "policy": { "addTags": ["span"], "addAttr": { "span": ["lang"] } } }"#,
    )
    .expect("write config");

    let out = stdout_of(&["policy", "--config", config.to_string_lossy().as_ref()], "");
    let value: serde_json::Value = serde_json::from_str(&out).expect("json");
    let tags = value["allowedTags"].as_array().expect("tag list");
    assert!(tags.iter().any(|t| t == "span"));
    assert_eq!(value["allowedAttributes"]["span"], serde_json::json!(["lang"]));
}

#[test]
fn repeated_configs_are_layered_in_order() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let base = tmp.path().join("base.json");
    let local = tmp.path().join("local.json");
    fs::write(&base, r#"{ "breaks": false, "policy": { "forbidTags": ["em"] } }"#)
        .expect("write base");
    fs::write(&local, r#"{ "breaks": true }"#).expect("write local");

    let out = stdout_of(
        &[
            "--config",
            base.to_string_lossy().as_ref(),
            "--config",
            local.to_string_lossy().as_ref(),
        ],
        "*a*\nb",
    );
    assert_eq!(out.trim_end(), "<p>a<br>b</p>");
}

#[test]
fn invalid_config_fails() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("bad.json");
    fs::write(&config, r#"{ "policy": { "addTags": ["span"] } }"#).expect("write config");

    let output = cli()
        .args(["--config", config.to_string_lossy().as_ref()])
        .write_stdin("**x**")
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("Invalid sanitization policy"));
}

#[test]
fn unknown_flag_prints_usage() {
    let output = cli()
        .arg("--bogus")
        .assert()
        .code(2)
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("USAGE:"));
}
