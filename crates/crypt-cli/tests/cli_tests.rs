use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn tool() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("crypt-tool").unwrap()
}

#[test]
fn hash_with_given_setting() {
    tool()
        .args(["hash", "$5$saltstring", "--phrase", "Hello world!"])
        .assert()
        .success()
        .stdout("$5$saltstring$5B8vYYiY.CVt1RlTTf8KbXBH3hsxY/GNooZaBBGWEc5\n");
}

#[test]
fn hash_reads_phrase_from_stdin() {
    tool()
        .args(["hash", "$1$saltstring"])
        .write_stdin("Hello world!\n")
        .assert()
        .success()
        .stdout("$1$saltstri$YMyguxXMBpd2TEZ.vS/3q1\n");
}

#[test]
fn hash_failure_prints_token() {
    tool()
        .args(["hash", "*0", "--phrase", "x"])
        .assert()
        .failure()
        .stdout("*1\n");
}

#[test]
fn hash_without_setting_uses_configured_prefix() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("crypt-tool.json");
    fs::write(&config, r#"{"default_prefix": "$6$", "default_count": 1000}"#).unwrap();
    tool()
        .arg("--config")
        .arg(&config)
        .args(["hash", "--phrase", "pw"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("$6$rounds=1000$"));
}

#[test]
fn verify_round_trip() {
    let out = tool()
        .args(["hash", "$2b$04$UBVLHeMpJ/QQCv3XqJx8zO", "--phrase", "alexander"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let hashed = String::from_utf8(out.stdout).unwrap();
    let hashed = hashed.trim_end();

    tool()
        .args(["verify", hashed, "--phrase", "alexander"])
        .assert()
        .success()
        .stdout("ok\n");
    tool()
        .args(["verify", hashed, "--phrase", "alexandra"])
        .assert()
        .failure()
        .stdout("mismatch\n");
}

#[test]
fn gensalt_honours_prefix_and_count() {
    tool()
        .args(["gensalt", "--prefix", "$5$", "--count", "10191"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\$5\$rounds=10191\$[./0-9A-Za-z]{16}\n$").unwrap());
    tool().args(["gensalt", "--prefix", "$2x$"]).assert().failure();
}

#[test]
fn gensalt_defaults_to_preferred_method() {
    tool()
        .arg("gensalt")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("$y$j9T$"));
}

#[test]
fn checksalt_verdicts() {
    tool().args(["checksalt", "$6$abc"]).assert().success().stdout("ok\n");
    tool()
        .args(["checksalt", "$1$abc"])
        .assert()
        .success()
        .stdout("method_legacy\n");
    tool().args(["checksalt", "!!"]).assert().failure().stdout("invalid\n");
}

#[test]
fn checksalt_json_report() {
    let out = tool().args(["checksalt", "--json", "$2x$"]).output().unwrap();
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["verdict"], "method_legacy");
    assert_eq!(report["code"], 3);
}

#[test]
fn methods_listing() {
    tool()
        .arg("methods")
        .assert()
        .success()
        .stdout(predicate::str::contains("$y$").and(predicate::str::contains("(none)")));

    let out = tool().args(["methods", "--json"]).output().unwrap();
    let list: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 20);
    assert_eq!(list[0]["prefix"], "$y$");
    assert_eq!(list[0]["strong"], true);
    assert_eq!(list[19]["prefix"], "");
}

#[test]
fn malformed_config_is_reported() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.json");
    fs::write(&config, "{not json").unwrap();
    tool()
        .arg("--config")
        .arg(&config)
        .arg("methods")
        .assert()
        .failure()
        .stderr(predicate::str::contains("parsing"));
}
