use assert_cmd::Command;
use bayes_junk_tool::codec::{binary, xml};
use bayes_junk_tool::{load_token_file, TokenCollection, TokenRecord};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn temp_workspace() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

fn write_dat(dir: &Path, name: &str, collection: &TokenCollection) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, binary::encode(collection)).expect("write token file");
    path
}

fn sample() -> TokenCollection {
    TokenCollection::from_records(
        12,
        8,
        vec![
            TokenRecord::new("foo", 4, 1),
            TokenRecord::new("bar", 0, 6),
            TokenRecord::new("baz", 1, 1),
        ],
    )
}

fn tool() -> Command {
    Command::cargo_bin("bayes-junk-tool").expect("binary exists")
}

#[test]
fn convert_prints_text_listing_by_default() {
    let workspace = temp_workspace();
    let input = write_dat(workspace.path(), "training.dat", &sample());

    let output = tool()
        .args(["--quiet", "convert"])
        .arg(&input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf-8 output");
    assert!(text.starts_with("Good messages: 12\nBad messages: 8\n"));
    assert!(text.contains("[bar - 0 good tokens, 6 bad tokens]"));
    assert!(text.contains("[foo - 4 good tokens, 1 bad tokens]"));
}

#[test]
fn convert_to_xml_filters_and_writes_dtd() {
    let workspace = temp_workspace();
    let input = write_dat(workspace.path(), "training.dat", &sample());
    let output = workspace.path().join("filtered");

    tool()
        .args(["--quiet", "convert"])
        .arg(&input)
        .args(["--format", "xml", "--remove-good", "2", "--remove-bad", "5", "-o"])
        .arg(&output)
        .assert()
        .success();

    let written = workspace.path().join("filtered.xml");
    assert!(written.exists(), "extension was appended");
    assert!(workspace.path().join(xml::DTD_FILE_NAME).exists());

    let back = load_token_file(&written).expect("reload xml");
    assert_eq!(back.good_message_count(), 12);
    assert!(back.contains("foo"));
    assert!(back.contains("bar"));
    assert!(!back.contains("baz"));
}

#[test]
fn merge_sums_counts_from_both_files() {
    let workspace = temp_workspace();
    let first = write_dat(workspace.path(), "a.dat", &sample());
    let other = TokenCollection::from_records(
        3,
        2,
        vec![TokenRecord::new("foo", 1, 1), TokenRecord::new("new", 2, 0)],
    );
    let second = write_dat(workspace.path(), "b.dat", &other);
    let output = workspace.path().join("merged.dat");

    tool()
        .args(["--quiet", "merge"])
        .arg(&first)
        .arg(&second)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let merged = load_token_file(&output).expect("reload merged");
    assert_eq!(merged.good_message_count(), 15);
    assert_eq!(merged.bad_message_count(), 10);
    assert_eq!(merged.get("foo"), Some(&TokenRecord::new("foo", 5, 2)));
    assert_eq!(merged.len(), 4);
}

#[test]
fn info_emits_json_summary() {
    let workspace = temp_workspace();
    let input = write_dat(workspace.path(), "training.dat", &sample());

    let output = tool()
        .args(["--quiet", "info", "--json"])
        .arg(&input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let summary: Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(summary["good_messages"], 12);
    assert_eq!(summary["tokens"], 3);
    assert_eq!(summary["good_tokens"], 2);
    assert_eq!(summary["bad_tokens"], 3);
}

#[test]
fn unreadable_input_fails_with_message() {
    let workspace = temp_workspace();
    let input = workspace.path().join("notes.txt");
    fs::write(&input, "just some text").expect("write input");

    let assert = tool().args(["--quiet", "info"]).arg(&input).assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("failed to load"), "stderr: {stderr}");
}

#[test]
fn dtd_subcommand_writes_grammar() {
    let workspace = temp_workspace();
    let path = workspace.path().join("grammar.dtd");

    tool().args(["--quiet", "dtd", "-o"]).arg(&path).assert().success();
    assert_eq!(fs::read_to_string(&path).expect("read dtd"), xml::DTD);
}

#[test]
fn rust_log_sets_the_level_without_flags() {
    let workspace = temp_workspace();
    let input = write_dat(workspace.path(), "training.dat", &sample());

    let assert = tool().env("RUST_LOG", "debug").arg("info").arg(&input).assert().success();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("DEBUG"), "stderr: {stderr}");

    let assert = tool().env("RUST_LOG", "error").arg("info").arg(&input).assert().success();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(!stderr.contains("INFO"), "stderr: {stderr}");
}

#[test]
fn quiet_flag_overrides_rust_log() {
    let workspace = temp_workspace();
    let input = write_dat(workspace.path(), "training.dat", &sample());

    let assert = tool()
        .env("RUST_LOG", "debug")
        .args(["-q", "info"])
        .arg(&input)
        .assert()
        .success();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(!stderr.contains("DEBUG"), "stderr: {stderr}");
    assert!(!stderr.contains("INFO"), "stderr: {stderr}");
}
