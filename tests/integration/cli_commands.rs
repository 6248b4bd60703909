#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

fn demo_data() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join("data")
}

/// Command isolated from any user config file.
fn bookrec(config_dir: &TempDir) -> Command {
    let config = config_dir.path().join("config.toml");
    if !config.exists() {
        fs::write(&config, "").expect("write empty config");
    }
    let mut cmd = cargo_bin_cmd!("bookrec");
    cmd.env("BOOKREC_CONFIG", &config).env_remove("RUST_LOG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("valid json")
}

fn titles(results: &Value) -> Vec<String> {
    results
        .as_array()
        .expect("results array")
        .iter()
        .map(|r| r["title"].as_str().expect("title").to_string())
        .collect()
}

#[test]
fn recommend_json_lists_similar_books() {
    let config = TempDir::new().expect("tempdir");
    let json = json_stdout(
        bookrec(&config)
            .args(["--format", "json", "--data-dir"])
            .arg(demo_data())
            .args(["recommend", "dune", "-n", "3"]),
    );
    assert_eq!(json["query"], "dune");
    assert_eq!(json["matched"], "Dune");
    assert_eq!(
        titles(&json["results"]),
        vec!["Ender's Game", "The Red Tent", "Girl with a Pearl Earring"]
    );
    assert_eq!(json["results"][0]["author"], "Orson Scott Card");
    assert_eq!(json["results"][0]["score"], 0.807936);
    assert!(json["results"][0]["image"].is_null());
}

#[test]
fn recommend_text_resolves_misspelling() {
    let config = TempDir::new().expect("tempdir");
    let output = bookrec(&config)
        .arg("--data-dir")
        .arg(demo_data())
        .args(["--color", "never", "recommend", "the hobit", "-n", "2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.contains("matched: The Hobbit"), "{text}");
    assert!(text.contains("1. Harry Potter and the Chamber of Secrets (Book 2)"));
    assert!(text.contains("2. Harry Potter and the Sorcerer's Stone (Book 1)"));
    assert!(!text.contains("Fellowship"));
}

#[test]
fn recommend_without_match_succeeds_with_notice() {
    let config = TempDir::new().expect("tempdir");
    let output = bookrec(&config)
        .arg("--data-dir")
        .arg(demo_data())
        .args(["recommend", "xyzzy qqq"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("No matches found"));

    let json = json_stdout(
        bookrec(&config)
            .args(["--format", "json", "--data-dir"])
            .arg(demo_data())
            .args(["recommend", "   "]),
    );
    assert!(json["matched"].is_null());
    assert_eq!(json["results"].as_array().map(Vec::len), Some(0));
}

#[test]
fn stats_reports_table_consistency() {
    let config = TempDir::new().expect("tempdir");
    let json = json_stdout(
        bookrec(&config)
            .args(["--format", "json", "--data-dir"])
            .arg(demo_data())
            .arg("stats"),
    );
    assert_eq!(json["titles"], 25);
    assert_eq!(json["matrix_dimension"], 25);
    assert_eq!(json["catalog_records"], 28);
    assert_eq!(json["catalog_titles"], 26);
    assert_eq!(json["indexed_without_catalog"], 0);
    assert_eq!(json["catalog_without_index"], 1);
    assert_eq!(json["popular_books"], 50);
}

#[test]
fn popular_respects_limit() {
    let config = TempDir::new().expect("tempdir");
    let json = json_stdout(
        bookrec(&config)
            .args(["--format", "json", "--data-dir"])
            .arg(demo_data())
            .args(["popular", "--limit", "3"]),
    );
    let books = json.as_array().expect("array");
    assert_eq!(books.len(), 3);
    assert_eq!(books[0]["title"], "Summer Sisters");
    assert_eq!(books[0]["rating_count"], 2495);
}

#[test]
fn config_file_supplies_data_dir() {
    let config = TempDir::new().expect("tempdir");
    let contents = format!(
        "[data]\ndir = {:?}\n",
        demo_data().to_str().expect("utf8 path")
    );
    fs::write(config.path().join("config.toml"), contents).expect("write config");
    let json = json_stdout(bookrec(&config).args(["--format", "json", "stats"]));
    assert_eq!(json["titles"], 25);
}

#[test]
fn missing_artifacts_fail_at_startup() {
    let config = TempDir::new().expect("tempdir");
    let empty = TempDir::new().expect("tempdir");
    let output = bookrec(&config)
        .arg("--data-dir")
        .arg(empty.path())
        .args(["recommend", "dune"])
        .assert()
        .failure()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8_lossy(&output);
    assert!(stderr.contains("error: failed to read"), "{stderr}");
    assert!(stderr.contains("similarity.csv"));
}

#[test]
fn misaligned_similarity_table_is_rejected() {
    let config = TempDir::new().expect("tempdir");
    let data = TempDir::new().expect("tempdir");
    fs::write(
        data.path().join("similarity.csv"),
        "Book-Title,Dune,Emma\nEmma,1,0.2\nDune,0.2,1\n",
    )
    .expect("write similarity");
    fs::copy(demo_data().join("books.csv"), data.path().join("books.csv")).expect("copy books");
    fs::copy(demo_data().join("popular.csv"), data.path().join("popular.csv"))
        .expect("copy popular");
    let output = bookrec(&config)
        .arg("--data-dir")
        .arg(data.path())
        .arg("stats")
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("does not match column title"));
}

#[test]
fn completions_do_not_need_data() {
    let config = TempDir::new().expect("tempdir");
    let output = bookrec(&config)
        .args(["--data-dir", "/nonexistent", "completions", "bash"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("bookrec"));
}
