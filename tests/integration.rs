use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn drifter_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("drifter");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // A small checkout to scan
    let repo = root.join("repo");
    fs::create_dir_all(repo.join("src")).unwrap();
    fs::create_dir_all(repo.join(".git")).unwrap();
    fs::write(repo.join("readme.txt"), "hello").unwrap();
    fs::write(repo.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(repo.join(".git/config"), "[core]\n").unwrap();
    fs::write(repo.join("logo.png"), [0x89u8, b'P', b'N', b'G']).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/history.sqlite"

[scan]
max_chars_per_file = 20000
max_snapshot_chars = 200000

[generation]
provider = "disabled"
"#,
        root.display()
    );

    let config_path = config_dir.join("drifter.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_drifter(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = drifter_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run drifter binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_drifter(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/history.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_drifter(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_drifter(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_history_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_drifter(&config_path, &["init"]);

    let (stdout, stderr, success) = run_drifter(&config_path, &["history"]);
    assert!(success, "history failed: {}", stderr);
    assert!(stdout.contains("No history yet."));

    let (stdout, _, success) = run_drifter(&config_path, &["history", "--json"]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed, serde_json::json!([]));
}

#[test]
fn test_history_show_missing_record() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_drifter(&config_path, &["history", "show", "42"]);
    assert!(!success);
    assert!(stderr.contains("No history record with id 42"));
}

#[test]
fn test_scan_lists_kept_files() {
    let (tmp, config_path) = setup_test_env();
    let repo = tmp.path().join("repo");

    let (stdout, stderr, success) =
        run_drifter(&config_path, &["scan", repo.to_str().unwrap()]);
    assert!(success, "scan failed: {}", stderr);
    assert!(stdout.contains("readme.txt"));
    assert!(stdout.contains("src/main.rs"));
    assert!(!stdout.contains(".git"));
    assert!(!stdout.contains("logo.png"));
    assert!(stdout.contains("2 files"));
}

#[test]
fn test_scan_json_is_the_snapshot() {
    let (tmp, config_path) = setup_test_env();
    let repo = tmp.path().join("repo");

    let (stdout, _, success) =
        run_drifter(&config_path, &["scan", repo.to_str().unwrap(), "--json"]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!({ "readme.txt": "hello", "src/main.rs": "fn main() {}\n" })
    );
}

#[test]
fn test_scan_missing_directory_fails() {
    let (tmp, config_path) = setup_test_env();
    let missing = tmp.path().join("nope");

    let (_, stderr, success) = run_drifter(&config_path, &["scan", missing.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("does not exist or is not a directory"));
}

#[test]
fn test_generate_with_disabled_provider_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) =
        run_drifter(&config_path, &["generate", "https://example.com/a.git"]);
    assert!(!success);
    assert!(stderr.contains("disabled"));
}

#[test]
fn test_invalid_config_is_reported() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(&bad, "[generation]\nprovider = \"palm\"\n").unwrap();

    let (_, stderr, success) = run_drifter(&bad, &["init"]);
    assert!(!success);
    assert!(stderr.contains("palm"));
}
