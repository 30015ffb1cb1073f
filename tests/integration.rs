use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const REPORT: &str = "\
Tribe 0987, , Current Hex = AB 0101, (Previous Hex = AB 0102)
Current Turn 901-04 (#5), Spring, FINE\tNext Turn 901-05 (#6), 05/11/2024
Humans 1500, Warriors 200, Horses 12
Tribe Movement: Move NE-PR\\ -NE-GH
Scout 1:Scout N-PR, \\No Ford on River to S of HEX
0987 Status: PRAIRIE, River S

Courier 0987c1, , Current Hex = AB 0101, (Previous Hex = N/A)
Current Turn 901-04 (#5), Spring, FINE
Tribe Follows 0987
0987c1 Status: PRAIRIE
";

fn intake_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("intake");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let clan_dir = root.join("data").join("0987");
    for dir in ["input", "output", "logs"] {
        fs::create_dir_all(clan_dir.join(dir)).unwrap();
    }

    fs::write(root.join("0901-04.0987.report.txt"), REPORT).unwrap();

    let config_content = format!(
        r#"[storage]
root = "{}/data"

[ingest]
max_upload_bytes = 65536

[logging]
filter = "warn"
"#,
        root.display()
    );

    let config_path = config_dir.join("intake.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_intake(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = intake_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run intake binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn upload_path(tmp: &TempDir) -> String {
    tmp.path()
        .join("0901-04.0987.report.txt")
        .to_str()
        .unwrap()
        .to_string()
}

#[test]
fn test_ingest_writes_canonical_report() {
    let (tmp, config_path) = setup_test_env();
    let upload = upload_path(&tmp);

    let (stdout, stderr, success) =
        run_intake(&config_path, &["ingest", "--clan", "0987", &upload]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("unit 0987 turn 0901-04 clan 0987"));

    let written = tmp
        .path()
        .join("data/0987/input/0901-04.0987.report.txt");
    let text = fs::read_to_string(&written).unwrap();
    assert!(text.starts_with("Tribe 0987,,Current Hex = AB 0101,(Previous Hex = AB 0102)\n"));
    assert!(!text.contains("Humans"), "private lines must be scrubbed");
    assert!(text.contains("\n\nCourier 0987c1,,"));
}

#[test]
fn test_ingest_checks_upload_name() {
    let (tmp, config_path) = setup_test_env();
    let upload = upload_path(&tmp);

    let (_, _, success) = run_intake(
        &config_path,
        &["ingest", "--clan", "0987", "--name", "901-4.987.report.txt", &upload],
    );
    assert!(success);

    let (_, stderr, success) = run_intake(
        &config_path,
        &["ingest", "--clan", "0987", "--name", "901-6.987.report.txt", &upload],
    );
    assert!(!success);
    assert!(stderr.contains("file name does not match clan and turn from header"));
}

#[test]
fn test_ingest_scrubbed_variant() {
    let (tmp, config_path) = setup_test_env();
    let upload = upload_path(&tmp);

    let (stdout, stderr, success) = run_intake(
        &config_path,
        &["ingest", "--clan", "0987", "--variant", "scrubbed", &upload],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);

    let text = fs::read_to_string(
        tmp.path()
            .join("data/0987/input/0901-04.0987.scrubbed.txt"),
    )
    .unwrap();
    assert!(text.starts_with("// text file \"0901-04.0987.report.txt\"\n"));
    assert!(text.contains("// section 1\n"));
    assert!(text.contains("// section 2\nCourier 0987c1,,"));
    assert!(text.contains("// missing element status") || text.contains("0987c1 Status:"));
}

#[test]
fn test_ingest_without_input_dir_is_account_error() {
    let (tmp, config_path) = setup_test_env();
    let upload = upload_path(&tmp);
    fs::create_dir_all(tmp.path().join("data/0988")).unwrap();

    let (_, stderr, success) = run_intake(&config_path, &["ingest", "--clan", "0988", &upload]);
    assert!(!success);
    assert!(stderr.contains("your input directory is missing"));
}

#[test]
fn test_check_prints_unit_and_turn() {
    let (tmp, config_path) = setup_test_env();
    let upload = upload_path(&tmp);

    let (stdout, stderr, success) = run_intake(&config_path, &["check", &upload]);
    assert!(success, "check failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(stdout.trim(), "0987 0901-04");
}

#[test]
fn test_check_reports_header_problem() {
    let (tmp, config_path) = setup_test_env();
    let bad = tmp.path().join("bad.txt");
    fs::write(&bad, "Current Turn 901-04 (#5)\nTribe 0987,,Current Hex = AB 0101,(Previous Hex = AB 0102)\n").unwrap();

    let (_, stderr, success) = run_intake(&config_path, &["check", bad.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("first line is missing the unit"));
}

#[test]
fn test_check_rejects_out_of_range_year() {
    let (tmp, config_path) = setup_test_env();
    let bad = tmp.path().join("late.txt");
    fs::write(
        &bad,
        "Tribe 0987,,Current Hex = AB 0101,(Previous Hex = AB 0102)\nCurrent Turn 1235-01 (#5)\n",
    )
    .unwrap();

    let (_, stderr, success) = run_intake(&config_path, &["check", bad.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("year must be between 899 and 1234, found 1235"));
}

#[test]
fn test_catalog_lists_ingested_and_existing_files() {
    let (tmp, config_path) = setup_test_env();
    let upload = upload_path(&tmp);
    let clan_dir = tmp.path().join("data/0987");
    fs::write(clan_dir.join("output/0900-12.0987.wxx"), "<map/>").unwrap();
    fs::write(clan_dir.join("logs/0900-12.0987.err"), "boom").unwrap();
    fs::write(clan_dir.join("logs/README.txt"), "not a catalog file").unwrap();

    run_intake(&config_path, &["ingest", "--clan", "0987", &upload]);

    let (stdout, stderr, success) =
        run_intake(&config_path, &["catalog", "--clan", "0987", "--json"]);
    assert!(success, "catalog failed: stdout={}, stderr={}", stdout, stderr);

    let listing: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(listing["reports"][0]["name"], "0901-04.0987.report.txt");
    assert_eq!(listing["reports"][0]["kind"], "report");
    assert_eq!(listing["maps"][0]["turn"], "0900-12");
    assert_eq!(listing["error_logs"][0]["kind"], "error-log");
    assert_eq!(listing["logs"].as_array().unwrap().len(), 0);
}

#[test]
fn test_catalog_missing_clan_dir_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_intake(&config_path, &["catalog", "--clan", "0042"]);
    assert!(!success);
    assert!(stderr.contains("reading"));
}

#[test]
fn test_turns_most_recent_first() {
    let (tmp, config_path) = setup_test_env();
    let clan_dir = tmp.path().join("data/0987");
    fs::write(clan_dir.join("input/0900-11.0987.report.txt"), "x").unwrap();
    fs::write(clan_dir.join("input/0900-12.0987.report.txt"), "x").unwrap();
    fs::write(clan_dir.join("output/0900-12.0987.wxx"), "x").unwrap();

    let (stdout, stderr, success) =
        run_intake(&config_path, &["turns", "--clan", "0987", "--json"]);
    assert!(success, "turns failed: stdout={}, stderr={}", stdout, stderr);

    let groups: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let groups = groups.as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["turn"], "0900-12");
    assert_eq!(groups[0]["maps"].as_array().unwrap().len(), 1);
    assert_eq!(groups[1]["turn"], "0900-11");
}

#[test]
fn test_delete_then_turn_is_empty() {
    let (tmp, config_path) = setup_test_env();
    let clan_dir = tmp.path().join("data/0987");
    fs::write(clan_dir.join("logs/0900-12.0987.log"), "ok").unwrap();

    let (stdout, stderr, success) = run_intake(
        &config_path,
        &["delete", "--clan", "0987", "0900-12.0987.log"],
    );
    assert!(success, "delete failed: stdout={}, stderr={}", stdout, stderr);
    assert!(!clan_dir.join("logs/0900-12.0987.log").exists());

    let (stdout, _, success) = run_intake(
        &config_path,
        &["turns", "--clan", "0987", "--turn", "0900-12"],
    );
    assert!(success);
    assert!(stdout.contains("0900-12 0987: no files"));
}

#[test]
fn test_delete_rejects_non_catalog_names() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) =
        run_intake(&config_path, &["delete", "--clan", "0987", "../intake.toml"]);
    assert!(!success);
    assert!(stderr.contains("is not a catalog file name"));
}

#[test]
fn test_invalid_clan_id_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_intake(&config_path, &["catalog", "--clan", "../0987"]);
    assert!(!success);
    assert!(stderr.contains("invalid clan id"));
}

#[test]
fn test_units_lists_sections() {
    let (tmp, config_path) = setup_test_env();
    let upload = upload_path(&tmp);
    run_intake(&config_path, &["ingest", "--clan", "0987", &upload]);

    let report = tmp.path().join("data/0987/input/0901-04.0987.report.txt");
    let (stdout, stderr, success) =
        run_intake(&config_path, &["units", report.to_str().unwrap()]);
    assert!(success, "units failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["0987", "0987c1"]);
}
