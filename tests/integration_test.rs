use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::{Matcher, Server};
use tempfile::tempdir;

fn fetch_cmd(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("resilient-fetch"));
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("RESILIENT_FETCH_TIMEOUT")
        .env_remove("RESILIENT_FETCH_USER_AGENT");
    cmd
}

#[test]
fn test_end_to_end_fetch() {
    let mut server = Server::new();
    let url = server.url();

    let mock = server
        .mock("GET", "/simple/price")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("ids".into(), "bitcoin".into()),
            Matcher::UrlEncoded("vs_currencies".into(), "usd".into()),
        ]))
        .match_header("user-agent", "CryptoIntelligenceBot/1.0")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"bitcoin": {"usd": 67000}}"#)
        .create();

    let dir = tempdir().unwrap();
    fetch_cmd(dir.path())
        .arg("-q")
        .arg("ids=bitcoin")
        .arg("-q")
        .arg("vs_currencies=usd")
        .arg(format!("{}/simple/price", url))
        .assert()
        .success()
        .stdout(predicates::str::contains("\"bitcoin\""))
        .stdout(predicates::str::contains("67000"));

    mock.assert();
}

/// Log lines written at `level` and the logger names they were written under.
fn log_lines(stderr: &[u8], level: &str) -> Vec<String> {
    let marker = format!(" - {} - ", level);
    String::from_utf8_lossy(stderr)
        .lines()
        .filter(|line| line.contains(&marker))
        .filter_map(|line| line.split(" - ").nth(1).map(str::to_string))
        .collect()
}

#[test]
fn test_log_line_format() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_body("{}")
        .create();

    let dir = tempdir().unwrap();
    let output = fetch_cmd(dir.path())
        .arg("--name")
        .arg("coingecko")
        .arg(server.url())
        .assert()
        .success()
        .stderr(predicates::str::contains(" - coingecko - INFO - Requesting"))
        .get_output()
        .clone();

    // exactly one entry before the request, nothing else
    assert_eq!(log_lines(&output.stderr, "INFO"), vec!["coingecko"]);
    assert!(log_lines(&output.stderr, "WARN").is_empty());
    assert!(log_lines(&output.stderr, "ERROR").is_empty());
}

#[test]
fn test_not_found_fails_without_retry() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/missing")
        .with_status(404)
        .expect(1)
        .create();

    let dir = tempdir().unwrap();
    let output = fetch_cmd(dir.path())
        .arg("--name")
        .arg("coingecko")
        .arg(format!("{}/missing", server.url()))
        .assert()
        .failure()
        .stderr(predicates::str::contains(" - coingecko - ERROR - HTTP error"))
        .stderr(predicates::str::contains("No result from"))
        .get_output()
        .clone();

    mock.assert();
    assert_eq!(log_lines(&output.stderr, "INFO"), vec!["coingecko"]);
    assert_eq!(log_lines(&output.stderr, "ERROR"), vec!["coingecko"]);
    assert!(log_lines(&output.stderr, "WARN").is_empty());
}

#[test]
fn test_malformed_json_fails() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_body("not-json")
        .create();

    let dir = tempdir().unwrap();
    fetch_cmd(dir.path())
        .arg(server.url())
        .assert()
        .failure()
        .stderr(predicates::str::contains("Invalid JSON"));
}

#[test]
fn test_header_override_from_cli() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/")
        .match_header("user-agent", "my-extractor/0.1")
        .match_header("x-cg-api-key", "k")
        .with_status(200)
        .with_body("[]")
        .create();

    let dir = tempdir().unwrap();
    fetch_cmd(dir.path())
        .arg("-H")
        .arg("User-Agent: my-extractor/0.1")
        .arg("-H")
        .arg("x-cg-api-key:k")
        .arg(server.url())
        .assert()
        .success()
        .stdout(predicates::str::contains("[]"));

    mock.assert();
}

#[test]
fn test_dotenv_file_is_loaded() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/")
        .match_header("user-agent", "from-dotenv/1.0")
        .with_status(200)
        .with_body(r#"{"ok": true}"#)
        .create();

    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join(".env"),
        "RESILIENT_FETCH_USER_AGENT=from-dotenv/1.0\n",
    )
    .unwrap();

    fetch_cmd(dir.path())
        .arg(server.url())
        .assert()
        .success()
        .stdout(predicates::str::contains("\"ok\": true"));

    mock.assert();
}

#[test]
fn test_malformed_dotenv_is_reported() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_body("{}")
        .create();

    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(".env"), "THIS IS NOT VALID\n").unwrap();

    let output = fetch_cmd(dir.path())
        .arg(server.url())
        .assert()
        .success()
        .stderr(predicates::str::contains("Failed to load .env file"))
        .get_output()
        .clone();

    mock.assert();
    assert_eq!(log_lines(&output.stderr, "WARN").len(), 1);
    assert_eq!(log_lines(&output.stderr, "INFO"), vec!["resilient-fetch"]);
}

#[test]
fn test_connection_refused_fails() {
    let dir = tempdir().unwrap();
    fetch_cmd(dir.path())
        .arg("--retries")
        .arg("0")
        .arg("http://127.0.0.1:9/")
        .assert()
        .failure()
        .stderr(predicates::str::contains("ERROR"));
}
