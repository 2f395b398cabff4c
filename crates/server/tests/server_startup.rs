use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a config whose helper and game executable live in `dir`
fn config_for(dir: &Path, port: u16, helper: &Path) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {port}

[services]
account_base_url = "http://127.0.0.1:9"
game_base_url = "http://127.0.0.1:9"

[credentials]
account_token = "startup-secret"

[backend]
url = "http://127.0.0.1:9/handoff"

[supervisor]
helper_path = "{helper}"
game_path = "{game}"

[orchestrator]
enabled = false
"#,
        port = port,
        helper = helper.display(),
        game = dir.join("Game.exe").display(),
    )
}

/// Create a temp install with a helper and a game executable
fn install() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("helper"), b"").unwrap();
    std::fs::write(dir.path().join("Game.exe"), b"").unwrap();
    dir
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_matchlink"))
        .env("MATCHLINK_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Run the server to completion and return whether it exited successfully
async fn run_to_exit(config_path: &Path) -> bool {
    timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_matchlink"))
            .env("MATCHLINK_CONFIG", config_path)
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command")
    .status
    .success()
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_health_and_config_endpoints() {
    let dir = install();
    let port = get_available_port();
    let config = write_config(&config_for(dir.path(), port, &dir.path().join("helper")));

    let mut server = spawn_server(config.path()).await;
    assert!(
        wait_for_server(port, 60).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let health: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(health["status"], "ok");

    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let text = response.text().await.unwrap();
    assert!(!text.contains("startup-secret"));
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["server"]["port"], port);
    assert_eq!(json["credentials"]["account_token_configured"], true);

    // Cleanup
    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    assert!(!run_to_exit(Path::new("/nonexistent/config.toml")).await);
}

#[tokio::test]
async fn test_missing_services_section_exits_with_error() {
    let config = write_config(
        r#"
[server]
port = 8080
"#,
    );

    assert!(!run_to_exit(config.path()).await);
}

#[tokio::test]
async fn test_missing_helper_exits_with_error() {
    let dir = install();
    let port = get_available_port();
    let config = write_config(&config_for(
        dir.path(),
        port,
        &dir.path().join("no-such-helper"),
    ));

    assert!(!run_to_exit(config.path()).await);
}

#[tokio::test]
async fn test_invalid_watchdog_bounds_exit_with_error() {
    let dir = install();
    let port = get_available_port();
    let content = config_for(dir.path(), port, &dir.path().join("helper")).replace(
        "game_path =",
        "watchdog_grace_ms = 90000\nwatchdog_kill_ms = 60000\ngame_path =",
    );
    let config = write_config(&content);

    assert!(!run_to_exit(config.path()).await);
}
