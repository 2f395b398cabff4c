//! Process supervisor configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the process supervisor and the game launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Path to the process-manager helper binary.
    pub helper_path: PathBuf,

    /// Arguments passed to the helper before the options file path.
    #[serde(default)]
    pub helper_args: Vec<String>,

    /// Where the launch options file is written for the helper.
    #[serde(default = "default_options_path")]
    pub options_path: PathBuf,

    /// Path to the game client executable.
    pub game_path: PathBuf,

    /// Executable name used for OS process queries.
    /// Defaults to the file name of `game_path`.
    #[serde(default)]
    pub executable_name: Option<String>,

    /// Opaque launch arguments passed through to the game client.
    #[serde(default = "default_launch_args")]
    pub launch_args: Vec<String>,

    /// Template of the argument carrying the exchange code (`{code}` is replaced).
    #[serde(default = "default_exchange_arg")]
    pub exchange_arg: String,

    /// Auto-terminate budget requested from the helper (seconds).
    #[serde(default = "default_auto_terminate")]
    pub auto_terminate_secs: u64,

    /// How long a launch may take to report a PID (milliseconds).
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_ms: u64,

    /// Minimum time before a failed helper exit fails the launch (milliseconds).
    #[serde(default = "default_helper_settle")]
    pub helper_settle_ms: u64,

    /// Interval of the by-name process query during a launch (milliseconds).
    #[serde(default = "default_query_interval")]
    pub process_query_interval_ms: u64,

    /// When the watchdog asks the orchestrator to wind down (milliseconds).
    #[serde(default = "default_watchdog_grace")]
    pub watchdog_grace_ms: u64,

    /// When the watchdog kills everything (milliseconds).
    #[serde(default = "default_watchdog_kill")]
    pub watchdog_kill_ms: u64,

    /// Poll interval while waiting for the client to come up (milliseconds).
    #[serde(default = "default_ready_poll")]
    pub ready_poll_interval_ms: u64,
}

impl SupervisorConfig {
    /// Executable name for process queries.
    pub fn executable_name(&self) -> String {
        self.executable_name.clone().unwrap_or_else(|| {
            self.game_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        })
    }

    /// Full argument vector for a launch with `code`.
    pub fn build_arguments(&self, code: &str) -> Vec<String> {
        let mut args = self.launch_args.clone();
        args.push(self.exchange_arg.replace("{code}", code));
        args
    }

    /// Minimal config for tests and defaults.
    pub fn new(helper_path: impl Into<PathBuf>, game_path: impl Into<PathBuf>) -> Self {
        Self {
            helper_path: helper_path.into(),
            helper_args: Vec::new(),
            options_path: default_options_path(),
            game_path: game_path.into(),
            executable_name: None,
            launch_args: default_launch_args(),
            exchange_arg: default_exchange_arg(),
            auto_terminate_secs: default_auto_terminate(),
            launch_timeout_ms: default_launch_timeout(),
            helper_settle_ms: default_helper_settle(),
            process_query_interval_ms: default_query_interval(),
            watchdog_grace_ms: default_watchdog_grace(),
            watchdog_kill_ms: default_watchdog_kill(),
            ready_poll_interval_ms: default_ready_poll(),
        }
    }
}

fn default_options_path() -> PathBuf {
    std::env::temp_dir().join("matchlink-launch.json")
}

fn default_launch_args() -> Vec<String> {
    vec!["-AUTH_TYPE=exchangecode".to_string()]
}

fn default_exchange_arg() -> String {
    "-AUTH_PASSWORD={code}".to_string()
}

fn default_auto_terminate() -> u64 {
    60
}

fn default_launch_timeout() -> u64 {
    40_000 // 40 seconds
}

fn default_helper_settle() -> u64 {
    5_000 // 5 seconds
}

fn default_query_interval() -> u64 {
    1_000
}

fn default_watchdog_grace() -> u64 {
    30_000 // 30 seconds
}

fn default_watchdog_kill() -> u64 {
    60_000 // 60 seconds
}

fn default_ready_poll() -> u64 {
    500
}
