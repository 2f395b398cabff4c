//! OS process table access.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::SupervisorError;

/// Queries and signals processes by PID or executable name.
#[async_trait]
pub trait ProcessTable: Send + Sync {
    /// PID of a running process with this executable name, if any.
    async fn find_by_name(&self, executable: &str) -> Result<Option<u32>, SupervisorError>;

    /// Whether a process with this PID is alive.
    async fn is_alive(&self, pid: u32) -> bool;

    /// Forcefully terminate a process. A process that is already gone is not an error.
    async fn kill(&self, pid: u32) -> Result<(), SupervisorError>;
}

/// Process table backed by the platform's process tools
/// (`tasklist`/`taskkill` on Windows, `pgrep`/`kill` elsewhere).
#[derive(Debug, Default, Clone)]
pub struct SystemProcessTable;

impl SystemProcessTable {
    pub fn new() -> Self {
        Self
    }
}

async fn run(program: &str, args: &[&str]) -> Result<std::process::Output, SupervisorError> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| SupervisorError::ProcessQuery(format!("{}: {}", program, e)))
}

#[cfg(windows)]
#[async_trait]
impl ProcessTable for SystemProcessTable {
    async fn find_by_name(&self, executable: &str) -> Result<Option<u32>, SupervisorError> {
        let filter = format!("IMAGENAME eq {}", executable);
        let output = run("tasklist", &["/FI", &filter, "/FO", "CSV", "/NH"]).await?;
        Ok(parse_tasklist_csv(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn is_alive(&self, pid: u32) -> bool {
        let filter = format!("PID eq {}", pid);
        match run("tasklist", &["/FI", &filter, "/FO", "CSV", "/NH"]).await {
            Ok(output) => parse_tasklist_csv(&String::from_utf8_lossy(&output.stdout)) == Some(pid),
            Err(_) => false,
        }
    }

    async fn kill(&self, pid: u32) -> Result<(), SupervisorError> {
        let pid_arg = pid.to_string();
        let output = run("taskkill", &["/F", "/T", "/PID", &pid_arg]).await?;
        if !output.status.success() {
            debug!(pid, "taskkill reported failure, process likely gone");
        }
        Ok(())
    }
}

#[cfg(not(windows))]
#[async_trait]
impl ProcessTable for SystemProcessTable {
    async fn find_by_name(&self, executable: &str) -> Result<Option<u32>, SupervisorError> {
        let output = run("pgrep", &["-x", executable]).await?;
        Ok(parse_pgrep_output(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn is_alive(&self, pid: u32) -> bool {
        let pid_arg = pid.to_string();
        match run("kill", &["-0", &pid_arg]).await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    async fn kill(&self, pid: u32) -> Result<(), SupervisorError> {
        let pid_arg = pid.to_string();
        let output = run("kill", &["-9", &pid_arg]).await?;
        if !output.status.success() {
            debug!(pid, "kill reported failure, process likely gone");
        }
        Ok(())
    }
}

/// First PID in `pgrep` output.
pub fn parse_pgrep_output(output: &str) -> Option<u32> {
    output
        .lines()
        .find_map(|line| line.trim().parse::<u32>().ok())
}

/// First PID in `tasklist /FO CSV /NH` output.
///
/// Rows look like `"Game.exe","1234","Console","1","120,000 K"`; when nothing
/// matches, tasklist prints an informational line instead.
pub fn parse_tasklist_csv(output: &str) -> Option<u32> {
    output.lines().find_map(|line| {
        let mut fields = line.split("\",\"");
        let _name = fields.next()?;
        fields.next()?.trim_matches('"').parse::<u32>().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pgrep_output() {
        assert_eq!(parse_pgrep_output("4242\n4243\n"), Some(4242));
        assert_eq!(parse_pgrep_output(""), None);
        assert_eq!(parse_pgrep_output("\n  \n"), None);
    }

    #[test]
    fn test_parse_tasklist_csv() {
        let output = "\"Game.exe\",\"1234\",\"Console\",\"1\",\"120,000 K\"\r\n";
        assert_eq!(parse_tasklist_csv(output), Some(1234));
    }

    #[test]
    fn test_parse_tasklist_no_match() {
        let output = "INFO: No tasks are running which match the specified criteria.\r\n";
        assert_eq!(parse_tasklist_csv(output), None);
    }
}
