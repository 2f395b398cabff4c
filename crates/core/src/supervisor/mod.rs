//! Game client process supervision.
//!
//! The supervisor writes a launch options file, starts the process-manager
//! helper, and races three signals for the client PID:
//! - a `RESULT:{"clientPid":n}` line on helper stdout
//! - a `PID:<n>` marker in helper stdout once the helper exits
//! - an OS process query by executable name
//!
//! The first signal wins. A watchdog keyed by launch id asks the orchestrator
//! to wind down at the grace mark and kills everything at the hard limit.

mod config;
mod error;
mod process_table;
mod runner;
mod traits;
mod types;

pub use config::SupervisorConfig;
pub use error::SupervisorError;
pub use process_table::{parse_pgrep_output, parse_tasklist_csv, ProcessTable, SystemProcessTable};
pub use runner::ProcessSupervisor;
pub use traits::{GameProcess, GraceHook, ProcessControl};
pub use types::{LaunchOptions, LaunchedProcess, PidCell, PidSource, SupervisorStatus};
