use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;
use upkg_core::task_pool::POOL;
use upkg_core::ui::tracker::{SpinnerTrackerBuilder, Status, Tracker, TrackerBuilder};
use upkg_platform::command::Command;

use super::ToolError;

/// A fully described run of an external executable.
#[derive(Clone)]
pub struct Invocation {
    pub program: PathBuf,
    /// Kept as OS strings so paths reach the child byte for byte.
    pub args: Vec<OsString>,
    pub env: Vec<(String, String)>,
    /// Shown next to the spinner until the tool reports progress.
    pub initial_message: String,
}

impl Invocation {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
            initial_message: String::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.initial_message = message.to_string();
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }
}

// Environment values are secrets more often than not.
impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env: Vec<_> = self.env.iter().map(|(k, _)| format!("{k}=***")).collect();
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env)
            .field("initial_message", &self.initial_message)
            .finish()
    }
}

/// Runs an invocation to completion. Every stderr line goes to `on_line`,
/// which may answer with a progress update; stdout is returned whole.
pub trait ExternalToolInvoker {
    fn run(
        &self,
        invocation: &Invocation,
        on_line: &mut dyn FnMut(&str) -> Option<Status>,
    ) -> Result<Vec<u8>, ToolError>;
}

/// Subprocess on the shared runtime with a spinner on stderr.
#[derive(Debug, Clone, Copy)]
pub struct ProgressReportingInvoker {
    interactive: bool,
}

impl ProgressReportingInvoker {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

impl Default for ProgressReportingInvoker {
    fn default() -> Self {
        Self::new(upkg_core::ui::interactive())
    }
}

impl ExternalToolInvoker for ProgressReportingInvoker {
    fn run(
        &self,
        invocation: &Invocation,
        on_line: &mut dyn FnMut(&str) -> Option<Status>,
    ) -> Result<Vec<u8>, ToolError> {
        debug!(?invocation, "running external tool");

        let cmd = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)));

        let spinner = SpinnerTrackerBuilder::default()
            .with_message(&invocation.initial_message)
            .hidden(!self.interactive)
            .build();

        let mut last_line = String::new();
        let output = POOL.block_on(cmd.stream(|line| {
            if !line.trim().is_empty() {
                last_line = line.trim().to_string();
            }
            if let Some(status) = spinner.suspend(|| on_line(line)) {
                spinner.step(status);
            }
        }));
        spinner.finish();

        let output = output.map_err(ToolError::Spawn)?;
        if !output.status.success() {
            return Err(ToolError::Exit {
                program: invocation.program_name(),
                code: output.status.code(),
                message: last_line,
            });
        }

        debug!(bytes = output.stdout.len(), "external tool finished");
        Ok(output.stdout)
    }
}
