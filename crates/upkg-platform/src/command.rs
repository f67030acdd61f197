use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{Command as StdCommand, ExitStatus, Output, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

#[derive(Debug)]
pub struct Command {
    inner: StdCommand,
    program: String,
}

/// What a streamed child left behind once it exited.
#[derive(Debug)]
pub struct StreamOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
}

impl Command {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        let program = program.as_ref();
        Self {
            inner: StdCommand::new(program),
            program: program.to_string_lossy().into_owned(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.inner.arg(arg);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.inner.args(args);
        self
    }

    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.inner.env(key, val);
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.inner.envs(vars);
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.inner.current_dir(dir);
        self
    }

    pub fn capture(mut self) -> Result<Output> {
        let program = self.program.clone();
        self.inner.output().map_err(|e| spawn_error(program, e))
    }

    /// Run to completion and return trimmed stdout, failing on a non-zero exit.
    pub fn stdout_string(self) -> Result<String> {
        let program = self.program.clone();
        let output = self.capture()?;
        if !output.status.success() {
            return Err(Error::NonZeroExit {
                cmd: program,
                status: output.status,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Spawn the child, hand every stderr line to `on_stderr` as it arrives and
    /// collect stdout in full. Both pipes are drained together so a chatty
    /// child can never block on a full pipe.
    pub async fn stream<F>(self, mut on_stderr: F) -> Result<StreamOutput>
    where
        F: FnMut(&str),
    {
        let program = self.program;
        let mut cmd = tokio::process::Command::from(self.inner);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| spawn_error(program.clone(), e))?;

        let mut stdout = child.stdout.take().ok_or_else(|| Error::StreamUnavailable {
            cmd: program.clone(),
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or_else(|| Error::StreamUnavailable {
            cmd: program.clone(),
            stream: "stderr",
        })?;

        let read_stdout = async {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await?;
            Ok::<_, io::Error>(buf)
        };

        let read_stderr = async {
            let mut reader = BufReader::new(stderr);
            let mut line = Vec::new();
            loop {
                line.clear();
                if reader.read_until(b'\n', &mut line).await? == 0 {
                    break;
                }
                let text = String::from_utf8_lossy(&line);
                on_stderr(text.trim_end_matches(['\r', '\n']));
            }
            Ok::<_, io::Error>(())
        };

        let (stdout, ()) = tokio::try_join!(read_stdout, read_stderr)?;
        let status = child.wait().await?;

        Ok(StreamOutput { status, stdout })
    }
}

fn spawn_error(cmd: String, source: io::Error) -> Error {
    if source.kind() == io::ErrorKind::NotFound {
        Error::CommandNotFound { cmd }
    } else {
        Error::CommandFailed { cmd, source }
    }
}
