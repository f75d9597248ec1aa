//! Host command execution

use rejoin_host_api::{HostError, HostResult};
use shell_escape::escape;
use std::borrow::Cow;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Upper bound for any single host command
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

/// A host command, optionally run through `su -c`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    program: String,
    args: Vec<String>,
    use_su: bool,
    timeout: Duration,
}

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout and stderr joined, trimmed
    pub fn combined(&self) -> String {
        let mut out = self.stdout.trim().to_string();
        let err = self.stderr.trim();
        if !err.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(err);
        }
        out
    }
}

impl HostCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            use_su: false,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_su(mut self, use_su: bool) -> Self {
        self.use_su = use_su;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The command as a single shell-escaped line
    pub fn shell_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| escape(Cow::Borrowed(part.as_str())).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The argv actually executed
    pub fn argv(&self) -> Vec<String> {
        if self.use_su {
            vec!["su".to_string(), "-c".to_string(), self.shell_line()]
        } else {
            std::iter::once(self.program.clone())
                .chain(self.args.iter().cloned())
                .collect()
        }
    }

    /// Run to completion and capture output. A non-zero exit is not an error here.
    pub async fn output(&self) -> HostResult<CommandOutput> {
        let argv = self.argv();
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| HostError::Internal("Empty argv".into()))?;

        debug!(command = %self.shell_line(), su = self.use_su, "Running host command");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| HostError::CommandFailed {
                program: self.program.clone(),
                code: None,
                output: format!("timed out after {}s", self.timeout.as_secs()),
            })??;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run and fail on a non-zero exit status
    pub async fn run(&self) -> HostResult<CommandOutput> {
        let output = self.output().await?;
        if !output.success() {
            return Err(HostError::CommandFailed {
                program: self.program.clone(),
                code: output.code,
                output: output.combined(),
            });
        }
        Ok(output)
    }
}
