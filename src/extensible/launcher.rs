//! Running external commands.
//!
//! Handlers never spawn processes themselves; they go through a
//! [`CommandRunner`], so tests can script outputs without touching the OS.

use std::fmt;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::mib::BoxFuture;

use super::entry::CommandKind;

/// Longest line reported from command output, in bytes.
pub const STRMAX: usize = 1024;

/// Most stdout captured from one run. The rest is read and discarded.
pub const MAX_CAPTURE: usize = 64 * 1024;

/// Deadline used when the configuration sets none.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(10);

/// A command ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Run as `/bin/sh -c <script>`.
    Shell(String),
    /// Run `program` directly with `args`.
    Exec { program: String, args: Vec<String> },
}

impl CommandLine {
    /// Build from configured command text.
    pub fn new(kind: CommandKind, text: &str) -> Self {
        match kind {
            CommandKind::Shell => CommandLine::Shell(text.to_owned()),
            CommandKind::Exec => {
                let mut words = text.split_whitespace().map(str::to_owned);
                let program = words.next().unwrap_or_default();
                CommandLine::Exec {
                    program,
                    args: words.collect(),
                }
            }
        }
    }

    /// Append arguments. Shell scripts get them quoted onto the script.
    pub fn with_args<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match &mut self {
            CommandLine::Shell(script) => {
                for arg in extra {
                    script.push(' ');
                    script.push_str(&shell_quote(&arg.into()));
                }
            }
            CommandLine::Exec { args, .. } => args.extend(extra.into_iter().map(Into::into)),
        }
        self
    }

    fn is_empty(&self) -> bool {
        match self {
            CommandLine::Shell(script) => script.trim().is_empty(),
            CommandLine::Exec { program, .. } => program.is_empty(),
        }
    }

    fn to_command(&self) -> Command {
        match self {
            CommandLine::Shell(script) => {
                let mut cmd = Command::new("/bin/sh");
                cmd.arg("-c").arg(script);
                cmd
            }
            CommandLine::Exec { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Shell(script) => f.write_str(script),
            CommandLine::Exec { program, args } => {
                f.write_str(program)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
        }
    }
}

fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Exit status and captured stdout of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `-1` when the command could not be run or was killed.
    pub status: i32,
    pub stdout: String,
}

impl CommandOutput {
    pub fn new(status: i32, stdout: impl Into<String>) -> Self {
        Self {
            status,
            stdout: stdout.into(),
        }
    }

    /// Output of a command that never produced any.
    pub fn failed() -> Self {
        Self::new(-1, String::new())
    }

    /// Did the command fail to run at all?
    pub fn is_failure(&self) -> bool {
        self.status == -1 && self.stdout.is_empty()
    }

    /// First line of output, empty if there was none.
    pub fn first_line(&self) -> &str {
        self.line(1).unwrap_or("")
    }

    /// Line `n` (1-based) of output, without its terminator and cut to
    /// [`STRMAX`] bytes.
    pub fn line(&self, n: u32) -> Option<&str> {
        let index = usize::try_from(n.checked_sub(1)?).ok()?;
        self.stdout.lines().nth(index).map(truncate_line)
    }
}

fn truncate_line(line: &str) -> &str {
    if line.len() <= STRMAX {
        return line;
    }
    let mut end = STRMAX;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Runs commands on behalf of the extensible handlers.
pub trait CommandRunner: Send + Sync {
    /// Run `command`, giving up after `deadline`.
    ///
    /// Never fails: a command that cannot be launched, or that overruns its
    /// deadline, yields [`CommandOutput::failed`].
    fn run<'a>(
        &'a self,
        command: &'a CommandLine,
        deadline: Duration,
    ) -> BoxFuture<'a, CommandOutput>;
}

/// [`CommandRunner`] backed by `tokio::process`.
///
/// Children are killed if they outlive their deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }

    async fn launch(command: &CommandLine, deadline: Duration) -> io::Result<Option<CommandOutput>> {
        if command.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
        }

        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stdout not captured"))?;

        let capture = async {
            let mut captured = Vec::new();
            (&mut stdout)
                .take(MAX_CAPTURE as u64)
                .read_to_end(&mut captured)
                .await?;
            // keep draining so the child never blocks on a full pipe
            tokio::io::copy(&mut stdout, &mut tokio::io::sink()).await?;
            let status = child.wait().await?;
            Ok::<_, io::Error>((status, captured))
        };

        match tokio::time::timeout(deadline, capture).await {
            Ok(result) => {
                let (status, captured) = result?;
                Ok(Some(CommandOutput::new(
                    exit_code(status),
                    String::from_utf8_lossy(&captured),
                )))
            }
            Err(_) => Ok(None),
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

impl CommandRunner for ProcessLauncher {
    fn run<'a>(
        &'a self,
        command: &'a CommandLine,
        deadline: Duration,
    ) -> BoxFuture<'a, CommandOutput> {
        Box::pin(async move {
            match Self::launch(command, deadline).await {
                Ok(Some(output)) => {
                    tracing::trace!(target: "extsnmpd::exec", { exec.command = %command, exec.status = output.status, bytes = output.stdout.len() }, "command finished");
                    output
                }
                Ok(None) => {
                    tracing::warn!(target: "extsnmpd::exec", { exec.command = %command, timeout = ?deadline }, "command timed out, killed");
                    CommandOutput::failed()
                }
                Err(error) => {
                    tracing::warn!(target: "extsnmpd::exec", { exec.command = %command, error = %error }, "cannot run command");
                    CommandOutput::failed()
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_command_line_splits_words() {
        let line = CommandLine::new(CommandKind::Exec, "  /usr/bin/check  -q  disk ");
        assert_eq!(
            line,
            CommandLine::Exec {
                program: "/usr/bin/check".into(),
                args: vec!["-q".into(), "disk".into()],
            }
        );
        assert_eq!(line.to_string(), "/usr/bin/check -q disk");
    }

    #[test]
    fn shell_args_are_quoted() {
        let line = CommandLine::new(CommandKind::Shell, "/opt/pass.sh")
            .with_args(["-s", "1.3.6.1", "string", "it's here"]);
        assert_eq!(
            line.to_string(),
            r"/opt/pass.sh '-s' '1.3.6.1' 'string' 'it'\''s here'"
        );
    }

    #[test]
    fn output_lines_are_one_based() {
        let out = CommandOutput::new(0, "first\nsecond\r\nthird");
        assert_eq!(out.first_line(), "first");
        assert_eq!(out.line(2), Some("second"));
        assert_eq!(out.line(3), Some("third"));
        assert_eq!(out.line(4), None);
        assert_eq!(out.line(0), None);
        assert_eq!(CommandOutput::failed().first_line(), "");
    }

    #[test]
    fn long_lines_are_truncated() {
        let out = CommandOutput::new(0, "é".repeat(STRMAX));
        let line = out.first_line();
        assert!(line.len() <= STRMAX);
        assert_eq!(line.len(), STRMAX);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_real_processes() {
        let launcher = ProcessLauncher::new();
        let ok = launcher
            .run(&CommandLine::new(CommandKind::Exec, "/bin/true"), DEFAULT_EXEC_TIMEOUT)
            .await;
        assert_eq!(ok.status, 0);

        let fail = launcher
            .run(&CommandLine::new(CommandKind::Exec, "/bin/false"), DEFAULT_EXEC_TIMEOUT)
            .await;
        assert_ne!(fail.status, 0);

        let echo = launcher
            .run(
                &CommandLine::new(CommandKind::Shell, "echo one; echo two"),
                DEFAULT_EXEC_TIMEOUT,
            )
            .await;
        assert_eq!(echo.status, 0);
        assert_eq!(echo.line(2), Some("two"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_program_and_timeout_fail() {
        let launcher = ProcessLauncher::new();
        let missing = launcher
            .run(
                &CommandLine::new(CommandKind::Exec, "/nonexistent/extsnmpd-missing"),
                DEFAULT_EXEC_TIMEOUT,
            )
            .await;
        assert_eq!(missing, CommandOutput::failed());

        let slow = launcher
            .run(
                &CommandLine::new(CommandKind::Shell, "sleep 5"),
                Duration::from_millis(100),
            )
            .await;
        assert_eq!(slow, CommandOutput::failed());

        let empty = launcher
            .run(&CommandLine::new(CommandKind::Exec, ""), DEFAULT_EXEC_TIMEOUT)
            .await;
        assert_eq!(empty, CommandOutput::failed());
    }
}
