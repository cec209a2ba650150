//! extsnmpd: SNMP agent daemon with an extensible MIB.
//!
//! `SIGHUP` re-reads the configuration; `SIGINT` and `SIGTERM` stop the
//! agent.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use extsnmpd::Agent;
use extsnmpd::cli::{DaemonArgs, directive_help};

#[tokio::main]
async fn main() -> ExitCode {
    let args = DaemonArgs::parse();

    if args.config_help {
        print!("{}", directive_help());
        return ExitCode::SUCCESS;
    }

    args.init_tracing();

    let agent = match args.agent_builder().build().await {
        Ok(agent) => agent,
        Err(e) => {
            tracing::error!(target: "extsnmpd", { error = %e }, "cannot start agent");
            return ExitCode::FAILURE;
        }
    };

    let pid_file = match args.pid_file.as_deref().map(PidFile::create).transpose() {
        Ok(pid_file) => pid_file,
        Err(e) => {
            tracing::error!(target: "extsnmpd", { error = %e }, "cannot write pid file");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = spawn_signal_handlers(&agent) {
        tracing::error!(target: "extsnmpd", { error = %e }, "cannot install signal handlers");
        return ExitCode::FAILURE;
    }

    let result = agent.run().await;
    drop(pid_file);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(target: "extsnmpd", { error = %e }, "agent failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(unix)]
fn spawn_signal_handlers(agent: &Agent) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    let agent = agent.clone();
    let cancel = agent.cancel();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = hangup.recv() => {
                    tracing::info!(target: "extsnmpd", "SIGHUP received, reconfiguring");
                    // failures are logged by the agent; the old configuration stays
                    let _ = agent.reconfigure();
                }
                _ = terminate.recv() => break,
                _ = interrupt.recv() => break,
                _ = cancel.cancelled() => return,
            }
        }
        tracing::info!(target: "extsnmpd", "received TERM or INT signal, shutting down");
        cancel.cancel();
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_signal_handlers(agent: &Agent) -> std::io::Result<()> {
    let cancel = agent.cancel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
    Ok(())
}

/// Pid file removed again when dropped.
struct PidFile {
    path: PathBuf,
}

impl PidFile {
    fn create(path: &Path) -> std::io::Result<Self> {
        std::fs::write(path, format!("{}\n", std::process::id()))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(target: "extsnmpd", { path = %self.path.display(), error = %e }, "cannot remove pid file");
        }
    }
}
