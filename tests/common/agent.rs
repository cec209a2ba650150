//! In-process agent for testing.
//!
//! Agents bind to ephemeral localhost ports and shut down on drop.

use std::net::SocketAddr;
use std::sync::Arc;

use extsnmpd::config::{AgentConfig, ConfigSources};
use extsnmpd::{Agent, AgentBuilder, CommandRunner};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::runner::ScriptedRunner;

pub struct TestAgent {
    agent: Agent,
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

impl TestAgent {
    /// Agent serving `config` with commands answered by `runner`.
    pub async fn with_runner(config: &str, runner: Arc<ScriptedRunner>) -> Self {
        let runner: Arc<dyn CommandRunner> = runner;
        Self::start(
            Agent::builder()
                .config(AgentConfig::from_text(config))
                .runner(runner),
        )
        .await
    }

    /// Agent serving `config` with real processes.
    pub async fn with_processes(config: &str) -> Self {
        Self::start(Agent::builder().config(AgentConfig::from_text(config))).await
    }

    /// Agent reading (and re-reading) configuration files.
    pub async fn with_sources(sources: ConfigSources, runner: Arc<ScriptedRunner>) -> Self {
        let runner: Arc<dyn CommandRunner> = runner;
        Self::start(Agent::builder().config_sources(sources).runner(runner)).await
    }

    /// Start from a partly configured builder.
    pub async fn start(builder: AgentBuilder) -> Self {
        super::init_tracing();
        let cancel = CancellationToken::new();
        let agent = builder
            .bind("127.0.0.1:0")
            .cancel(cancel.clone())
            .build()
            .await
            .expect("failed to build test agent");

        let runner = agent.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = runner.run().await {
                eprintln!("TestAgent error: {}", e);
            }
        });

        Self {
            agent,
            cancel,
            _task: task,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.agent.local_addr()
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for TestAgent {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
