//! The SNMP agent.
//!
//! Listens on UDP, decodes SNMPv1/v2c community messages and answers GET,
//! GETNEXT, GETBULK and SET from a [`SubtreeTable`] built out of the system
//! group, the extensible table and the registered `exec`/`sh`/`pass`
//! entries.
//!
//! # Snapshots
//!
//! Every request works on one [`Arc`]'d view of the MIB for its whole
//! lifetime. [`Agent::reconfigure`] re-reads the configuration, builds a new
//! view next to the old one and swaps it in; requests already in flight
//! finish on the view they started with. If the rebuild fails the old view
//! stays in service.
//!
//! # Example
//!
//! ```rust,no_run
//! use extsnmpd::agent::Agent;
//! use extsnmpd::config::AgentConfig;
//!
//! # async fn example() -> Result<(), Box<extsnmpd::Error>> {
//! let config = AgentConfig::from_text("exec 1.3.6.1.4.1.2021.50 updown /bin/true\n");
//!
//! let agent = Agent::builder()
//!     .bind("127.0.0.1:1161")
//!     .config(config)
//!     .build()
//!     .await?;
//!
//! agent.run().await
//! # }
//! ```

mod addresses;
mod request;
mod set;

use std::io::IoSliceMut;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use bytes::Bytes;
use quinn_udp::{RecvMeta, Transmit, UdpSockRef, UdpSocketState};
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::config::{AgentConfig, ConfigSources, DEFAULT_PORT};
use crate::error::{Error, Result};
use crate::extensible::{CommandRunner, ExtensibleSchemas, ProcessLauncher, Registry};
use crate::mib::{SubtreeTable, SystemGroup};
use crate::util::bind_udp_socket;

use addresses::AddressLog;

/// Default maximum message size (Ethernet MTU minus IP/UDP headers).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1472;

/// Default bound on requests handled at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 64;

/// Where the agent's configuration comes from.
#[derive(Debug, Clone)]
enum ConfigOrigin {
    /// Given directly; reconfiguration rebuilds from the same value.
    Inline(AgentConfig),
    /// Read from files; reconfiguration reads them again.
    Files(ConfigSources),
}

impl ConfigOrigin {
    /// Load, then apply settings that override the configuration files.
    fn load(&self, exec_timeout: Option<Duration>) -> Result<AgentConfig> {
        let mut config = match self {
            ConfigOrigin::Inline(config) => config.clone(),
            ConfigOrigin::Files(sources) => sources.load()?,
        };
        if let Some(timeout) = exec_timeout {
            config.exec.timeout = timeout;
        }
        Ok(config)
    }
}

/// Builder for [`Agent`].
///
/// Defaults:
/// - Bind address: `agentaddress` from the configuration, else `0.0.0.0:161`
/// - Configuration: [`ConfigSources::default`] (the system `snmpd.conf`)
/// - Command runner: [`ProcessLauncher`]
/// - Max message size: 1472 bytes
/// - Max concurrent requests: 64
/// - Receive buffer: 1 MiB (requested from the kernel)
pub struct AgentBuilder {
    bind_addr: Option<String>,
    origin: ConfigOrigin,
    runner: Option<Arc<dyn CommandRunner>>,
    exec_timeout: Option<Duration>,
    max_message_size: usize,
    max_concurrent_requests: usize,
    recv_buffer_size: Option<usize>,
    log_addresses: bool,
    cancel: Option<CancellationToken>,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: None,
            origin: ConfigOrigin::Files(ConfigSources::default()),
            runner: None,
            exec_timeout: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT,
            recv_buffer_size: Some(1024 * 1024),
            log_addresses: false,
            cancel: None,
        }
    }

    /// Set the UDP bind address, overriding any `agentaddress` directive.
    ///
    /// Binding port 161 usually needs elevated privileges.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = Some(addr.into());
        self
    }

    /// Serve a fixed configuration instead of reading files.
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.origin = ConfigOrigin::Inline(config);
        self
    }

    /// Read configuration from `sources`, now and on every
    /// [`Agent::reconfigure`].
    pub fn config_sources(mut self, sources: ConfigSources) -> Self {
        self.origin = ConfigOrigin::Files(sources);
        self
    }

    /// Replace the process launcher used by the extensible handlers.
    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Deadline for launched commands, overriding `exectimeout`.
    pub fn exec_timeout(mut self, timeout: Duration) -> Self {
        self.exec_timeout = Some(timeout);
        self
    }

    /// Largest response the agent will send. GETBULK stops adding varbinds
    /// before crossing it; any other response that would is answered with
    /// `tooBig`.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Requests beyond this limit wait for a slot.
    pub fn max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = limit.max(1);
        self
    }

    /// Requested socket receive buffer size; `None` keeps the kernel default.
    pub fn recv_buffer_size(mut self, size: Option<usize>) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Log each new source address once (see `-a`).
    pub fn log_addresses(mut self, enabled: bool) -> Self {
        self.log_addresses = enabled;
        self
    }

    /// Set a cancellation token for graceful shutdown.
    ///
    /// If not set, the agent creates its own, available from
    /// [`Agent::cancel`].
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Load the configuration, build the MIB and bind the socket.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an unreadable configuration file or a bad bind
    /// address, [`Error::Allocation`] if the subtree table cannot be built,
    /// and [`Error::Network`] if the socket cannot be bound.
    pub async fn build(self) -> Result<Agent> {
        let config = self.origin.load(self.exec_timeout)?;

        let bind_addr: SocketAddr = match &self.bind_addr {
            Some(text) => text
                .parse()
                .map_err(|_| Error::config(format!("invalid bind address: {}", text)).boxed())?,
            None => config
                .listen
                .unwrap_or(SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))),
        };

        let runner = self
            .runner
            .unwrap_or_else(|| Arc::new(ProcessLauncher::new()));
        let view = MibView::build(&config, &runner)?;

        let socket = bind_udp_socket(bind_addr, self.recv_buffer_size)
            .await
            .map_err(|e| Error::Network {
                target: bind_addr,
                source: e,
            })?;
        let local_addr = socket.local_addr().map_err(|e| Error::Network {
            target: bind_addr,
            source: e,
        })?;
        let socket_state =
            UdpSocketState::new(UdpSockRef::from(&socket)).map_err(|e| Error::Network {
                target: bind_addr,
                source: e,
            })?;

        tracing::info!(target: "extsnmpd::agent", {
            snmp.local_addr = %local_addr,
            subtrees = view.table.len()
        }, "agent ready");

        Ok(Agent {
            inner: Arc::new(AgentInner {
                socket: Arc::new(socket),
                socket_state,
                local_addr,
                origin: self.origin,
                exec_timeout: self.exec_timeout,
                runner,
                view: RwLock::new(Arc::new(view)),
                set_lock: tokio::sync::Mutex::new(()),
                max_message_size: self.max_message_size,
                concurrency_limit: Arc::new(Semaphore::new(self.max_concurrent_requests)),
                addresses: self.log_addresses.then(|| Mutex::new(AddressLog::new())),
                cancel: self.cancel.unwrap_or_default(),
            }),
        })
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One consistent picture of the MIB.
pub(crate) struct MibView {
    pub(crate) table: SubtreeTable,
    pub(crate) registry: Arc<Registry>,
    pub(crate) system: SystemGroup,
}

impl MibView {
    fn build(config: &AgentConfig, runner: &Arc<dyn CommandRunner>) -> Result<Self> {
        let registry = Arc::new(config.registry.clone());
        let schemas =
            ExtensibleSchemas::new(registry.clone(), runner.clone(), config.exec.clone());
        let system = SystemGroup::new(&config.system);

        let statics = [system.subtree(), schemas.table_subtree()];
        let table = SubtreeTable::build(&statics, &registry, &schemas)?;

        Ok(Self {
            table,
            registry,
            system,
        })
    }
}

pub(crate) struct AgentInner {
    pub(crate) socket: Arc<UdpSocket>,
    pub(crate) socket_state: UdpSocketState,
    pub(crate) local_addr: SocketAddr,
    origin: ConfigOrigin,
    exec_timeout: Option<Duration>,
    runner: Arc<dyn CommandRunner>,
    view: RwLock<Arc<MibView>>,
    /// Held for the whole of a SET so phases of two requests never interleave.
    pub(crate) set_lock: tokio::sync::Mutex<()>,
    pub(crate) max_message_size: usize,
    concurrency_limit: Arc<Semaphore>,
    addresses: Option<Mutex<AddressLog>>,
    pub(crate) cancel: CancellationToken,
}

/// SNMP agent.
///
/// Cheap to clone; clones share the socket and the current MIB view.
#[derive(Clone)]
pub struct Agent {
    pub(crate) inner: Arc<AgentInner>,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Call `cancel()` on the returned token to stop [`Agent::run`].
    pub fn cancel(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// The subtree table currently served.
    pub fn table(&self) -> SubtreeTable {
        self.view().table.clone()
    }

    /// The registry the current table was built from.
    pub fn registry(&self) -> Arc<Registry> {
        self.view().registry.clone()
    }

    /// Hundredths of a second since the current view was built.
    pub fn uptime(&self) -> u32 {
        self.view().system.uptime()
    }

    pub(crate) fn view(&self) -> Arc<MibView> {
        self.inner
            .view
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-read the configuration and swap in a freshly built MIB.
    ///
    /// The registry is rebuilt from scratch, so entries removed from the
    /// configuration disappear and instance numbers are reassigned. Values
    /// written to the system group are reset. A changed `agentaddress` only
    /// takes effect on restart.
    ///
    /// # Errors
    ///
    /// Any load or build error. The previous view stays in service.
    pub fn reconfigure(&self) -> Result<()> {
        let view = self
            .inner
            .origin
            .load(self.inner.exec_timeout)
            .and_then(|config| MibView::build(&config, &self.inner.runner));

        match view {
            Ok(view) => {
                let subtrees = view.table.len();
                *self
                    .inner
                    .view
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Arc::new(view);
                tracing::info!(target: "extsnmpd::agent", { subtrees = subtrees }, "reconfigured");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(target: "extsnmpd::agent", { error = %e }, "reconfiguration failed, keeping previous configuration");
                Err(e)
            }
        }
    }

    /// Run the agent until the cancellation token fires.
    ///
    /// Each datagram is handled on its own task, at most
    /// `max_concurrent_requests` at a time.
    #[instrument(skip(self), err, fields(snmp.local_addr = %self.local_addr()))]
    pub async fn run(&self) -> Result<()> {
        let mut buf = vec![0u8; 65535];
        let mut housekeeping = tokio::time::interval(addresses::TICK);
        housekeeping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let recv_meta = tokio::select! {
                result = self.recv_packet(&mut buf) => result?,
                _ = housekeeping.tick() => {
                    if let Some(log) = &self.inner.addresses {
                        log.lock().unwrap_or_else(PoisonError::into_inner).tick();
                    }
                    continue;
                }
                _ = self.inner.cancel.cancelled() => {
                    tracing::info!(target: "extsnmpd::agent", "agent shutdown requested");
                    return Ok(());
                }
            };

            let data = Bytes::copy_from_slice(&buf[..recv_meta.len]);
            self.note_source(recv_meta.addr);

            let permit = self
                .inner
                .concurrency_limit
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::Cancelled.boxed())?;
            let agent = self.clone();

            tokio::spawn(async move {
                match agent.handle_request(data, recv_meta.addr).await {
                    Ok(Some(response)) => {
                        if let Err(e) = agent.send_response(&response, &recv_meta).await {
                            tracing::warn!(target: "extsnmpd::agent", { snmp.source = %recv_meta.addr, error = %e }, "failed to send response");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!(target: "extsnmpd::agent", { snmp.source = %recv_meta.addr, error = %e }, "request dropped");
                    }
                }
                drop(permit);
            });
        }
    }

    fn note_source(&self, source: SocketAddr) {
        let Some(log) = &self.inner.addresses else {
            return;
        };
        let fresh = log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(source.ip());
        if fresh {
            tracing::info!(target: "extsnmpd::agent", { snmp.source = %source.ip() }, "received SNMP packets");
        }
    }

    async fn recv_packet(&self, buf: &mut [u8]) -> Result<RecvMeta> {
        let mut iov = [IoSliceMut::new(buf)];
        let mut meta = [RecvMeta::default()];

        loop {
            self.inner
                .socket
                .readable()
                .await
                .map_err(|e| Error::Network {
                    target: self.inner.local_addr,
                    source: e,
                })?;

            let result = self.inner.socket.try_io(tokio::io::Interest::READABLE, || {
                let sref = UdpSockRef::from(&*self.inner.socket);
                self.inner.socket_state.recv(sref, &mut iov, &mut meta)
            });

            match result {
                Ok(n) if n > 0 => return Ok(meta[0]),
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) => {
                    return Err(Error::Network {
                        target: self.inner.local_addr,
                        source: e,
                    }
                    .boxed());
                }
            }
        }
    }

    /// Reply from the address the request arrived on.
    async fn send_response(&self, data: &[u8], recv_meta: &RecvMeta) -> std::io::Result<()> {
        let transmit = Transmit {
            destination: recv_meta.addr,
            ecn: None,
            contents: data,
            segment_size: None,
            src_ip: recv_meta.dst_ip,
        };

        loop {
            self.inner.socket.writable().await?;

            let result = self.inner.socket.try_io(tokio::io::Interest::WRITABLE, || {
                let sref = UdpSockRef::from(&*self.inner.socket);
                self.inner.socket_state.try_send(sref, &transmit)
            });

            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
