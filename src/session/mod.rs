//! Device session: the running, candidate and snapshot trees of one device
//! plus the channel used to reach it.
//!
//! # Example
//!
//! ```rust,ignore
//! use fortisync::connection::ConnectionBuilder;
//! use fortisync::session::{FortiDevice, LoadInto};
//! use fortisync::tree::BlockKind;
//!
//! let mut device = FortiDevice::new("192.168.1.99", None);
//! device.open(ConnectionBuilder::new("192.168.1.99").user("admin").password("secret")).await?;
//!
//! device.load_config("router bgp", LoadInto::Both).await?;
//! let candidate = device.candidate_mut();
//! let neighbors = candidate.find(&["router bgp", "neighbor"]).unwrap();
//! let peer = candidate.add_block(neighbors, "10.6.6.6", BlockKind::Edit);
//! candidate.set_param(peer, "remote-as", "666");
//!
//! println!("{}", device.compare_config(None));
//! let report = device.commit(None, false).await?;
//! ```

pub mod batch;
pub mod channel;
pub mod transaction;

pub use batch::{
    batch_command, lastlog_command, parse_batch_lastlog, show_command, CommitPolicy,
    FailedCommand,
};
pub use channel::CliChannel;
pub use transaction::{CommitReport, TransactionState};

use tracing::{debug, info, info_span, Instrument};

use crate::connection::Connection;
use crate::diff;
use crate::error::{Error, Result};
use crate::tree::ConfigTree;

#[cfg(feature = "russh")]
use crate::connection::ConnectionBuilder;

/// Which trees a load populates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadInto {
    /// Only the running tree; the candidate is left as is
    Running,
    /// Only the candidate tree
    Candidate,
    /// Both trees, so the candidate starts as a copy of the device state
    Both,
}

impl LoadInto {
    /// Translate the `in_candidate` / `empty_candidate` flag pair.
    ///
    /// Running is loaded unless `in_candidate`; the candidate is loaded
    /// unless `empty_candidate`, and always when `in_candidate`.
    pub fn from_flags(in_candidate: bool, empty_candidate: bool) -> Self {
        match (in_candidate, empty_candidate) {
            (true, _) => LoadInto::Candidate,
            (false, true) => LoadInto::Running,
            (false, false) => LoadInto::Both,
        }
    }

    fn running(self) -> bool {
        matches!(self, LoadInto::Running | LoadInto::Both)
    }

    fn candidate(self) -> bool {
        matches!(self, LoadInto::Candidate | LoadInto::Both)
    }
}

/// One managed device.
///
/// Operations take `&mut self`; a session never runs two operations at once.
#[derive(Debug)]
pub struct FortiDevice {
    hostname: String,
    vdom: Option<String>,
    channel: Option<CliChannel>,
    channel_timeout: Option<u64>,
    policy: CommitPolicy,
    running: ConfigTree,
    candidate: ConfigTree,
    original: Option<ConfigTree>,
    state: TransactionState,
}

impl FortiDevice {
    /// Create a disconnected session for `hostname`, optionally scoped to a
    /// vdom (`"global"` selects the global scope).
    pub fn new(hostname: impl Into<String>, vdom: Option<String>) -> Self {
        Self {
            hostname: hostname.into(),
            running: ConfigTree::with_vdom("running", vdom.clone()),
            candidate: ConfigTree::with_vdom("candidate", vdom.clone()),
            vdom,
            channel: None,
            channel_timeout: None,
            policy: CommitPolicy::default(),
            original: None,
            state: TransactionState::Idle,
        }
    }

    /// Create a session over an already established connection.
    pub fn with_connection(
        hostname: impl Into<String>,
        vdom: Option<String>,
        connection: Box<dyn Connection>,
    ) -> Self {
        let mut device = Self::new(hostname, vdom);
        device.attach(connection);
        device
    }

    /// Set the retry policy
    pub fn with_policy(mut self, policy: CommitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the per-command timeout in seconds
    pub fn with_channel_timeout(mut self, secs: u64) -> Self {
        self.channel_timeout = Some(secs);
        if let Some(channel) = self.channel.take() {
            self.channel = Some(channel.with_timeout(secs));
        }
        self
    }

    /// Use `connection` for all further commands.
    pub fn attach(&mut self, connection: Box<dyn Connection>) {
        let mut channel = CliChannel::new(connection);
        if let Some(secs) = self.channel_timeout {
            channel = channel.with_timeout(secs);
        }
        self.channel = Some(channel);
    }

    /// Open an SSH connection to the device.
    #[cfg(feature = "russh")]
    pub async fn open(&mut self, builder: ConnectionBuilder) -> Result<()> {
        info!(host = %self.hostname, "Opening session");
        let connection = builder.connect().await?;
        self.attach(Box::new(connection));
        Ok(())
    }

    /// Close the connection, if any.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(channel) = self.channel.take() {
            info!(host = %self.hostname, "Closing session");
            channel.close().await?;
        }
        Ok(())
    }

    /// Whether a connection is attached
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Device hostname
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Vdom the session is scoped to
    pub fn vdom(&self) -> Option<&str> {
        self.vdom.as_deref()
    }

    /// Retry policy
    pub fn policy(&self) -> &CommitPolicy {
        &self.policy
    }

    /// Current transaction state
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Mirror of the device configuration
    pub fn running(&self) -> &ConfigTree {
        &self.running
    }

    /// Desired configuration
    pub fn candidate(&self) -> &ConfigTree {
        &self.candidate
    }

    /// Desired configuration, for editing
    pub fn candidate_mut(&mut self) -> &mut ConfigTree {
        &mut self.candidate
    }

    /// Replace the candidate tree
    pub fn set_candidate(&mut self, mut candidate: ConfigTree) {
        candidate.set_vdom(self.vdom.clone());
        self.candidate = candidate;
    }

    /// Snapshot taken before the last commit
    pub fn original(&self) -> Option<&ConfigTree> {
        self.original.as_ref()
    }

    fn transition(&mut self, state: TransactionState) {
        if self.state != state {
            debug!(host = %self.hostname, from = %self.state, to = %state, "State transition");
            self.state = state;
        }
    }

    /// Run a raw command on the device, outside any vdom.
    pub async fn execute_command(&self, command: &str) -> Result<Vec<String>> {
        let channel = self.channel.as_ref().ok_or(Error::NotConnected)?;
        let span = info_span!("device", host = %self.hostname, vdom = self.vdom.as_deref().unwrap_or_default());
        channel.execute(command).instrument(span).await
    }

    /// Load the configuration under `path` from the device.
    pub async fn load_config(&mut self, path: &str, into: LoadInto) -> Result<()> {
        info!(host = %self.hostname, vdom = ?self.vdom, path, ?into, "Loading config");
        self.transition(TransactionState::Loading);
        let result = self.fetch(path, into).await;
        self.transition(if result.is_ok() {
            TransactionState::Idle
        } else {
            TransactionState::Fatal
        });
        result
    }

    /// Load configuration text as if it had been printed for `path`.
    pub fn load_config_text(&mut self, path: &str, text: &str, into: LoadInto) -> Result<()> {
        info!(host = %self.hostname, path, ?into, "Loading config from text");
        let lines: Vec<&str> = text.lines().collect();
        self.ingest(path, &lines, into)
    }

    async fn fetch(&mut self, path: &str, into: LoadInto) -> Result<()> {
        let command = show_command(self.vdom.as_deref(), path);
        let lines = self.execute_command(&command).await?;
        self.ingest(path, &lines, into)
    }

    fn ingest<S: AsRef<str>>(&mut self, path: &str, lines: &[S], into: LoadInto) -> Result<()> {
        if into.running() {
            self.running.parse_lines(lines)?;
            self.running.add_path(path);
        }
        if into.candidate() {
            self.candidate.parse_lines(lines)?;
            self.candidate.add_path(path);
        }
        Ok(())
    }

    /// Commands that turn running into `other`, or into the candidate.
    pub fn compare_config(&self, other: Option<&ConfigTree>) -> String {
        diff::compare(&self.running, other.unwrap_or(&self.candidate))
    }

    /// Line diff from running to `other`, or to the candidate.
    pub fn compare_config_text(&self, other: Option<&ConfigTree>) -> String {
        diff::text_diff(&self.running, other.unwrap_or(&self.candidate))
    }
}
