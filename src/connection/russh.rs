//! SSH transport built on russh.
//!
//! Each command gets its own `exec` channel. FortiOS accepts a multi-line
//! script in a single exec request, so a whole batch costs one round trip.

use async_trait::async_trait;
use russh::client::{Handle, Handler};
use russh::ChannelMsg;
use russh_keys::agent::client::AgentClient;
use russh_keys::key::PublicKey;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use super::config::{default_identity_files, expand_path, ConnectionConfig, HostConfig};
use super::{CommandResult, Connection, ConnectionError, ConnectionResult, ExecuteOptions};

/// Key exchange algorithms offered to the device. Older FortiOS releases
/// only speak the group14 Diffie-Hellman variants.
const PREFERRED_KEX: &[russh::kex::Name] = &[
    russh::kex::CURVE25519,
    russh::kex::DH_G14_SHA256,
    russh::kex::DH_G14_SHA1,
];

/// Minimum idle time before russh drops the session.
const MIN_INACTIVITY: Duration = Duration::from_secs(300);

/// SSH extended data stream carrying stderr.
const STDERR_STREAM: u32 = 1;

/// Checks the device key against known_hosts.
struct KnownHostsVerifier {
    host: String,
    port: u16,
    file: Option<PathBuf>,
    accept_unknown: bool,
    /// Raised when the key contradicts a known_hosts entry, so the caller
    /// can tell a mismatch from an ordinary handshake failure.
    mismatch: Arc<AtomicBool>,
}

impl KnownHostsVerifier {
    fn file(&self) -> Option<PathBuf> {
        self.file
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".ssh").join("known_hosts")))
            .filter(|p| p.exists())
    }
}

#[async_trait]
impl Handler for KnownHostsVerifier {
    type Error = russh::Error;

    async fn check_server_key(&mut self, key: &PublicKey) -> Result<bool, Self::Error> {
        let Some(file) = self.file() else {
            debug!(host = %self.host, accept = self.accept_unknown, "No known_hosts file");
            return Ok(self.accept_unknown);
        };

        match russh_keys::check_known_hosts_path(&self.host, self.port, key, &file) {
            Ok(true) => {
                debug!(host = %self.host, "Host key matches known_hosts");
                Ok(true)
            }
            Ok(false) => {
                warn!(host = %self.host, accept = self.accept_unknown, "Host key not in known_hosts");
                Ok(self.accept_unknown)
            }
            Err(e) => {
                warn!(host = %self.host, error = %e, "Host key does not match known_hosts");
                self.mismatch.store(true, Ordering::SeqCst);
                Ok(false)
            }
        }
    }
}

/// One way of proving identity, tried in plan order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Credential {
    Agent,
    Key(PathBuf),
    Password(String),
}

/// Authentication order: agent, the host's key, configured default keys,
/// the usual `~/.ssh/id_*` files, then the password.
fn credential_plan(host: &HostConfig, config: &ConnectionConfig) -> Vec<Credential> {
    let mut plan = Vec::new();
    if config.defaults.use_agent {
        plan.push(Credential::Agent);
    }

    let keys = host
        .identity_file
        .iter()
        .chain(config.defaults.identity_files.iter())
        .map(|f| expand_path(f))
        .chain(default_identity_files());
    for key in keys {
        let credential = Credential::Key(key);
        if !plan.contains(&credential) {
            plan.push(credential);
        }
    }

    if let Some(password) = &host.password {
        plan.push(Credential::Password(password.clone()));
    }
    plan
}

/// Session handle shared by the command channels
type Session = Handle<KnownHostsVerifier>;

/// SSH connection to one device
pub struct RusshConnection {
    identifier: String,
    /// Channels are opened under the read lock; `close` takes the write lock.
    session: RwLock<Option<Session>>,
    opened_at: Instant,
    commands_sent: AtomicU64,
}

impl RusshConnection {
    /// Connect to `host`. `host_config` defaults to the merged settings for
    /// `host` in `config`.
    pub async fn connect(
        host: &str,
        host_config: Option<HostConfig>,
        config: &ConnectionConfig,
    ) -> ConnectionResult<Self> {
        let host_config = host_config.unwrap_or_else(|| config.get_host_merged(host));
        let address = host_config.hostname.as_deref().unwrap_or(host);
        let port = host_config.port.unwrap_or(config.defaults.port);
        let user = host_config.user.as_deref().unwrap_or(&config.defaults.user);

        if let Some(proxy) = &host_config.proxy_command {
            warn!(host = %address, proxy = %proxy, "ProxyCommand is not supported, connecting directly");
        }
        debug!(host = %address, port, user = %user, "Opening SSH session");

        let mut session = Self::handshake(address, port, &host_config, config).await?;
        Self::authenticate(&mut session, user, credential_plan(&host_config, config)).await?;

        let conn = Self {
            identifier: format!("{}@{}:{}", user, address, port),
            session: RwLock::new(Some(session)),
            opened_at: Instant::now(),
            commands_sent: AtomicU64::new(0),
        };
        debug!(identifier = %conn.identifier, "SSH session ready");
        Ok(conn)
    }

    async fn handshake(
        address: &str,
        port: u16,
        host_config: &HostConfig,
        config: &ConnectionConfig,
    ) -> ConnectionResult<Session> {
        let timeout = host_config.timeout_duration();
        let mut client = russh::client::Config::default();
        client.inactivity_timeout = Some(timeout.max(MIN_INACTIVITY));
        client.preferred = russh::Preferred {
            kex: Cow::Borrowed(PREFERRED_KEX),
            ..russh::Preferred::default()
        };

        let target = format!("{}:{}", address, port);
        let socket = tokio::time::timeout(timeout, tokio::net::TcpStream::connect(&target))
            .await
            .map_err(|_| ConnectionError::Timeout(timeout.as_secs()))?
            .map_err(|e| ConnectionError::Connect(format!("{}: {}", target, e)))?;
        socket.set_nodelay(true)?;

        let mismatch = Arc::new(AtomicBool::new(false));
        let verifier = KnownHostsVerifier {
            host: address.to_string(),
            port,
            file: host_config
                .user_known_hosts_file
                .as_deref()
                .map(expand_path)
                .or_else(|| config.defaults.known_hosts_file.clone()),
            accept_unknown: host_config
                .strict_host_key_checking
                .map(|strict| !strict)
                .unwrap_or(config.defaults.accept_unknown_hosts),
            mismatch: Arc::clone(&mismatch),
        };

        match russh::client::connect_stream(Arc::new(client), socket, verifier).await {
            Ok(session) => Ok(session),
            Err(_) if mismatch.load(Ordering::SeqCst) => {
                Err(ConnectionError::HostKeyMismatch(address.to_string()))
            }
            Err(e) => Err(ConnectionError::Connect(format!("SSH handshake with {}: {}", target, e))),
        }
    }

    async fn authenticate(
        session: &mut Session,
        user: &str,
        plan: Vec<Credential>,
    ) -> ConnectionResult<()> {
        for credential in plan {
            let accepted = match &credential {
                Credential::Agent => Self::agent_auth(session, user).await,
                Credential::Key(path) => Self::key_auth(session, user, path).await,
                Credential::Password(password) => session
                    .authenticate_password(user, password)
                    .await
                    .map_err(ConnectionError::from),
            };
            match accepted {
                Ok(true) => {
                    debug!(user, method = ?MethodLabel(&credential), "Authenticated");
                    return Ok(());
                }
                Ok(false) => trace!(method = ?MethodLabel(&credential), "Rejected"),
                Err(e) => trace!(method = ?MethodLabel(&credential), error = %e, "Unusable"),
            }
        }
        Err(ConnectionError::Auth(format!("no method accepted for user {}", user)))
    }

    async fn agent_auth(session: &mut Session, user: &str) -> ConnectionResult<bool> {
        let mut agent = AgentClient::connect_env()
            .await
            .map_err(|e| ConnectionError::Auth(format!("SSH agent: {}", e)))?;
        let identities = agent
            .request_identities()
            .await
            .map_err(|e| ConnectionError::Auth(format!("SSH agent identities: {}", e)))?;

        for identity in identities {
            let (returned, result) = session.authenticate_future(user, identity, agent).await;
            agent = returned;
            if let Ok(true) = result {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn key_auth(session: &mut Session, user: &str, path: &Path) -> ConnectionResult<bool> {
        if !path.exists() {
            return Ok(false);
        }
        let key = russh_keys::load_secret_key(path, None)
            .map_err(|e| ConnectionError::Auth(format!("{}: {}", path.display(), e)))?;
        Ok(session.authenticate_publickey(user, Arc::new(key)).await?)
    }

    /// Commands sent so far
    pub fn commands_sent(&self) -> u64 {
        self.commands_sent.load(Ordering::Relaxed)
    }

    async fn exec(&self, command: &str) -> ConnectionResult<CommandResult> {
        let mut channel = {
            let guard = self.session.read().await;
            let session = guard.as_ref().ok_or(ConnectionError::Closed)?;
            session
                .channel_open_session()
                .await
                .map_err(|e| ConnectionError::Channel(format!("open: {}", e)))?
        };
        channel
            .exec(true, command)
            .await
            .map_err(|e| ConnectionError::Channel(format!("exec: {}", e)))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut status = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext } if ext == STDERR_STREAM => {
                    stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status } => status = Some(exit_status),
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        // FortiOS often closes the channel without an exit status.
        let exit_code = status.map(|s| s as i32).unwrap_or(0);
        trace!(exit_code, bytes = stdout.len(), "Command finished");
        Ok(CommandResult::failure(
            exit_code,
            String::from_utf8_lossy(&stdout).into_owned(),
            String::from_utf8_lossy(&stderr).into_owned(),
        ))
    }
}

/// Credential without the secret, for logs
struct MethodLabel<'a>(&'a Credential);

impl std::fmt::Debug for MethodLabel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Credential::Agent => write!(f, "agent"),
            Credential::Key(path) => write!(f, "key {}", path.display()),
            Credential::Password(_) => write!(f, "password"),
        }
    }
}

#[async_trait]
impl Connection for RusshConnection {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn is_alive(&self) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .is_some_and(|session| !session.is_closed())
    }

    async fn execute(
        &self,
        command: &str,
        options: Option<ExecuteOptions>,
    ) -> ConnectionResult<CommandResult> {
        self.commands_sent.fetch_add(1, Ordering::Relaxed);
        trace!(identifier = %self.identifier, command = %command, "Sending command");

        match options.unwrap_or_default().timeout {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), self.exec(command))
                .await
                .map_err(|_| ConnectionError::Timeout(secs))?,
            None => self.exec(command).await,
        }
    }

    async fn close(&self) -> ConnectionResult<()> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        debug!(
            identifier = %self.identifier,
            open_secs = self.opened_at.elapsed().as_secs(),
            commands = self.commands_sent(),
            "Closing SSH session"
        );
        session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for RusshConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusshConnection")
            .field("identifier", &self.identifier)
            .field("commands_sent", &self.commands_sent())
            .finish()
    }
}

/// Connection settings for one device, layered over the SSH client config.
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    host: String,
    overrides: HostConfig,
    config: ConnectionConfig,
}

impl ConnectionBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            overrides: HostConfig::default(),
            config: ConnectionConfig::default(),
        }
    }

    /// Base settings to layer the builder values on
    pub fn with_config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.overrides.port = Some(port);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.overrides.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.overrides.password = Some(password.into());
        self
    }

    pub fn private_key(mut self, path: impl Into<String>) -> Self {
        self.overrides.identity_file = Some(path.into());
        self
    }

    /// TCP connect timeout in seconds
    pub fn timeout(mut self, secs: u64) -> Self {
        self.overrides.connect_timeout = Some(secs);
        self
    }

    /// Effective host settings: builder values, then `~/.ssh/config`, then
    /// the configured defaults.
    pub fn resolve(&mut self) -> ConnectionResult<HostConfig> {
        self.config.load_ssh_config()?;
        let mut merged = self.config.get_host_merged(&self.host);
        let overrides = self.overrides.clone();

        merged.port = overrides.port.or(merged.port);
        merged.user = overrides.user.or(merged.user);
        merged.password = overrides.password.or(merged.password);
        merged.identity_file = overrides.identity_file.or(merged.identity_file);
        merged.connect_timeout = overrides.connect_timeout.or(merged.connect_timeout);
        Ok(merged)
    }

    pub async fn connect(mut self) -> ConnectionResult<RusshConnection> {
        let host_config = self.resolve()?;
        RusshConnection::connect(&self.host, Some(host_config), &self.config).await
    }
}
