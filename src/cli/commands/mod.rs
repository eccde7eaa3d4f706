//! Subcommands module for fortisync CLI
//!
//! This module contains all the subcommand implementations.

pub mod commit;
pub mod compare;
pub mod diff;
pub mod render;
pub mod show;

use std::path::Path;

use fortisync::config::Config;
use fortisync::error::{Error, ErrorContext, Result};
use fortisync::session::FortiDevice;
use fortisync::tree::ConfigTree;

use crate::cli::output::OutputFormatter;
use crate::cli::Cli;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration with command-line overrides applied
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Verbosity level
    pub verbosity: u8,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &Cli, mut config: Config) -> Self {
        if let Some(host) = &cli.host {
            config.device.hostname = Some(host.clone());
        }
        if let Some(port) = cli.port {
            config.device.port = port;
        }
        if let Some(user) = &cli.user {
            config.device.username = Some(user.clone());
        }
        if let Some(password) = &cli.password {
            config.device.password = Some(password.clone());
        }
        if let Some(keyfile) = &cli.keyfile {
            config.device.keyfile = Some(keyfile.clone());
        }
        if let Some(vdom) = &cli.vdom {
            config.device.vdom = Some(vdom.clone());
        }
        if let Some(format) = cli.log_format {
            config.logging.format = format;
        }

        Self {
            config,
            output: OutputFormatter::new(!cli.no_color, false, cli.verbosity()),
            verbosity: cli.verbosity(),
        }
    }

    /// Vdom every command is scoped to
    pub fn vdom(&self) -> Option<String> {
        self.config.device.vdom.clone()
    }

    /// Open a session to the configured device.
    #[cfg(feature = "russh")]
    pub async fn connect(&self) -> Result<FortiDevice> {
        use fortisync::connection::ConnectionBuilder;

        let device = &self.config.device;
        let host = device
            .hostname
            .clone()
            .ok_or_else(|| Error::Config("no device hostname (use --host or FORTISYNC_HOST)".into()))?;

        let mut builder = ConnectionBuilder::new(&host)
            .with_config(self.config.to_connection_config())
            .port(device.port)
            .timeout(device.timeout);
        if let Some(user) = &device.username {
            builder = builder.user(user);
        }
        if let Some(password) = &device.password {
            builder = builder.password(password);
        }
        if let Some(keyfile) = &device.keyfile {
            builder = builder.private_key(keyfile);
        }

        self.output.info(&format!("Connecting to {}:{}", host, device.port));
        let mut session = FortiDevice::new(&host, self.vdom())
            .with_policy(self.config.commit.clone())
            .with_channel_timeout(device.channel_timeout);
        session.open(builder).await?;
        Ok(session)
    }

    /// Open a session to the configured device.
    #[cfg(not(feature = "russh"))]
    pub async fn connect(&self) -> Result<FortiDevice> {
        Err(Error::Config(
            "fortisync was built without SSH support (enable the `russh` feature)".into(),
        ))
    }
}

/// Parse a configuration file into a tree scoped to `vdom`.
pub fn load_tree(path: &Path, name: &str, vdom: Option<String>) -> Result<ConfigTree> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut tree = ConfigTree::with_vdom(name, vdom);
    tree.parse_config_output(&text)?;
    Ok(tree)
}
