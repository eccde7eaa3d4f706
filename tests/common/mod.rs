//! Shared test utilities and fixtures for the fortisync test suite.
//!
//! This module provides:
//! - A mock connection that behaves like a small appliance: it keeps a
//!   configuration tree, answers `show`, applies batches and reports
//!   injected statement failures in the batch log
//! - Configuration fixtures
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use fortisync::connection::{
    CommandResult, Connection, ConnectionError, ConnectionResult, ExecuteOptions,
};
use fortisync::session::FortiDevice;
use fortisync::tree::apply::strip_vdom_selector;
use fortisync::tree::render::render;
use fortisync::tree::{apply_script, ConfigTree};

/// Prompt the mock prints after every command.
pub const PROMPT: &str = "FGT60E # ";

// ============================================================================
// Fixtures
// ============================================================================

/// Static routes as printed by the device.
pub const STATIC_ROUTES: &str = r#"config router static
    edit 1
        set gateway 10.0.0.1
        set device "port1"
    next
end
"#;

/// Interfaces as printed by the device, including ignored fields.
pub const INTERFACES: &str = r#"config system interface
    edit "port1"
        set vdom "root"
        set ip 192.168.1.99 255.255.255.0
        set allowaccess ping https ssh
        set type physical
        set snmp-index 1
    next
    edit "port2"
        set vdom "root"
        set mode dhcp
        set snmp-index 2
    next
end
"#;

/// BGP with nested neighbor blocks.
pub const BGP: &str = r#"config router bgp
    set as 65001
    set router-id 10.0.0.1
    config neighbor
        edit "10.0.0.2"
            set remote-as 65002
        next
    end
end
"#;

/// Parse configuration text into a fresh tree.
pub fn parse_tree(name: &str, text: &str) -> ConfigTree {
    let mut tree = ConfigTree::new(name);
    tree.parse_config_output(text)
        .expect("fixture should parse");
    tree
}

// ============================================================================
// Mock Connection Implementation
// ============================================================================

/// A mock connection that simulates an appliance CLI.
///
/// Every command is recorded. `show` renders the simulated configuration,
/// batches are applied to it with failing statements left out, and the
/// batch log reports those failures with their codes.
///
/// # Example
///
/// ```rust,ignore
/// let mock = MockConnection::new("fw1").with_config(STATIC_ROUTES);
/// mock.fail_next_batch(vec![(-3, "set gateway 10.0.0.254")]);
/// ```
#[derive(Debug)]
pub struct MockConnection {
    identifier: String,
    alive: AtomicBool,
    device: RwLock<ConfigTree>,
    commands_executed: RwLock<Vec<String>>,
    batches: RwLock<Vec<String>>,
    batch_failures: RwLock<VecDeque<Vec<(i64, String)>>>,
    persistent_failures: RwLock<Vec<(i64, String)>>,
    last_log: RwLock<Vec<String>>,
    command_results: RwLock<HashMap<String, CommandResult>>,
    command_count: AtomicU32,
}

impl MockConnection {
    /// Create a mock with an empty configuration.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            alive: AtomicBool::new(true),
            device: RwLock::new(ConfigTree::new("device")),
            commands_executed: RwLock::new(Vec::new()),
            batches: RwLock::new(Vec::new()),
            batch_failures: RwLock::new(VecDeque::new()),
            persistent_failures: RwLock::new(Vec::new()),
            last_log: RwLock::new(Vec::new()),
            command_results: RwLock::new(HashMap::new()),
            command_count: AtomicU32::new(0),
        }
    }

    /// Load the simulated device configuration.
    pub fn with_config(self, text: &str) -> Self {
        self.device
            .write()
            .parse_config_output(text)
            .expect("mock config should parse");
        self
    }

    /// Fail the given statements in the next batch only.
    pub fn fail_next_batch(&self, failures: Vec<(i64, &str)>) {
        self.batch_failures.write().push_back(
            failures
                .into_iter()
                .map(|(code, statement)| (code, statement.to_string()))
                .collect(),
        );
    }

    /// Fail `statement` in every batch that contains it.
    pub fn fail_always(&self, code: i64, statement: &str) {
        self.persistent_failures
            .write()
            .push((code, statement.to_string()));
    }

    /// Return a fixed result for commands starting with `prefix`.
    pub fn set_command_result(&self, prefix: impl Into<String>, result: CommandResult) {
        self.command_results.write().insert(prefix.into(), result);
    }

    /// Number of commands executed.
    pub fn command_count(&self) -> u32 {
        self.command_count.load(Ordering::SeqCst)
    }

    /// All commands executed, in order.
    pub fn get_commands(&self) -> Vec<String> {
        self.commands_executed.read().clone()
    }

    /// Scripts received inside batches, in order.
    pub fn batches(&self) -> Vec<String> {
        self.batches.read().clone()
    }

    /// Current simulated configuration.
    pub fn device_config(&self) -> ConfigTree {
        self.device.read().clone()
    }

    /// Mark the connection as dead.
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    fn show(&self, command: &str) -> String {
        let path = command
            .lines()
            .find_map(|line| line.trim().strip_prefix("show "))
            .unwrap_or_default()
            .trim();
        let device = self.device.read();
        let text = device
            .find(&[path])
            .map(|block| render(&device, block, false, 0, false))
            .unwrap_or_default();
        format!("{text}{PROMPT}")
    }

    fn batch(&self, command: &str) -> String {
        let (prefix, body) = command
            .split_once("execute batch start\n")
            .unwrap_or_default();
        let body = body
            .rsplit_once("\nexecute batch end")
            .map(|(script, _)| script)
            .unwrap_or(body);

        // Strip the vdom envelope, then the selector the diff put around
        // the script.
        let mut lines: Vec<&str> = body.lines().collect();
        let mut vdom = prefix.starts_with("config global").then(|| "global".to_string());
        if lines.first().map(|l| l.trim()) == Some("config vdom") && lines.len() > 1 {
            vdom = lines[1].trim().strip_prefix("edit ").map(str::to_string);
            lines.drain(..2);
        }
        let script = strip_vdom_selector(&lines, vdom.as_deref()).join("\n");
        self.batches.write().push(script.clone());

        let mut failures = self.batch_failures.write().pop_front().unwrap_or_default();
        failures.extend(self.persistent_failures.read().iter().cloned());

        let mut applied = Vec::new();
        let mut log = Vec::new();
        for line in script.lines() {
            let statement = line.trim();
            if statement.is_empty() {
                continue;
            }
            match failures.iter().find(|(_, failing)| failing == statement) {
                Some((code, _)) => log.push(format!("{code}: {statement}")),
                None => {
                    log.push(format!("0: {statement}"));
                    applied.push(line);
                }
            }
        }

        apply_script(&mut self.device.write(), &applied.join("\n"))
            .expect("mock batch should apply");
        *self.last_log.write() = log;
        PROMPT.to_string()
    }

    fn lastlog(&self) -> String {
        let mut out = self.last_log.read().join("\n");
        out.push('\n');
        out.push_str(PROMPT);
        out
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn execute(
        &self,
        command: &str,
        _options: Option<ExecuteOptions>,
    ) -> ConnectionResult<CommandResult> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed);
        }
        self.command_count.fetch_add(1, Ordering::SeqCst);
        self.commands_executed.write().push(command.to_string());

        let fixed = self
            .command_results
            .read()
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, result)| result.clone());
        if let Some(result) = fixed {
            return Ok(result);
        }

        let stdout = if command.contains("execute batch start") {
            self.batch(command)
        } else if command.contains("execute batch lastlog") {
            self.lastlog()
        } else if command.lines().any(|l| l.trim().starts_with("show ")) {
            self.show(command)
        } else {
            PROMPT.to_string()
        };
        Ok(CommandResult::success(stdout, String::new()))
    }

    async fn close(&self) -> ConnectionResult<()> {
        self.alive.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Shared handle so a test can inspect the mock after handing it to a session.
#[derive(Debug, Clone)]
pub struct SharedMock(pub Arc<MockConnection>);

#[async_trait]
impl Connection for SharedMock {
    fn identifier(&self) -> &str {
        self.0.identifier()
    }

    async fn is_alive(&self) -> bool {
        self.0.is_alive().await
    }

    async fn execute(
        &self,
        command: &str,
        options: Option<ExecuteOptions>,
    ) -> ConnectionResult<CommandResult> {
        self.0.execute(command, options).await
    }

    async fn close(&self) -> ConnectionResult<()> {
        self.0.close().await
    }
}

/// Build a session over `mock` and keep a handle for assertions.
pub fn device_with(mock: MockConnection, vdom: Option<&str>) -> (FortiDevice, Arc<MockConnection>) {
    let mock = Arc::new(mock);
    let device = FortiDevice::with_connection(
        "fw1",
        vdom.map(str::to_string),
        Box::new(SharedMock(Arc::clone(&mock))),
    );
    (device, mock)
}
