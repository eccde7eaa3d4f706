//! # fortisync - Transactional configuration for block-structured appliance CLIs
//!
//! fortisync loads the live configuration of an appliance that speaks a
//! nested `config` / `edit` / `set` / `next` / `end` CLI, lets the caller
//! describe a desired configuration, computes the minimal command script
//! between the two and pushes that script as a batch with retry and
//! rollback.
//!
//! ## Core Concepts
//!
//! - **Config tree**: an arena of blocks (`config` / `edit`) holding
//!   parameters and ordered children
//! - **Parser / renderer**: CLI text to tree and back
//! - **Differ**: two trees to a command script, or to a line diff
//! - **Session**: running, candidate and snapshot trees plus the commit,
//!   retry and rollback controller
//! - **Connections**: transport used to run commands on the device
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI Interface                              │
//! │                    (clap-based command parsing)                      │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Session (FortiDevice)                           │
//! │         load -> diff -> batch -> verify -> retry / rollback          │
//! └─────────────────────────────────────────────────────────────────────┘
//!          │                         │                         │
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │   Config tree   │   │       Differ        │   │    CLI channel      │
//! │ (parse, render, │   │  (command script,   │   │  (prompt cleanup,   │
//! │  apply script)  │   │    text diff)       │   │  failure detection) │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//!                                                              │
//!                                                              ▼
//!                                                  ┌─────────────────────┐
//!                                                  │ Connection (russh)  │
//!                                                  └─────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust
//! use fortisync::prelude::*;
//!
//! let mut running = ConfigTree::new("running");
//! running
//!     .parse_config_output("config system global\n    set hostname fw1\nend\n")
//!     .unwrap();
//!
//! let mut candidate = running.clone();
//! let global = candidate.find(&["system global"]).unwrap();
//! candidate.set_param(global, "hostname", "fw2");
//!
//! assert_eq!(
//!     compare(&running, &candidate),
//!     "    config system global\n      set hostname fw2\n    end\n"
//! );
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.
    //!
    //! ```rust,ignore
    //! use fortisync::prelude::*;
    //!
    //! let mut device = FortiDevice::new("192.168.1.99", None);
    //! device.open(ConnectionBuilder::new("192.168.1.99").user("admin")).await?;
    //! device.load_config("system interface", LoadInto::Both).await?;
    //! ```

    // Connection types
    #[cfg(feature = "russh")]
    pub use crate::connection::{ConnectionBuilder, RusshConnection};
    pub use crate::connection::{
        CommandResult, Connection, ConnectionConfig, ConnectionError, ConnectionResult,
        ExecuteOptions, HostConfig,
    };

    // Error handling
    pub use crate::error::{Error, Result};

    // Config tree
    pub use crate::tree::{apply_script, BlockKind, ConfigNode, ConfigTree, NodeId};

    // Diffing
    pub use crate::diff::{compare, text_diff, ScriptStats};

    // Sessions
    pub use crate::session::{
        CommitPolicy, CommitReport, FailedCommand, FortiDevice, LoadInto, TransactionState,
    };
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases.
///
/// [`Error`](error::Error) covers malformed configuration text, device
/// failures, commits that could not be applied and transport problems.
pub mod error;

/// Configuration tree model, parser, renderer and script applier.
pub mod tree;

/// Command script and text diffs between configuration trees.
pub mod diff;

/// Device sessions: loading, committing, retrying and rolling back.
pub mod session;

// ============================================================================
// Infrastructure
// ============================================================================

/// Connection layer for remote device communication.
///
/// This module provides the [`Connection`](connection::Connection) trait and
/// an SSH implementation built on russh.
pub mod connection;

/// Layered application configuration (files and environment).
pub mod config;

pub use error::{Error, Result};
