//! Diff command - compare the device configuration with a local file

use super::{load_tree, CommandContext};
use clap::Parser;
use fortisync::diff::ScriptStats;
use fortisync::error::Result;
use fortisync::session::LoadInto;
use std::path::PathBuf;

/// Arguments for the diff command
#[derive(Parser, Debug, Clone)]
pub struct DiffArgs {
    /// Configuration path to load from the device, e.g. "router bgp"
    #[arg(required = true)]
    pub path: String,

    /// File holding the desired configuration
    #[arg(long, required = true)]
    pub candidate: PathBuf,

    /// Print a line diff instead of the command script
    #[arg(long)]
    pub text: bool,
}

impl DiffArgs {
    /// Execute the diff command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let candidate = load_tree(&self.candidate, "candidate", ctx.vdom())?;

        let mut device = ctx.connect().await?;
        let loaded = device.load_config(&self.path, LoadInto::Running).await;
        let closed = device.close().await;
        loaded?;
        closed?;
        device.set_candidate(candidate);

        if self.text {
            ctx.output.plain(&device.compare_config_text(None));
            return Ok(0);
        }

        let script = device.compare_config(None);
        ctx.output.script(&script);
        ctx.output
            .info(&ScriptStats::from_script(&script).short_summary());
        Ok(0)
    }
}
