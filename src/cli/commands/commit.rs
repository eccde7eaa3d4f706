//! Commit command - push a candidate file to the device
//!
//! Loads the running configuration under a path, diffs it against the
//! candidate file and commits the result with retry and rollback.

use super::{load_tree, CommandContext};
use clap::Parser;
use fortisync::diff::compare;
use fortisync::error::{Error, Result};
use fortisync::session::LoadInto;
use fortisync::tree::apply_script;
use std::path::PathBuf;

/// Arguments for the commit command
#[derive(Parser, Debug, Clone)]
pub struct CommitArgs {
    /// Configuration path to load from the device, e.g. "router bgp"
    #[arg(required = true)]
    pub path: String,

    /// File holding the desired configuration
    #[arg(long, required = true)]
    pub candidate: PathBuf,

    /// Keep changes even when some commands fail
    #[arg(long)]
    pub force: bool,

    /// Print the script and its simulated effect without sending it
    #[arg(long)]
    pub dry_run: bool,

    /// Print the commit report as JSON
    #[arg(long)]
    pub json: bool,
}

impl CommitArgs {
    /// Execute the commit command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let candidate = load_tree(&self.candidate, "candidate", ctx.vdom())?;

        let mut device = ctx.connect().await?;
        if let Err(e) = device.load_config(&self.path, LoadInto::Running).await {
            let _ = device.close().await;
            return Err(e);
        }
        device.set_candidate(candidate);

        if self.dry_run {
            device.close().await?;
            return self.dry_run(ctx, &device);
        }

        let result = device.commit(None, self.force).await;
        let closed = device.close().await;

        ctx.output.set_json(self.json);

        match result {
            Ok(report) => {
                ctx.output.report(&report);
                closed?;
                Ok(0)
            }
            Err(Error::CommitFailed { failed, rolled_back }) => {
                for command in &failed {
                    ctx.output.warning(&format!("failed: {}", command));
                }
                if !rolled_back {
                    ctx.output
                        .warning("rollback did not complete; the device may hold partial changes");
                }
                Err(Error::CommitFailed { failed, rolled_back })
            }
            Err(e) => Err(e),
        }
    }

    fn dry_run(&self, ctx: &CommandContext, device: &fortisync::session::FortiDevice) -> Result<i32> {
        let script = compare(device.running(), device.candidate());
        if script.is_empty() {
            ctx.output.info("Nothing to commit");
            return Ok(0);
        }

        ctx.output.section("Script");
        ctx.output.script(&script);

        let mut simulated = device.running().clone();
        apply_script(&mut simulated, &script)?;
        ctx.output.section("Result");
        ctx.output.plain(&simulated.to_text());

        if !compare(&simulated, device.candidate()).is_empty() {
            ctx.output
                .warning("simulated result differs from the candidate");
        }
        Ok(0)
    }
}
