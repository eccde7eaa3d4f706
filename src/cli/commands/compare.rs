//! Compare command - offline diff of two configuration files

use super::{load_tree, CommandContext};
use clap::Parser;
use fortisync::diff::{colored_text_diff, compare, text_diff, ScriptStats};
use fortisync::error::Result;
use std::path::PathBuf;

/// Arguments for the compare command
#[derive(Parser, Debug, Clone)]
pub struct CompareArgs {
    /// File holding the current configuration
    #[arg(required = true)]
    pub running: PathBuf,

    /// File holding the desired configuration
    #[arg(required = true)]
    pub candidate: PathBuf,

    /// Print a line diff instead of the command script
    #[arg(long)]
    pub text: bool,

    /// Print a change summary after the script
    #[arg(long)]
    pub stat: bool,
}

impl CompareArgs {
    /// Execute the compare command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let running = load_tree(&self.running, "running", ctx.vdom())?;
        let candidate = load_tree(&self.candidate, "candidate", ctx.vdom())?;

        if self.text {
            let diff = if ctx.output.use_color() {
                colored_text_diff(&running, &candidate)
            } else {
                text_diff(&running, &candidate)
            };
            ctx.output.plain(&diff);
            return Ok(0);
        }

        let script = compare(&running, &candidate);
        ctx.output.script(&script);
        if self.stat {
            ctx.output.stats(&ScriptStats::from_script(&script));
        }
        Ok(0)
    }
}
