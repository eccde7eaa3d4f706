//! Render command - parse a local file and print it normalized

use super::{load_tree, CommandContext};
use clap::Parser;
use fortisync::error::Result;
use std::path::PathBuf;

/// Arguments for the render command
#[derive(Parser, Debug, Clone)]
pub struct RenderArgs {
    /// Configuration file
    #[arg(required = true)]
    pub file: PathBuf,

    /// Leave out blocks without parameters or children
    #[arg(long)]
    pub collapse_empty: bool,
}

impl RenderArgs {
    /// Execute the render command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let mut tree = load_tree(&self.file, "config", None)?;
        if self.collapse_empty {
            let root = tree.root();
            let removed = tree.prune_empty(root);
            ctx.output.info(&format!("Dropped {} empty block(s)", removed));
        }
        let text = fortisync::tree::render::render(&tree, tree.root(), false, 0, self.collapse_empty);
        ctx.output.plain(&text);
        Ok(0)
    }
}
