//! Show command - print the device configuration under a path

use super::CommandContext;
use clap::Parser;
use fortisync::error::Result;
use fortisync::session::LoadInto;

/// Arguments for the show command
#[derive(Parser, Debug, Clone)]
pub struct ShowArgs {
    /// Configuration path, e.g. "router bgp"
    #[arg(required = true)]
    pub path: String,
}

impl ShowArgs {
    /// Execute the show command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let mut device = ctx.connect().await?;
        let loaded = device.load_config(&self.path, LoadInto::Running).await;
        let closed = device.close().await;
        loaded?;
        closed?;

        ctx.output.plain(&device.running().to_text());
        Ok(0)
    }
}
