//! fortisync - diff and commit appliance configuration
//!
//! This is the main entry point for the fortisync CLI.

mod cli;

use cli::commands::CommandContext;
use cli::{Cli, Commands};
use fortisync::config::{Config, LogFormat};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {:#}", e);
        Config::default()
    });

    let mut ctx = CommandContext::new(&cli, config);
    init_logging(
        cli.verbosity(),
        &ctx.config.logging.level,
        ctx.config.logging.format,
    );
    tracing::debug!(version = VERSION, "fortisync starting");

    let result = match &cli.command {
        Commands::Show(args) => args.execute(&mut ctx).await,
        Commands::Diff(args) => args.execute(&mut ctx).await,
        Commands::Commit(args) => args.execute(&mut ctx).await,
        Commands::Render(args) => args.execute(&mut ctx).await,
        Commands::Compare(args) => args.execute(&mut ctx).await,
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&e.to_string());
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8, default_level: &str, format: LogFormat) {
    let filter = match verbosity {
        0 => default_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(verbosity >= 3)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
