use std::io;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod format;
mod util;

use cli::{Cli, Commands};
use commands::{RecommendArgs, RulesArgs};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr so JSON on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let output = cli.output.as_ref();
    let explicit = cli.config.as_deref();

    // Loaded per command: `config` and `decode` must work even when the
    // file is missing or broken
    let load_config = || Config::load(explicit);

    match cli.command {
        Commands::Config { action } => {
            commands::cmd_config(action, explicit, cli.quiet)?;
        }
        Commands::Read { acquire, format } => {
            let config = load_config()?;
            commands::cmd_read(&config, &acquire, format, output, cli.quiet).await?;
        }
        Commands::Recommend {
            context,
            reading,
            acquire,
            area,
            unit,
            format,
        } => {
            let args = RecommendArgs {
                context,
                reading,
                acquire,
                area,
                unit,
                format,
            };
            let config = load_config()?;
            commands::cmd_recommend(&config, args, output, cli.quiet).await?;
        }
        Commands::Classify {
            moisture,
            ec,
            ph,
            format,
        } => {
            let config = load_config()?;
            commands::cmd_classify(&config, moisture, ec, ph, format, output)?;
        }
        Commands::Decode { hex, format } => {
            commands::cmd_decode(&hex, format, output)?;
        }
        Commands::Rules {
            file,
            explain,
            reading,
            season,
            weather,
            format,
        } => {
            let args = RulesArgs {
                file,
                explain,
                reading,
                season,
                weather,
                format,
            };
            let config = load_config()?;
            commands::cmd_rules(&config, args, output)?;
        }
    }

    Ok(())
}
