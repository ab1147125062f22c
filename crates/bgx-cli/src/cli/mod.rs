//! CLI for the BGX background transfer core.

mod commands;

use anyhow::Result;
use bgx_core::config;
use clap::{Parser, Subcommand};

use commands::{run_completions, run_config, run_man, run_simulate, SimulateOptions};

/// Top-level CLI for BGX.
#[derive(Debug, Parser)]
#[command(name = "bgx")]
#[command(about = "BGX: background execution and progress notifications for transfers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a scripted transfer against the in-memory platform and report what the OS saw.
    Simulate {
        /// Number of progress reports the engine sends.
        #[arg(long, default_value = "20", value_name = "N")]
        steps: u32,
        /// Delay between progress reports, in milliseconds.
        #[arg(long, default_value = "100", value_name = "MS")]
        step_ms: u64,
        /// Expire the execution grant (as the OS would) when this step is reached.
        #[arg(long, value_name = "STEP")]
        expire_at: Option<u32>,
        /// Answer the permission prompt with a denial.
        #[arg(long)]
        deny_permission: bool,
        /// Refuse every background execution grant.
        #[arg(long)]
        refuse_grant: bool,
        /// Install the foreground presenter (delegate chain) before starting.
        #[arg(long)]
        foreground_display: bool,
    },

    /// Show the config file path and the effective configuration.
    Config,

    /// Print shell completions to stdout.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },

    /// Print the man page (roff) to stdout.
    Man,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Simulate {
                steps,
                step_ms,
                expire_at,
                deny_permission,
                refuse_grant,
                foreground_display,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                let opts = SimulateOptions {
                    steps,
                    step_ms,
                    expire_at,
                    deny_permission,
                    refuse_grant,
                    foreground_display,
                };
                run_simulate(&cfg, &opts).await?;
            }
            CliCommand::Config => run_config()?,
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
