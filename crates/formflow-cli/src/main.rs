//! formflow CLI entry point.
//!
//! Binary name: `formflow`
//!
//! Parses CLI arguments, sets up tracing, loads configuration, then
//! dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::form::Output;
use cli::{Cli, Commands};
use formflow_observe::{LogFormat, init_tracing, shutdown_tracing};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,formflow_core=debug,formflow_infra=debug",
        _ => "trace",
    };
    let format = if cli.log_json { LogFormat::Json } else { LogFormat::Text };
    init_tracing(filter, format, cli.otel).map_err(|e| anyhow::anyhow!(e))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "formflow", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.api_url.clone(), cli.policy.map(Into::into)).await?;
    let out = Output {
        json: cli.json,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Show { id } => cli::form::show(&state, id, out).await?,

        Commands::Plan {
            form_version,
            actions,
        } => {
            cli::form::plan(&state, &form_version, actions.as_deref(), out).await?;
        }

        Commands::Push { id, actions } => cli::form::push(&state, id, &actions, out).await?,

        Commands::Publish { id } => cli::form::publish(&state, id, out).await?,

        Commands::NewVersion {
            form_id,
            copy_from_current,
        } => {
            cli::form::new_version(&state, form_id, copy_from_current, out).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
