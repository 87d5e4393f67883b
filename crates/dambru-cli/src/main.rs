//! CLI entry point.
//!
//! Settings are resolved once through bootstrap; command dispatch routes to
//! handlers which build the adapters they need.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use dambru_cli::handlers::talk::TalkArgs;
use dambru_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::load(cli.env_file.as_deref())?;
    let ctx = bootstrap(config)?;

    match command {
        Commands::Personas => handlers::personas::execute(&ctx)?,
        Commands::Devices => handlers::devices::execute()?,
        Commands::Talk {
            persona,
            model,
            frame_size,
        } => {
            handlers::talk::execute(
                &ctx,
                TalkArgs {
                    persona,
                    model,
                    frame_size,
                },
            )
            .await?;
        }
        Commands::Search { query, persona } => {
            handlers::search::execute(&ctx, &query, persona.as_deref()).await?;
        }
    }

    Ok(())
}
