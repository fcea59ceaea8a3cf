mod commands;
mod context;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use context::Context;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lift")]
#[command(
    about = "Declarative Amazon GameLift fleets and scaling policies from KDL manifests",
    long_about = None
)]
struct Cli {
    /// Manifest to use instead of searching for lift.kdl
    #[arg(short, long, global = true, env = "LIFT_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the manifest without contacting AWS
    Validate,
    /// Show what apply would change
    Plan,
    /// Create, update and delete resources to match the manifest
    Apply {
        /// Apply without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete managed resources
    Destroy {
        /// Only destroy this resource (type:name, e.g. fleet:arena)
        #[arg(short, long)]
        target: Option<String>,
        /// Destroy without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Track an existing resource under a manifest name
    Import {
        /// Resource type (fleet, scaling_policy)
        resource_type: String,
        /// Name of the resource in the manifest
        name: String,
        /// Remote id (fleet id, or fleet-id/policy-name for scaling policies)
        id: String,
    },
    /// Re-read tracked resources and update the state file
    Refresh,
    /// Show tracked resources from the state file
    Show,
    /// Show version information
    Version,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn,liftflow_cloud=info,liftflow_gamelift=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Version does not need a manifest
    if matches!(cli.command, Commands::Version) {
        println!("liftflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let manifest_path = cli.config.filter(|p| !p.as_os_str().is_empty());
    let ctx = Context::load(manifest_path.as_deref())?;
    let manifest = &ctx.project.manifest;

    match cli.command {
        Commands::Validate => {
            let config = ctx.provider_config()?;
            commands::validate::handle(&ctx.project, &config)?;
        }
        Commands::Show => {
            commands::show::handle(&ctx.project, &ctx.state).await?;
        }
        Commands::Plan => {
            let provider = ctx.connect().await?;
            commands::plan::handle(provider.as_ref(), manifest, &ctx.state).await?;
        }
        Commands::Apply { yes } => {
            let provider = ctx.connect().await?;
            commands::apply::handle(provider.as_ref(), manifest, &ctx.state, yes).await?;
        }
        Commands::Destroy { target, yes } => {
            let provider = ctx.connect().await?;
            commands::destroy::handle(provider.as_ref(), &ctx.state, target.as_deref(), yes)
                .await?;
        }
        Commands::Import {
            resource_type,
            name,
            id,
        } => {
            let provider = ctx.connect().await?;
            commands::import::handle(
                provider.as_ref(),
                manifest,
                &ctx.state,
                &resource_type,
                &name,
                &id,
            )
            .await?;
        }
        Commands::Refresh => {
            let provider = ctx.connect().await?;
            commands::refresh::handle(provider.as_ref(), &ctx.state).await?;
        }
        Commands::Version => unreachable!("Version is handled before loading the manifest"),
    }

    Ok(())
}
