mod config;
mod response;
mod run_cmd;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use config::{OpticConfig, Overrides};

#[derive(Parser)]
#[command(name = "optic", about = "HTTP front end for an external PDDL planner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Planner settings shared by every subcommand.
#[derive(Args, Debug)]
struct PlannerArgs {
    /// Path to the planner executable (overrides OPTIC_PLANNER_PATH)
    #[arg(long)]
    planner: Option<PathBuf>,
    /// Per-invocation timeout in seconds (overrides OPTIC_PLANNER_TIMEOUT_SECS)
    #[arg(long)]
    timeout: Option<u64>,
    /// Directory to create per-request workspaces in (defaults to the OS temp dir)
    #[arg(long)]
    workspace_root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve POST /plan and GET /ping over HTTP
    Serve {
        /// Address to bind (overrides OPTIC_BIND)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides OPTIC_PORT)
        #[arg(long)]
        port: Option<u16>,
        #[command(flatten)]
        planner: PlannerArgs,
    },
    /// Write an optic config file
    Init {
        #[command(flatten)]
        planner: PlannerArgs,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Run the planner once on local files and print the response as JSON
    Run {
        /// Domain PDDL file
        domain: PathBuf,
        /// Problem PDDL file
        problem: PathBuf,
        #[command(flatten)]
        planner: PlannerArgs,
    },
}

impl PlannerArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            planner: self.planner.clone(),
            timeout_secs: self.timeout,
            workspace_root: self.workspace_root.clone(),
            ..Default::default()
        }
    }
}

/// Execute the `optic init` command: write config file.
fn cmd_init(args: &PlannerArgs, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        server: config::ServerSection {
            bind: Some(config::DEFAULT_BIND.to_string()),
            port: Some(config::DEFAULT_PORT),
            max_body_bytes: None,
        },
        planner: config::PlannerSection {
            path: Some(
                args.planner
                    .clone()
                    .unwrap_or_else(|| optic_core::PlannerConfig::DEFAULT_EXECUTABLE.into()),
            ),
            timeout_secs: Some(
                args.timeout
                    .unwrap_or(optic_core::PlannerConfig::DEFAULT_TIMEOUT_SECS),
            ),
            workspace_root: args.workspace_root.clone(),
        },
    };

    let written = config::save_config(&cfg)?;

    println!("Config written to {}", written.display());
    if let Some(planner) = &cfg.planner.path {
        println!("  planner.path = {}", planner.display());
    }
    if let Some(timeout) = cfg.planner.timeout_secs {
        println!("  planner.timeout_secs = {timeout}");
    }
    println!();
    println!("Next: run `optic serve` to start the service.");

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            port,
            planner,
        } => {
            let overrides = Overrides {
                bind,
                port,
                ..planner.overrides()
            };
            let resolved = OpticConfig::resolve(&overrides)?;
            serve_cmd::run_serve(resolved).await?;
        }
        Commands::Init { planner, force } => {
            cmd_init(&planner, force)?;
        }
        Commands::Run {
            domain,
            problem,
            planner,
        } => {
            let resolved = OpticConfig::resolve(&planner.overrides())?;
            let ok = run_cmd::run_once(resolved.service, &domain, &problem).await?;
            if !ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
