//! `confiture` — command-line entry point (spec §6).

use clap::{Parser, Subcommand};
use confiture_cli::commands::{build, coordinate, lint, migrate, seed, sync};
use confiture_cli::{CliError, ConfitureConfig};
use confiture_core::{OutputFormat, Render};
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "confiture")]
#[command(author, version, about = "PostgreSQL schema-evolution system", long_about = None)]
struct Cli {
    /// Path to confiture.toml (default: walk up from the working directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format for the command's result
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the result to a file instead of stdout
    #[arg(long, global = true, value_name = "PATH")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the fingerprinted schema
    Build {
        #[arg(long, value_name = "dir|db")]
        from: Option<String>,
        #[arg(long, value_name = "dir|db")]
        to: Option<String>,
    },
    /// Migration ledger and engine operations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Seed applier and validator
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
    /// Schema linter and idempotency validator
    Lint {
        #[arg(long)]
        env: Option<String>,
        #[arg(long)]
        fail_on_warning: bool,
    },
    /// Production-data anonymisation sync
    Sync {
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        target: Option<String>,
        #[arg(long, value_name = "PATH")]
        anonymisation_profile: Option<String>,
    },
    /// Multi-agent coordination registry
    Coordinate {
        #[command(subcommand)]
        action: CoordinateAction,
    },
}

#[derive(Subcommand, Debug)]
enum MigrateAction {
    Up {
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        dry_run_execute: bool,
        #[arg(long)]
        force: bool,
    },
    Down {
        #[arg(long, default_value_t = 1)]
        steps: usize,
    },
    Status,
    Diff {
        from: String,
        to: String,
    },
    Validate {
        #[arg(long)]
        idempotent: bool,
        #[arg(long)]
        fix: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SeedAction {
    Apply {
        #[arg(long, value_name = "PATH")]
        seeds_dir: Option<String>,
    },
    Validate {
        #[arg(long)]
        consistency_check: bool,
        #[arg(long)]
        all_envs: bool,
        #[arg(long, value_name = "PATH")]
        seeds_dir: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum CoordinateAction {
    Init,
    Register {
        #[arg(long)]
        agent_id: String,
        #[arg(long)]
        workspace_tag: String,
        #[arg(long = "object", value_name = "schema.table[.column]")]
        objects: Vec<String>,
        #[arg(long)]
        operation: String,
    },
    Check {
        #[arg(long)]
        agent_id: String,
        #[arg(long = "object", value_name = "schema.table[.column]")]
        objects: Vec<String>,
        #[arg(long)]
        operation: String,
    },
    Status,
    Complete {
        intent_id: Uuid,
    },
    Abandon {
        intent_id: Uuid,
    },
    List {
        #[arg(long)]
        all: bool,
    },
    Conflicts,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("CONFITURE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn emit<R: Render>(result: &R, format: OutputFormat, output: &Option<PathBuf>) -> std::io::Result<()> {
    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)?;
            result.render(format, &mut file)
        }
        None => result.render(format, &mut std::io::stdout()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", confiture_cli::output::banner_error(&error.to_string()));
            ExitCode::from(error.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ConfitureConfig::load(cli.config.as_deref())?;
    let format = cli.format;
    let output = &cli.output;

    match cli.command {
        Command::Build { from, to } => {
            let result = build::run(&config, from.as_deref(), to.as_deref()).await?;
            emit(&result, format, output)?;
        }
        Command::Migrate { action } => match action {
            MigrateAction::Up { target, dry_run, dry_run_execute, force } => {
                if dry_run || dry_run_execute {
                    let result = migrate::dry_run(&config, target.as_deref()).await?;
                    emit(&result, format, output)?;
                } else {
                    let result = migrate::up(&config, target.as_deref(), force).await?;
                    emit(&result, format, output)?;
                }
            }
            MigrateAction::Down { steps } => {
                let result = migrate::down(&config, steps).await?;
                emit(&result, format, output)?;
            }
            MigrateAction::Status => {
                let result = migrate::status(&config).await?;
                emit(&result, format, output)?;
            }
            MigrateAction::Diff { from, to } => {
                let result = migrate::diff(&config, &from, &to).await?;
                emit(&result, format, output)?;
            }
            MigrateAction::Validate { idempotent: _, fix: _ } => {
                let result = migrate::validate(&config)?;
                emit(&result, format, output)?;
            }
        },
        Command::Seed { action } => match action {
            SeedAction::Apply { seeds_dir } => {
                let result = seed::apply(&config, seeds_dir.as_deref()).await?;
                emit(&result, format, output)?;
            }
            SeedAction::Validate { consistency_check: _, all_envs: _, seeds_dir } => {
                let result = seed::validate(&config, seeds_dir.as_deref()).await?;
                emit(&result, format, output)?;
            }
        },
        Command::Lint { env, fail_on_warning } => {
            let result = lint::run(&config, env.as_deref()).await?;
            emit(&result, format, output)?;
            if fail_on_warning && (result.has_errors || result.lint_count > 0) {
                return Err(CliError::Usage("lint findings present with --fail-on-warning".to_string()));
            }
        }
        Command::Sync { source, target, anonymisation_profile } => {
            let result = sync::run(&config, source.as_deref(), target.as_deref(), anonymisation_profile.as_deref()).await?;
            emit(&result, format, output)?;
        }
        Command::Coordinate { action } => match action {
            CoordinateAction::Init => {
                coordinate::init(&config).await?;
            }
            CoordinateAction::Register { agent_id, workspace_tag, objects, operation } => {
                let objects = objects
                    .iter()
                    .map(|o| coordinate::parse_object(o))
                    .collect::<Result<Vec<_>, _>>()?;
                let operation_class = coordinate::parse_operation_class(&operation)?;
                let result = coordinate::register(&config, &agent_id, &workspace_tag, objects, operation_class).await?;
                emit(&result, format, output)?;
            }
            CoordinateAction::Check { agent_id, objects, operation } => {
                let objects = objects
                    .iter()
                    .map(|o| coordinate::parse_object(o))
                    .collect::<Result<Vec<_>, _>>()?;
                let operation_class = coordinate::parse_operation_class(&operation)?;
                let result = coordinate::check(&config, &agent_id, objects, operation_class).await?;
                emit(&result, format, output)?;
            }
            CoordinateAction::Status => {
                let result = coordinate::status(&config).await?;
                emit(&result, format, output)?;
            }
            CoordinateAction::Complete { intent_id } => {
                let result = coordinate::complete(&config, intent_id).await?;
                emit(&result, format, output)?;
            }
            CoordinateAction::Abandon { intent_id } => {
                let result = coordinate::abandon(&config, intent_id).await?;
                emit(&result, format, output)?;
            }
            CoordinateAction::List { all } => {
                let result = coordinate::list(&config, !all).await?;
                emit(&result, format, output)?;
            }
            CoordinateAction::Conflicts => {
                let result = coordinate::conflicts(&config).await?;
                emit(&result, format, output)?;
            }
        },
    }

    Ok(())
}
