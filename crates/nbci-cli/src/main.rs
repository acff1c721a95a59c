//! nbci - local CI and workflow tooling for notebook repositories.
//!
//! ## Commands
//!
//! - `run`: simulate the notebook CI pipeline locally
//! - `validate-workflows`: static checks on workflow definition files
//! - `migrate`: apply the centralized workflow templates to a repository
//! - `validate-repo`: advisory migration-readiness score
//! - `act`: drive the act workflow runner directly
//!
//! All `run` options are also bound to the environment variables the CI
//! jobs use (`EXECUTION_MODE`, `SINGLE_NOTEBOOK`, ...), so exported CI
//! settings carry over unchanged.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

use nbci_core::{init_tracing, ExecutionMode, PipelineConfig};
use nbci_pipeline::{LocalCiPipeline, ProcessRunner};
use nbci_workflows::{
    migrate, run_act, validate_workflows, ActOptions, MigrateOptions, ValidatorOptions,
};

#[derive(Parser)]
#[command(name = "nbci")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Local CI and workflow tooling for notebook repositories", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, env = "VERBOSE")]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the local CI pipeline against the current repository
    Run {
        /// Target Python version
        #[arg(long, env = "PYTHON_VERSION", default_value = "3.11")]
        python_version: String,

        /// Notebook execution mode (validation-only, quick, full)
        #[arg(long, env = "EXECUTION_MODE", default_value = "validation-only")]
        execution_mode: String,

        /// Restrict validation (and execution, in executing modes) to
        /// this notebook
        #[arg(long, env = "SINGLE_NOTEBOOK")]
        single_notebook: Option<PathBuf>,

        /// Run the bandit security scan stage
        #[arg(long, env = "RUN_SECURITY_SCAN", default_value_t = true, action = ArgAction::Set)]
        run_security_scan: bool,

        /// Run the jupyter-book documentation build stage
        #[arg(long, env = "BUILD_DOCUMENTATION", default_value_t = true, action = ArgAction::Set)]
        build_documentation: bool,

        /// Assume the toolchain is already installed
        #[arg(long, env = "SKIP_DEPS", default_value_t = false, action = ArgAction::Set)]
        skip_deps: bool,
    },

    /// Statically validate the repository's workflow definition files
    ValidateWorkflows {
        /// Dry-run each workflow through act when installed
        #[arg(long, env = "VALIDATE_ACT", default_value_t = true, action = ArgAction::Set)]
        validate_act: bool,
    },

    /// Migrate a repository onto the centralized workflow templates
    Migrate {
        /// Target repository name
        repository: String,

        /// GitHub organization hosting the templates
        #[arg(default_value = "spacetelescope")]
        org: String,

        /// Push the migration branch after committing
        #[arg(long)]
        push: bool,
    },

    /// Score a repository's readiness for migration (advisory only)
    ValidateRepo {
        /// Target repository name
        repository: String,

        /// GitHub organization
        #[arg(default_value = "spacetelescope")]
        org: String,
    },

    /// Run workflows through act locally
    Act {
        /// Event to simulate
        #[arg(default_value = "pull_request")]
        event: String,

        /// Workflow file to run
        workflow: Option<PathBuf>,

        /// Job to run
        job: Option<String>,

        /// Plan only, execute nothing
        #[arg(long, env = "DRY_RUN", default_value_t = false, action = ArgAction::Set)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let workdir = std::env::current_dir().context("cannot resolve working directory")?;

    match cli.command {
        Commands::Run {
            python_version,
            execution_mode,
            single_notebook,
            run_security_scan,
            build_documentation,
            skip_deps,
        } => {
            // An unrecognized mode is fatal before any stage runs.
            let execution_mode = ExecutionMode::from_str(&execution_mode)
                .context("EXECUTION_MODE must be validation-only, quick, or full")?;

            let config = PipelineConfig {
                workdir,
                python_version,
                execution_mode,
                single_notebook,
                run_security_scan,
                build_documentation,
                skip_deps,
            };

            let result = LocalCiPipeline::run(&config, &ProcessRunner)
                .await
                .context("local CI pipeline failed")?;
            print!("{}", result.report.render_summary(&config));
            std::process::exit(result.exit_code());
        }

        Commands::ValidateWorkflows { validate_act } => {
            let options = ValidatorOptions {
                validate_act,
                verbose: cli.verbose,
            };
            let verdict = validate_workflows(&workdir, &options, &ProcessRunner)
                .await
                .context("workflow validation failed")?;
            print!("{}", verdict.render());
            std::process::exit(verdict.exit_code());
        }

        Commands::Migrate {
            repository,
            org,
            push,
        } => {
            let options = MigrateOptions {
                repo: repository,
                org,
                push,
            };
            let outcome = migrate(&workdir, &options)
                .await
                .context("migration failed")?;
            println!("Migrated on branch {}", outcome.branch);
            println!(
                "Installed {} workflow(s), backed up {}",
                outcome.installed.len(),
                outcome.backed_up.len()
            );
            println!("Status report: {}", outcome.status_path.display());
            Ok(())
        }

        Commands::ValidateRepo { repository, org } => {
            let report = nbci_workflows::assess(&workdir, &repository, &org);
            print!("{}", report.render());
            // Advisory only: the score never fails the process.
            Ok(())
        }

        Commands::Act {
            event,
            workflow,
            job,
            dry_run,
        } => {
            let options = ActOptions {
                event,
                workflow,
                job,
                dry_run,
                verbose: cli.verbose,
            };
            let code = run_act(&workdir, &options, &ProcessRunner).await?;
            std::process::exit(code);
        }
    }
}
