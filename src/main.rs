//! sprint-flow: sprint workstream orchestration on git worktrees
//!
//! Every invocation runs one command against the sprint state of the
//! repository containing the current directory.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sprint_flow::domain::{ExecutionMode, Project};
use sprint_flow::{report, App, AppError, CleanupTarget};

/// Sprint workstream orchestration on git worktrees
#[derive(Parser)]
#[command(name = "sprint-flow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Never touch the network; push and pull are logged only
    #[arg(long, global = true)]
    simulate_remote: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a sprint plan and write the sprint state
    Analyze {
        /// Path to the sprint plan
        plan: PathBuf,
    },

    /// Switch the execution mode of the current sprint
    SetMode {
        /// standard or local-simulation
        mode: ExecutionMode,
    },

    /// Create a branch and worktree for every workstream
    Create {
        /// Path to the sprint plan
        plan: PathBuf,

        /// Merge locally instead of through the remote
        #[arg(long)]
        local_simulation: bool,
    },

    /// Start or continue work on a workstream
    Resume { name: String },

    /// Mark a workstream's tasks as done
    Complete { name: String },

    /// Push a workstream branch to the remote
    Push { name: String },

    /// Merge a workstream into trunk after the quality checks pass
    MergeLocal { name: String },

    /// Show the sprint state
    Status,

    /// Merge the latest trunk into every workstream
    SyncAll,

    /// Remove worktrees, branches and the sprint state
    Cleanup(CleanupArgs),
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct CleanupArgs {
    /// Workstream to remove
    name: Option<String>,

    /// Remove every workstream and reset trunk in local-simulation mode
    #[arg(long)]
    all: bool,
}

impl CleanupArgs {
    fn target(self) -> CleanupTarget {
        match self.name {
            Some(name) if !self.all => CleanupTarget::Workstream(name),
            _ => CleanupTarget::All,
        }
    }
}

/// Initialize logging with RUST_LOG environment variable support
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let project_root = Project::discover(None)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    tracing::debug!("Using project root {:?}", project_root);

    let app = App::new(project_root.clone(), cli.simulate_remote)
        .with_context(|| format!("Failed to open project at {}", project_root.display()))?;

    match cli.command {
        Commands::Analyze { plan } => {
            let analysis = app.analyze(&plan)?;
            println!("{}", report::render_analysis(&analysis));
        }
        Commands::SetMode { mode } => {
            app.set_mode(mode)?;
            println!("Execution mode: {}", mode);
        }
        Commands::Create {
            plan,
            local_simulation,
        } => {
            let state = app.create_workstreams(&plan, local_simulation)?;
            println!("{}", report::render_status(&state));
        }
        Commands::Resume { name } => {
            let record = app.resume(&name)?;
            let worktree = app.project.resolve(&record.worktree);
            println!("{}", report::render_resume(&record, &worktree));
        }
        Commands::Complete { name } => {
            let record = app.complete(&name)?;
            let local = app.status()?.is_local_simulation();
            println!("{}", report::render_completed(&record, local));
        }
        Commands::Push { name } => {
            let outcome = app.push(&name)?;
            println!("{}", report::render_push(&outcome));
        }
        Commands::MergeLocal { name } => {
            let record = app.merge_local(&name)?;
            println!("Merged {} into {}", record.branch, app.project.trunk_branch);
        }
        Commands::Status => {
            let state = app.status()?;
            println!("{}", report::render_status(&state));
        }
        Commands::SyncAll => {
            let summary = app.sync_all()?;
            println!("{}", report::render_sync(&summary));
        }
        Commands::Cleanup(args) => {
            let summary = app.cleanup(&args.target())?;
            println!("{}", report::render_cleanup(&summary));
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err
                .downcast_ref::<AppError>()
                .map_or(1, |e| e.kind().exit_code());
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
