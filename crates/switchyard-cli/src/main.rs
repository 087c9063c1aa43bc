//! switchyard: operator front-end for a switchyard project.
//!
//! Every command is read-only with respect to the cloud: `plan` shows what
//! a deployment would do, `state` inspects or resets the local record, and
//! `scaling` evaluates the desired-count rules offline.
//!
//! ```text
//! switchyard plan --force --format json
//! switchyard state show api
//! switchyard scaling --running 7 --min 2 --max 5
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "switchyard",
    about = "Switchyard: zero-downtime deployments across function and container backends",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project configuration file.
    #[arg(long, global = true, default_value = "switchyard.toml")]
    config: PathBuf,

    /// Local state store.
    #[arg(long, global = true, default_value = ".switchyard/state.redb")]
    state: PathBuf,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which containers would deploy and why.
    Plan {
        /// Plan as if the deployment were forced.
        #[arg(long)]
        force: bool,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Inspect or reset persisted deployment records.
    State {
        #[command(subcommand)]
        action: StateAction,
    },
    /// Evaluate the desired instance count for the given inputs.
    Scaling {
        /// Currently running instances (unknown if omitted).
        #[arg(long)]
        running: Option<u32>,
        #[arg(long)]
        min: Option<u32>,
        #[arg(long)]
        max: Option<u32>,
        #[arg(long)]
        desired: Option<u32>,
        /// A target-tracking policy is declared.
        #[arg(long)]
        target: bool,
        /// A step-scaling policy is declared.
        #[arg(long)]
        step: bool,
    },
}

#[derive(Subcommand)]
enum StateAction {
    /// Print the snapshot persisted for a container.
    Show { container: String },
    /// Delete a container's snapshot so the next run deploys it from scratch.
    Forget { container: String },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,switchyard=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Commands::Plan { force, format } => commands::plan::plan(&cli.config, &cli.state, force, &format),
        Commands::State { action } => match action {
            StateAction::Show { container } => commands::state::show(&cli.state, &container),
            StateAction::Forget { container } => commands::state::forget(&cli.state, &container),
        },
        Commands::Scaling {
            running,
            min,
            max,
            desired,
            target,
            step,
        } => commands::scaling::scaling(switchyard_autoscale::ScalingInputs {
            running,
            min,
            max,
            desired,
            has_target: target,
            has_step: step,
        }),
    }
}
