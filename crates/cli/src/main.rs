mod commands;
mod settings;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::{cmd_deploy, cmd_diff, cmd_graph, cmd_plan, cmd_synth};
use settings::SettingsArgs;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Synthesize and plan the serverless CI/CD stack.
#[derive(Parser)]
#[command(
    name = "cicd-stack",
    version,
    about = "Synthesize and plan the serverless CI/CD stack"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log debug events to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the stack and print its template
    Synth {
        #[command(flatten)]
        settings: SettingsArgs,
        /// Wrap the template in a manifest with a content etag
        #[arg(long)]
        manifest: bool,
        /// Write the result to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the resource graph: provisioning layers and dependency edges
    Graph {
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Diff two synthesized templates
    Diff {
        /// Path to the previous template JSON
        old: PathBuf,
        /// Path to the new template JSON
        new: PathBuf,
    },

    /// Show the changes a deployment would make over a deployed state
    Plan {
        #[command(flatten)]
        settings: SettingsArgs,
        /// Deployed state JSON (as written by `deploy --state-out`)
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Converge the stack against the in-memory provider and print the Url
    Deploy {
        #[command(flatten)]
        settings: SettingsArgs,
        /// Previously deployed state to converge from
        #[arg(long)]
        state: Option<PathBuf>,
        /// Write the resulting state here
        #[arg(long)]
        state_out: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Synth {
            settings,
            manifest,
            out,
        } => {
            cmd_synth(&settings, manifest, out.as_deref(), cli.output, cli.quiet);
        }
        Commands::Graph { settings } => {
            cmd_graph(&settings, cli.output, cli.quiet);
        }
        Commands::Diff { old, new } => {
            cmd_diff(&old, &new, cli.output, cli.quiet);
        }
        Commands::Plan { settings, state } => {
            cmd_plan(&settings, state.as_deref(), cli.output, cli.quiet);
        }
        Commands::Deploy {
            settings,
            state,
            state_out,
        } => {
            cmd_deploy(
                &settings,
                state.as_deref(),
                state_out.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` applies unless `--verbose`
/// forces debug.
fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        let default = if quiet { "error" } else { "warn" };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

/// Report a structured synthesis error and exit 1.
pub(crate) fn exit_with_synth_error(
    e: &cicd_stack_core::SynthError,
    output: OutputFormat,
    quiet: bool,
) -> ! {
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::to_string_pretty(&e.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", e));
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("error: {}", e);
            }
        }
    }
    process::exit(1);
}

/// Report a plain error message and exit 1.
pub(crate) fn exit_with_error(msg: &str, output: OutputFormat, quiet: bool) -> ! {
    report_error(msg, output, quiet);
    process::exit(1);
}
