//! `legend`: Grafana dashboards and alerts from a YAML spec

mod commands;
mod grafonnet;

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use commands::{BuildOptions, Legend};
use legend_core::Settings;
use legend_grafana::FolderTarget;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Legend config file (defaults to $LEGEND_HOME/.legend.cfg)
    #[arg(short, long, global = true, env = "LEGEND_CONFIG")]
    config: Option<PathBuf>,

    /// More logging, repeat for trace output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clone or update the grafonnet library
    Install,

    /// Generate the dashboard JSON
    Build {
        #[command(flatten)]
        spec: SpecArgs,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate and publish the dashboard, then push the SLO if declared
    #[command(group(ArgGroup::new("folder_choice").args(["folder", "folder_id"])))]
    Apply {
        #[command(flatten)]
        spec: SpecArgs,

        /// Folder title, created when missing
        #[arg(long)]
        folder: Option<String>,

        /// Existing folder id
        #[arg(long)]
        folder_id: Option<i64>,
    },

    /// Delete a dashboard by uid
    Delete {
        #[arg(long)]
        uid: String,
    },

    /// List components with a metrics template
    Components,
}

#[derive(clap::Args, Debug)]
struct SpecArgs {
    /// Spec file
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Keep the generated jsonnet file
    #[arg(long)]
    keep_jsonnet: bool,

    /// Do not resolve alert channels against Grafana or clone grafonnet
    #[arg(long)]
    offline: bool,
}

impl From<SpecArgs> for BuildOptions {
    fn from(args: SpecArgs) -> Self {
        BuildOptions {
            spec: args.file,
            keep_jsonnet: args.keep_jsonnet,
            offline: args.offline,
        }
    }
}

fn folder_flag(folder: Option<String>, folder_id: Option<i64>) -> Option<FolderTarget> {
    folder
        .map(FolderTarget::Named)
        .or(folder_id.map(FolderTarget::Id))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    debug!(home = %settings.legend_home.display(), "Loaded settings");
    let legend = Legend::new(settings);

    match cli.command {
        Command::Install => {
            legend.install().await?;
        }
        Command::Build { spec, output } => {
            legend.build(&spec.into(), output.as_deref()).await?;
        }
        Command::Apply {
            spec,
            folder,
            folder_id,
        } => {
            legend
                .apply(&spec.into(), folder_flag(folder, folder_id))
                .await?;
        }
        Command::Delete { uid } => legend.delete(&uid).await?,
        Command::Components => {
            for component in legend.components() {
                println!("{}", component);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
