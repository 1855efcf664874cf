mod configuration;
mod error;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use configuration::Settings;
use planner::agent::PlanningAgent;
use planner::artifacts::{ArtifactStore, FileArtifactStore};
use planner::delegation::QueueDelegate;
use planner::prompt_template::planning_prompt_from_file;
use planner::providers::openai::OpenAiProvider;
use planner::tools::UpdateArtifact;
use session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file, overridden by PLANNER_* environment variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Directory the artifacts are written to
    #[arg(long, global = true)]
    artifacts_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive planning session
    Session,

    /// Send a single message and print the reply
    Run {
        /// The message to send
        #[arg(short, long)]
        text: String,
    },

    /// Show the milestones of the saved plan
    Milestones,

    /// Check off a milestone of the saved plan
    Complete {
        /// Number of the milestone
        number: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings =
        Settings::new(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(model) = cli.model {
        settings.generation.model = model;
    }
    if let Some(dir) = cli.artifacts_dir {
        settings.artifacts.dir = dir;
    }

    let store: Arc<dyn ArtifactStore> = Arc::new(FileArtifactStore::new(&settings.artifacts.dir));

    match cli.command.unwrap_or(Command::Session) {
        Command::Milestones => session::print_milestones(store.as_ref()).await,
        Command::Complete { number } => {
            let line = session::complete_milestone(store.as_ref(), number).await?;
            println!("{}", line);
            Ok(())
        }
        Command::Session => build_session(settings, store)?.start().await,
        Command::Run { text } => build_session(settings, store)?.headless_start(text).await,
    }
}

fn build_session(settings: Settings, store: Arc<dyn ArtifactStore>) -> Result<Session> {
    let provider = OpenAiProvider::new(settings.provider.into_config())?;
    let mut agent = PlanningAgent::new(Box::new(provider), settings.generation)?;

    if let Some(prompt_file) = &settings.agent.prompt_file {
        agent.set_system_prompt(planning_prompt_from_file(prompt_file)?);
    }
    agent.add_tool(Box::new(
        UpdateArtifact::new(store.clone()).with_policy(settings.tools.incomplete_calls),
    ))?;

    let (delegate, delegations) = QueueDelegate::channel();
    agent.set_delegate(Box::new(delegate));

    Ok(Session::new(agent, store, delegations))
}
