mod config;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use config::{DaemonConfig, RuntimeKind};
use drover_core::agents::Agents;
use drover_core::containers::{Containers, DockerContainers, MemoryContainers};
use drover_core::docker::DockerRun;
use drover_core::notify::LogNotifier;
use drover_core::pulse::Pulse;
use drover_core::queue::{MemoryQueue, Queue};
use drover_core::routine::Routine;
use drover_core::store::{DiskTalks, MemoryTalks, Talks};
use drover_core::talk::ReqKind;
use drover_core::toggles::Toggles;
use drover_server::state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "drover",
    about = "Container-based CI/CD orchestrator — queue build requests, run them in containers, watch the herd",
    version,
    propagate_version = true
)]
struct Cli {
    /// Daemon configuration file
    #[arg(long, global = true, env = "DROVER_CONFIG", default_value = "drover.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler and its dashboard
    Run,

    /// Resolve a project's profile and print the container invocation it
    /// would produce, without running anything
    Check {
        /// Project coordinates, e.g. acme/widget
        #[arg(long)]
        project: String,

        /// Request kind: merge, deploy or release
        #[arg(long, default_value = "merge")]
        kind: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = DaemonConfig::load(&cli.config)?;

    match cli.command {
        Commands::Run => run(config),
        Commands::Check { project, kind } => check(&config, &project, &kind),
    }
}

fn run(config: DaemonConfig) -> anyhow::Result<()> {
    let talks: Arc<dyn Talks> = match &config.talks_dir {
        Some(dir) => Arc::new(DiskTalks::open(dir)?),
        None => Arc::new(MemoryTalks::new()),
    };
    let queue = Arc::new(MemoryQueue::new());
    let pulse = Arc::new(Pulse::new(config.ticks_capacity));
    let toggles = Arc::new(Toggles::new());
    let profiles = Arc::new(config.profiles()?);
    let containers: Arc<dyn Containers> = match config.runtime {
        RuntimeKind::Docker => Arc::new(DockerContainers::new()),
        RuntimeKind::Memory => Arc::new(MemoryContainers::new()),
    };
    let agents = Agents::new(
        Arc::clone(&queue) as Arc<dyn Queue>,
        containers,
        Arc::new(LogNotifier),
    )
    .with_default_image(&config.default_image);
    let routine = Arc::new(
        Routine::new(
            Arc::clone(&talks),
            agents,
            profiles,
            Arc::clone(&pulse),
            Arc::clone(&toggles),
            config.interval(),
        )
        .with_backoff(config.backoff()),
    );

    tracing::info!(
        store = if config.talks_dir.is_some() { "disk" } else { "memory" },
        runtime = ?config.runtime,
        interval_secs = config.interval_secs,
        "starting drover"
    );
    let worker = {
        let routine = Arc::clone(&routine);
        std::thread::spawn(move || routine.run())
    };

    let state = AppState::new(
        talks,
        queue,
        pulse,
        toggles,
        Arc::clone(&routine),
        config.admin_token.clone(),
    );
    let result = tokio::runtime::Runtime::new()?.block_on(drover_server::serve(state, &config.listen));

    routine.close();
    worker
        .join()
        .map_err(|_| anyhow!("routine thread panicked"))?;
    result
}

fn check(config: &DaemonConfig, project: &str, kind: &str) -> anyhow::Result<()> {
    let kind: ReqKind = kind.parse()?;
    let profiles = config.profiles()?;
    let profile = profiles.fetch(project)?;
    let run = DockerRun::new(&profile, &[kind.as_str()]);
    let image = profile
        .lookup(&[kind.as_str()], "image")
        .and_then(|v| v.as_str())
        .unwrap_or(&config.default_image)
        .to_string();
    println!("image:  {image}");
    println!("envs:   {}", run.envs(&[])?);
    println!("script: {}", run.script()?);
    Ok(())
}
