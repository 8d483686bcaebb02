//! CLI command definitions and dispatch.

pub mod kill;
pub mod logs;
pub mod plan;
pub mod ps;
pub mod pull;
pub mod run;
pub mod stats;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use minik8s_api::Pod;
use minik8s_common::config::KubeletConfig;
use minik8s_runtime::{DockerEngine, PodOrchestrator};

/// kubelet: run pods of containers on the local engine.
#[derive(Parser, Debug)]
#[command(name = minik8s_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the kubelet configuration file.
    #[arg(long, global = true, env = "MINIK8S_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create and start a pod from a manifest.
    Run(run::RunArgs),
    /// Stop and remove every container of a pod.
    Kill(kill::KillArgs),
    /// List containers managed by minik8s.
    Ps(ps::PsArgs),
    /// Print the output of one container of a pod.
    Logs(logs::LogsArgs),
    /// Show resource usage of a pod.
    Stats(stats::StatsArgs),
    /// Resolve an image under a pull policy.
    Pull(pull::PullArgs),
    /// Print the engine configs a pod would be created with.
    Plan(plan::PlanArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub async fn execute(cli: Cli, config: KubeletConfig) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run::execute(args, &config).await,
        Command::Kill(args) => kill::execute(args, &config).await,
        Command::Ps(args) => ps::execute(args, &config).await,
        Command::Logs(args) => logs::execute(args, &config).await,
        Command::Stats(args) => stats::execute(args, &config).await,
        Command::Pull(args) => pull::execute(args, &config).await,
        Command::Plan(args) => plan::execute(&args, &config),
    }
}

/// Builds an orchestrator bound to the configured engine.
///
/// The engine client connects lazily; no request is made here.
fn orchestrator(config: &KubeletConfig) -> anyhow::Result<PodOrchestrator> {
    let engine = DockerEngine::connect(&config.engine)?;
    Ok(PodOrchestrator::new(Arc::new(engine), config))
}

/// Loads a pod manifest, overriding its UID when one is given.
fn load_pod(path: &Path, uid: Option<&str>) -> anyhow::Result<Pod> {
    let mut pod = minik8s_api::manifest::load(path)?;
    if let Some(uid) = uid {
        pod.metadata.uid = uid.to_string();
    }
    Ok(pod)
}

/// Loads a pod manifest that must identify a live pod.
fn load_existing_pod(path: &Path, uid: Option<&str>) -> anyhow::Result<Pod> {
    let pod = load_pod(path, uid)?;
    if pod.uid().is_empty() {
        anyhow::bail!(
            "pod {:?} has no uid; pass --uid with the value printed by `run`",
            pod.name()
        );
    }
    Ok(pod)
}
