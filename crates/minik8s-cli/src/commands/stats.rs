//! `kubelet stats`: Show resource usage of a pod.

use std::path::PathBuf;

use clap::Args;
use minik8s_common::config::KubeletConfig;
use tokio_util::sync::CancellationToken;

use crate::output::format_bytes;

/// Arguments for the `stats` command.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Path to the pod manifest.
    pub file: PathBuf,

    /// UID of the running pod, if the manifest does not carry it.
    #[arg(long)]
    pub uid: Option<String>,

    /// Print the raw samples as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `stats` command.
///
/// # Errors
///
/// Returns an error if the engine cannot be queried.
pub async fn execute(args: StatsArgs, config: &KubeletConfig) -> anyhow::Result<()> {
    let pod = super::load_existing_pod(&args.file, args.uid.as_deref())?;
    let pods = super::orchestrator(config)?;
    let stats = pods.pod_stats(&pod, &CancellationToken::new()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    if stats.containers.is_empty() {
        println!("Pod {} has no containers.", pod.name());
        return Ok(());
    }

    println!("{:<24} {:>8} {:>12} {:>12}", "CONTAINER", "CPU %", "MEM", "LIMIT");
    for sample in &stats.containers {
        println!(
            "{:<24} {:>7.2}% {:>12} {:>12}",
            sample.container,
            sample.stats.cpu_percent(),
            format_bytes(sample.stats.memory_usage_bytes),
            format_bytes(sample.stats.memory_limit_bytes),
        );
    }
    println!(
        "{:<24} {:>7.2}% {:>12} {:>11.2}%",
        "TOTAL",
        stats.cpu_percent(),
        format_bytes(stats.memory_usage_bytes()),
        stats.memory_percent(),
    );

    Ok(())
}
