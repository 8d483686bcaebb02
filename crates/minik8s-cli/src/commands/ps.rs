//! `kubelet ps`: List containers managed by minik8s.

use clap::Args;
use minik8s_common::config::KubeletConfig;
use minik8s_common::constants::{CONTAINER_NAME_LABEL, POD_NAME_LABEL, POD_TYPE_LABEL};
use tokio_util::sync::CancellationToken;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Show all containers (including stopped).
    #[arg(short, long)]
    pub all: bool,
}

/// Executes the `ps` command.
///
/// # Errors
///
/// Returns an error if the engine cannot be queried.
pub async fn execute(args: PsArgs, config: &KubeletConfig) -> anyhow::Result<()> {
    let pods = super::orchestrator(config)?;
    let mut containers = pods.list_managed(&CancellationToken::new()).await?;
    if !args.all {
        containers.retain(|c| c.state == "running");
    }

    if containers.is_empty() {
        println!("No containers found.");
        return Ok(());
    }

    containers.sort_by(|a, b| a.name.cmp(&b.name));
    let label = |labels: &minik8s_runtime::labels::Labels, key: &str| {
        labels.get(key).cloned().unwrap_or_else(|| "-".to_string())
    };
    println!(
        "{:<14} {:<16} {:<16} {:<8} {:<10} {:<30}",
        "CONTAINER ID", "POD", "CONTAINER", "TYPE", "STATE", "IMAGE"
    );
    for c in &containers {
        println!(
            "{:<14} {:<16} {:<16} {:<8} {:<10} {:<30}",
            c.id.short(),
            label(&c.labels, POD_NAME_LABEL),
            label(&c.labels, CONTAINER_NAME_LABEL),
            label(&c.labels, POD_TYPE_LABEL),
            c.state,
            c.image
        );
    }

    Ok(())
}
