//! `kubelet logs`: Print the output of a pod container.

use std::path::PathBuf;

use clap::Args;
use minik8s_common::config::KubeletConfig;
use tokio_util::sync::CancellationToken;

/// Arguments for the `logs` command.
#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Path to the pod manifest.
    pub file: PathBuf,

    /// Container name within the pod.
    pub container: String,

    /// UID of the running pod, if the manifest does not carry it.
    #[arg(long)]
    pub uid: Option<String>,
}

/// Executes the `logs` command.
///
/// # Errors
///
/// Returns an error if the container is not found or logs are unavailable.
pub async fn execute(args: LogsArgs, config: &KubeletConfig) -> anyhow::Result<()> {
    let pod = super::load_existing_pod(&args.file, args.uid.as_deref())?;
    let pods = super::orchestrator(config)?;
    let logs = pods
        .container_logs(&pod, &args.container, &CancellationToken::new())
        .await?;

    if logs.is_empty() {
        println!("No logs available for container: {}", args.container);
    } else {
        print!("{logs}");
    }

    Ok(())
}
