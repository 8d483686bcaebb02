//! `kubelet kill`: Tear down a pod.

use std::path::PathBuf;

use clap::Args;
use minik8s_common::config::KubeletConfig;
use tokio_util::sync::CancellationToken;

/// Arguments for the `kill` command.
#[derive(Args, Debug)]
pub struct KillArgs {
    /// Path to the pod manifest.
    pub file: PathBuf,

    /// UID of the running pod, if the manifest does not carry it.
    #[arg(long)]
    pub uid: Option<String>,
}

/// Executes the `kill` command.
///
/// Every container is removed concurrently; the sandbox goes last and
/// only if all removals succeeded.
///
/// # Errors
///
/// Returns an error listing every container that could not be removed.
pub async fn execute(args: KillArgs, config: &KubeletConfig) -> anyhow::Result<()> {
    let pod = super::load_existing_pod(&args.file, args.uid.as_deref())?;
    let pods = super::orchestrator(config)?;
    pods.kill_pod(&pod, &CancellationToken::new()).await?;
    println!("pod {} removed", pod.name());
    Ok(())
}
