//! `kubelet run`: Create and start a pod.

use std::path::PathBuf;

use clap::Args;
use minik8s_common::config::KubeletConfig;
use tokio_util::sync::CancellationToken;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the pod manifest (YAML or JSON).
    pub file: PathBuf,

    /// Use this pod UID instead of the manifest's or a generated one.
    #[arg(long)]
    pub uid: Option<String>,

    /// Return once the pod is started instead of waiting for Ctrl+C.
    #[arg(short, long)]
    pub detach: bool,
}

/// Executes the `run` command.
///
/// Ctrl+C during creation cancels the in-flight engine call. Creation
/// performs no rollback; use `kill` to clean up a partial pod. Without
/// `--detach`, a later Ctrl+C tears the pod down.
///
/// # Errors
///
/// Returns an error if the manifest is invalid or pod creation fails.
pub async fn execute(args: RunArgs, config: &KubeletConfig) -> anyhow::Result<()> {
    let mut pod = super::load_pod(&args.file, args.uid.as_deref())?;
    let uid = pod.ensure_uid().to_string();
    let pods = super::orchestrator(config)?;

    let interrupt = CancellationToken::new();
    let handler = interrupt.clone();
    ctrlc::set_handler(move || handler.cancel())
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let sandbox = pods.create_pod(&pod, &interrupt).await.map_err(|e| {
        anyhow::anyhow!(
            "{e}\nthe pod may be partially created; clean up with: kubelet kill {} --uid {uid}",
            args.file.display()
        )
    })?;

    println!("pod {} started", pod.name());
    println!("  uid:     {uid}");
    println!("  sandbox: {sandbox}");
    for container in pod.spec.all_containers() {
        println!("  - {} ({})", container.name, container.image);
    }

    if args.detach {
        return Ok(());
    }

    eprintln!("Press Ctrl+C to stop the pod...");
    interrupt.cancelled().await;
    eprintln!("Stopping pod {}...", pod.name());
    pods.kill_pod(&pod, &CancellationToken::new()).await?;
    println!("pod {} removed", pod.name());
    Ok(())
}
