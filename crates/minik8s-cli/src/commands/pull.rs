//! `kubelet pull`: Resolve an image under a pull policy.

use clap::Args;
use minik8s_common::config::KubeletConfig;
use minik8s_common::types::ImagePullPolicy;
use tokio_util::sync::CancellationToken;

/// Arguments for the `pull` command.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Image reference, e.g. `nginx:latest`.
    pub image: String,

    /// `Always`, `IfNotPresent`, or `Never`.
    #[arg(long, default_value_t = ImagePullPolicy::IfNotPresent)]
    pub policy: ImagePullPolicy,

    /// Remove the image instead of pulling it.
    #[arg(long, conflicts_with = "policy")]
    pub remove: bool,
}

/// Executes the `pull` command.
///
/// # Errors
///
/// Returns an error if the image is absent and the policy forbids
/// pulling, or if the engine fails.
pub async fn execute(args: PullArgs, config: &KubeletConfig) -> anyhow::Result<()> {
    let pods = super::orchestrator(config)?;
    let cancel = CancellationToken::new();
    if args.remove {
        pods.images().remove(&args.image, &cancel).await?;
        println!("image {} removed", args.image);
        return Ok(());
    }
    pods.images().resolve(args.policy, &args.image, &cancel).await?;
    println!("image {} ready ({})", args.image, args.policy);
    Ok(())
}
