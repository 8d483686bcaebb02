//! `kubelet plan`: Show the engine configs of a pod without creating it.

use std::path::PathBuf;

use clap::Args;
use minik8s_common::config::KubeletConfig;
use minik8s_runtime::SandboxConfig;
use minik8s_runtime::engine::ContainerConfig;
use serde::Serialize;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the pod manifest.
    pub file: PathBuf,

    /// Pod UID to plan with. A placeholder is generated if absent.
    #[arg(long)]
    pub uid: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Plan {
    sandbox_image: String,
    sandbox: SandboxConfig,
    containers: Vec<PlannedContainer>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlannedContainer {
    name: String,
    engine_name: String,
    config: ContainerConfig,
}

/// Executes the `plan` command.
///
/// Prints the sandbox config and every container config, in creation
/// order, as JSON. No engine request is made.
///
/// # Errors
///
/// Returns an error if the manifest is invalid, a port or resource
/// quantity is malformed, or a mount references an undeclared volume.
pub fn execute(args: &PlanArgs, config: &KubeletConfig) -> anyhow::Result<()> {
    let mut pod = super::load_pod(&args.file, args.uid.as_deref())?;
    let _ = pod.ensure_uid();
    let pods = super::orchestrator(config)?;

    let sandbox = pods.sandboxes().generate_sandbox_config(&pod)?;
    let containers = pod
        .spec
        .all_containers()
        .map(|container| {
            let config = pods
                .containers()
                .generate_container_config(&pod, container, &sandbox.token)?;
            Ok(PlannedContainer {
                name: container.name.clone(),
                engine_name: sandbox.token.container_name(&container.name),
                config,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let plan = Plan {
        sandbox_image: pods.sandboxes().image().to_string(),
        sandbox,
        containers,
    };
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
