//! Binding of container mounts to the pod's host volumes.

use std::collections::HashMap;

use minik8s_api::{Container, HostVolume, Pod};
use minik8s_common::error::{Minik8sError, Result};

/// Resolves each mount of `container` into a `hostPath:mountPath[:ro]` bind,
/// in mount order.
///
/// # Errors
///
/// Returns [`Minik8sError::VolumeNotFound`] if a mount names a volume the
/// pod does not declare.
pub fn bind_volumes(pod: &Pod, container: &Container) -> Result<Vec<String>> {
    let volumes: HashMap<&str, &HostVolume> = pod
        .spec
        .volumes
        .iter()
        .map(|v| (v.name.as_str(), v))
        .collect();
    container
        .volume_mounts
        .iter()
        .map(|mount| {
            let volume = volumes
                .get(mount.name.as_str())
                .ok_or_else(|| Minik8sError::VolumeNotFound {
                    volume: mount.name.clone(),
                    container: container.name.clone(),
                })?;
            let mut bind = format!("{}:{}", volume.path, mount.mount_path);
            if mount.read_only {
                bind.push_str(":ro");
            }
            Ok(bind)
        })
        .collect()
}
