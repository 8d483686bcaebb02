//! Semantic validation of a loaded pod.
//!
//! Mount references are deliberately not checked here: a dangling mount
//! is reported by the volume binder when the container is created.

use std::collections::HashSet;

use minik8s_common::error::{Minik8sError, Result};

use crate::pod::Pod;

/// Validates a pod for semantic correctness.
///
/// # Checks performed
///
/// 1. The pod has a name.
/// 2. The pod declares at least one container.
/// 3. Container names are non-empty and unique across init and main containers.
/// 4. Every container declares an image.
/// 5. Volume names are non-empty and unique.
///
/// # Errors
///
/// Returns [`Minik8sError::Manifest`] describing the first failed check.
pub fn validate(pod: &Pod) -> Result<()> {
    tracing::debug!(pod = %pod.name(), "validating pod");
    check_pod_name(pod)?;
    check_containers(pod)?;
    check_volumes(pod)?;
    Ok(())
}

fn invalid(message: String) -> Minik8sError {
    Minik8sError::Manifest { message }
}

fn check_pod_name(pod: &Pod) -> Result<()> {
    if pod.name().trim().is_empty() {
        return Err(invalid("pod has no name".into()));
    }
    Ok(())
}

fn check_containers(pod: &Pod) -> Result<()> {
    if pod.spec.containers.is_empty() {
        return Err(invalid(format!("pod \"{}\" declares no containers", pod.name())));
    }
    let mut seen = HashSet::new();
    for container in pod.spec.all_containers() {
        if container.name.trim().is_empty() {
            return Err(invalid(format!("pod \"{}\" has a container without a name", pod.name())));
        }
        if !seen.insert(container.name.as_str()) {
            return Err(invalid(format!("duplicate container name: \"{}\"", container.name)));
        }
        if container.image.trim().is_empty() {
            return Err(invalid(format!("container \"{}\" has no image", container.name)));
        }
    }
    Ok(())
}

fn check_volumes(pod: &Pod) -> Result<()> {
    let mut seen = HashSet::new();
    for volume in &pod.spec.volumes {
        if volume.name.trim().is_empty() {
            return Err(invalid(format!("pod \"{}\" has a volume without a name", pod.name())));
        }
        if !seen.insert(volume.name.as_str()) {
            return Err(invalid(format!("duplicate volume name: \"{}\"", volume.name)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Container, VolumeMount};
    use crate::pod::{HostVolume, ObjectMeta, PodSpec};

    fn container(name: &str, image: &str) -> Container {
        Container {
            name: name.into(),
            image: image.into(),
            ..Container::default()
        }
    }

    fn pod(containers: Vec<Container>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: "web".into(),
                ..ObjectMeta::default()
            },
            spec: PodSpec {
                containers,
                ..PodSpec::default()
            },
            ..Pod::default()
        }
    }

    fn volume(name: &str) -> HostVolume {
        HostVolume {
            name: name.into(),
            kind: "HostPath".into(),
            path: "/srv".into(),
        }
    }

    #[test]
    fn valid_pod_passes() {
        assert!(validate(&pod(vec![container("nginx", "nginx:latest")])).is_ok());
    }

    #[test]
    fn missing_name_rejected() {
        let mut p = pod(vec![container("nginx", "nginx")]);
        p.metadata.name = String::new();
        let msg = validate(&p).unwrap_err().to_string();
        assert!(msg.contains("no name"), "got: {msg}");
    }

    #[test]
    fn empty_container_list_rejected() {
        let msg = validate(&pod(vec![])).unwrap_err().to_string();
        assert!(msg.contains("no containers"), "got: {msg}");
    }

    #[test]
    fn duplicate_container_names_rejected() {
        let msg = validate(&pod(vec![container("a", "x"), container("a", "y")]))
            .unwrap_err()
            .to_string();
        assert!(msg.contains("duplicate container name"), "got: {msg}");
    }

    #[test]
    fn init_and_main_names_share_one_namespace() {
        let mut p = pod(vec![container("a", "x")]);
        p.spec.init_containers.push(container("a", "y"));
        assert!(validate(&p).is_err());
    }

    #[test]
    fn missing_image_rejected() {
        let msg = validate(&pod(vec![container("a", " ")]))
            .unwrap_err()
            .to_string();
        assert!(msg.contains("has no image"), "got: {msg}");
    }

    #[test]
    fn duplicate_volume_names_rejected() {
        let mut p = pod(vec![container("a", "x")]);
        p.spec.volumes = vec![volume("data"), volume("data")];
        let msg = validate(&p).unwrap_err().to_string();
        assert!(msg.contains("duplicate volume name"), "got: {msg}");
    }

    #[test]
    fn dangling_mount_is_left_to_the_binder() {
        let mut c = container("a", "x");
        c.volume_mounts.push(VolumeMount {
            name: "missing".into(),
            mount_path: "/data".into(),
            read_only: false,
        });
        assert!(validate(&pod(vec![c])).is_ok());
    }
}
