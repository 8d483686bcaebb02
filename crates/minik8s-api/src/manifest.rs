//! Pod manifest loading.
//!
//! Manifests use the Kubernetes camelCase layout and may be YAML or JSON.
//! The format is picked from the file extension; anything that is not
//! `.json` is read as YAML (a superset of JSON).

use std::path::Path;

use minik8s_common::error::{Minik8sError, Result};

use crate::pod::Pod;

/// Parses and validates a pod from YAML text.
///
/// # Errors
///
/// Returns an error if the text is not a valid pod manifest.
pub fn parse_yaml(content: &str) -> Result<Pod> {
    let pod: Pod = serde_yaml::from_str(content)?;
    crate::validator::validate(&pod)?;
    Ok(pod)
}

/// Parses and validates a pod from JSON text.
///
/// # Errors
///
/// Returns an error if the text is not a valid pod manifest.
pub fn parse_json(content: &str) -> Result<Pod> {
    let pod: Pod = serde_json::from_str(content)?;
    crate::validator::validate(&pod)?;
    Ok(pod)
}

/// Reads, parses, and validates a pod manifest file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid manifest.
pub fn load(path: &Path) -> Result<Pod> {
    tracing::info!(path = %path.display(), "loading pod manifest");
    let content = std::fs::read_to_string(path).map_err(|e| Minik8sError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        parse_json(&content)
    } else {
        parse_yaml(&content)
    }
}

#[cfg(test)]
mod tests {
    use minik8s_common::types::ImagePullPolicy;

    use super::*;

    const REDIS_NGINX: &str = r"
kind: Pod
metadata:
  name: testPod
  namespace: testNamespace
  uid: 3e057e86-7db7-4ad5-a186-101da380ebb6
  labels:
    app: test
spec:
  volumes:
    - name: testVolume
      type: HostPath
      path: /srv/minik8s/test
  containers:
    - name: testContainer-1
      image: docker.io/library/redis
      imagePullPolicy: IfNotPresent
      volumeMounts:
        - name: testVolume
          mountPath: /data
      ports:
        - name: redis
          hostPort: 6379
          containerPort: 6379
          protocol: tcp
    - name: testContainer-2
      image: docker.io/library/nginx
      imagePullPolicy: Always
      env:
        - name: NGINX_PORT
          value: '80'
      resources:
        limits:
          cpu: 500m
          memory: 128Mi
      ports:
        - containerPort: '80'
";

    #[test]
    fn parse_yaml_full_manifest() {
        let pod = parse_yaml(REDIS_NGINX).expect("should parse");
        assert_eq!(pod.kind, "Pod");
        assert_eq!(pod.name(), "testPod");
        assert_eq!(pod.namespace(), "testNamespace");
        assert_eq!(pod.metadata.labels.get("app").map(String::as_str), Some("test"));
        assert_eq!(pod.spec.volumes.len(), 1);
        assert_eq!(pod.spec.volumes[0].kind, "HostPath");
        assert_eq!(pod.spec.containers.len(), 2);

        let redis = &pod.spec.containers[0];
        assert_eq!(redis.volume_mounts[0].mount_path, "/data");
        assert_eq!(redis.ports[0].container_port, "6379");
        assert_eq!(redis.ports[0].host_port, Some(6379));

        let nginx = &pod.spec.containers[1];
        assert_eq!(nginx.image_pull_policy, ImagePullPolicy::Always);
        assert_eq!(nginx.env[0].value, "80");
        assert_eq!(nginx.resources.limits.cpu.as_deref(), Some("500m"));
        assert_eq!(nginx.resources.limits.memory.as_deref(), Some("128Mi"));
        assert_eq!(nginx.ports[0].container_port, "80");
    }

    #[test]
    fn parse_yaml_defaults_namespace() {
        let pod = parse_yaml(
            "metadata:\n  name: web\nspec:\n  containers:\n    - name: nginx\n      image: nginx:latest\n",
        )
        .expect("should parse");
        assert_eq!(pod.namespace(), "default");
        assert!(pod.uid().is_empty());
    }

    #[test]
    fn parse_json_manifest() {
        let pod = parse_json(
            r#"{"metadata": {"name": "web", "uid": "u1"},
                "spec": {"containers": [{"name": "nginx", "image": "nginx:latest",
                                         "ports": [{"containerPort": "80"}]}]}}"#,
        )
        .expect("should parse");
        assert_eq!(pod.uid(), "u1");
        assert_eq!(pod.spec.containers[0].ports[0].container_port, "80");
    }

    #[test]
    fn parse_yaml_rejects_invalid_pod() {
        let err = parse_yaml("metadata:\n  name: web\nspec:\n  containers: []\n").unwrap_err();
        assert!(matches!(err, Minik8sError::Manifest { .. }), "got: {err}");
    }

    #[test]
    fn parse_yaml_rejects_malformed_text() {
        assert!(matches!(
            parse_yaml("metadata: [").unwrap_err(),
            Minik8sError::Yaml { .. }
        ));
    }

    #[test]
    fn load_picks_format_from_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let json = dir.path().join("pod.json");
        std::fs::write(
            &json,
            r#"{"metadata": {"name": "a"}, "spec": {"containers": [{"name": "c", "image": "busybox"}]}}"#,
        )
        .expect("write");
        assert_eq!(load(&json).expect("load json").name(), "a");

        let yaml = dir.path().join("pod.yaml");
        std::fs::write(&yaml, REDIS_NGINX).expect("write");
        assert_eq!(load(&yaml).expect("load yaml").name(), "testPod");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load(Path::new("/nonexistent/pod.yaml")).unwrap_err();
        assert!(matches!(err, Minik8sError::Io { .. }));
    }
}
