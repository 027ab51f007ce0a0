// file: src/stages/templates.rs
// version: 1.0.0
// guid: 4959f386-8f75-4771-aa5c-261adc7c3274

//! Rendered pieces of the staged document: the rootfs layout, the k3s config
//! drop-in and the cluster bootstrap manifests

use super::Stage;
use crate::config::{local_path, LlmosConfig};
use crate::installer::layout::{
    PartitionLayout, DATA_PERSISTENT_LABEL, OEM_LABEL, PERSISTENT_LABEL,
};
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Layout environment read by the cOS immutable rootfs setup
pub const LAYOUT_ENV_FILE: &str = "/run/cos/cos-layout.env";

/// Namespace holding the LLMOS system components
pub const SYSTEM_NAMESPACE: &str = "llmos-system";

const RW_PATHS: &str = "/var /etc /srv";
const OVERLAY: &str = "tmpfs:25%";

const DEFAULT_PERSISTENT_STATE_PATHS: [&str; 16] = [
    "/etc/systemd",
    "/etc/rancher",
    "/etc/ssh",
    "/etc/iscsi",
    "/etc/cni",
    "/etc/llmos",
    "/home",
    "/opt",
    "/root",
    "/usr/libexec",
    "/var/log",
    "/var/lib/rancher",
    "/var/lib/kubelet",
    "/var/lib/NetworkManager",
    "/var/lib/longhorn",
    "/var/lib/cni",
];

/// Rootfs stage mounting the partitions of `layout`
pub fn rootfs_stage(config: &LlmosConfig, layout: &PartitionLayout) -> Stage {
    let mut volumes = vec![
        format!("LABEL={}:/oem", OEM_LABEL),
        format!("LABEL={}:/usr/local", PERSISTENT_LABEL),
    ];
    if layout.has_data_partition() {
        volumes.push(format!(
            "LABEL={}:{}",
            DATA_PERSISTENT_LABEL,
            local_path(&["data"]).display()
        ));
    }

    let mut state_paths: Vec<&str> = DEFAULT_PERSISTENT_STATE_PATHS.to_vec();
    for path in &config.os.persistent_state_paths {
        if !state_paths.contains(&path.as_str()) {
            state_paths.push(path);
        }
    }

    let mut stage = Stage {
        name: "Layout configuration".to_string(),
        environment_file: LAYOUT_ENV_FILE.to_string(),
        ..Stage::default()
    };
    let env = &mut stage.environment;
    env.insert("VOLUMES".to_string(), volumes.join(" "));
    env.insert("OVERLAY".to_string(), OVERLAY.to_string());
    env.insert("RW_PATHS".to_string(), RW_PATHS.to_string());
    env.insert("PERSISTENT_STATE_PATHS".to_string(), state_paths.join(" "));
    env.insert("PERSISTENT_STATE_BIND".to_string(), "true".to_string());
    stage
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct K3sConfigFile<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    token: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    node_external_ip: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    node_label: &'a [String],
    disable: Vec<String>,
    write_kubeconfig_mode: &'static str,
}

/// k3s `config.yaml.d` drop-in
pub fn render_k3s_config(config: &LlmosConfig) -> Result<String> {
    let file = K3sConfigFile {
        token: &config.os.k3s.token,
        node_external_ip: config.k3s_node_external_ip(),
        node_label: config.k3s_node_labels(),
        disable: config.k3s_disabled_components(),
        write_kubeconfig_mode: "0644",
    };
    Ok(serde_yaml::to_string(&file)?)
}

/// Chart repository serving the LLMOS system charts
pub const CHART_REPO: &str = "https://llmos-ai.github.io/charts";
/// Namespace the k3s helm controller watches for `HelmChart` resources
const HELM_CONTROLLER_NAMESPACE: &str = "kube-system";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a, S: Serialize> {
    api_version: &'static str,
    kind: &'static str,
    metadata: Metadata<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spec: Option<S>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'static str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HelmChartSpec {
    chart: &'static str,
    repo: &'static str,
    target_namespace: &'static str,
    create_namespace: bool,
}

fn render<S: Serialize>(manifest: &Manifest<'_, S>) -> Result<String> {
    Ok(serde_yaml::to_string(manifest)?)
}

fn render_namespace(config: &LlmosConfig) -> Result<String> {
    render(&Manifest::<()> {
        api_version: "v1",
        kind: "Namespace",
        metadata: Metadata {
            name: SYSTEM_NAMESPACE,
            namespace: None,
            labels: &config.os.labels,
        },
        spec: None,
    })
}

fn render_helm_chart(config: &LlmosConfig, chart: &'static str) -> Result<String> {
    render(&Manifest {
        api_version: "helm.cattle.io/v1",
        kind: "HelmChart",
        metadata: Metadata {
            name: chart,
            namespace: Some(HELM_CONTROLLER_NAMESPACE),
            labels: &config.os.labels,
        },
        spec: Some(HelmChartSpec {
            chart,
            repo: CHART_REPO,
            target_namespace: SYSTEM_NAMESPACE,
            create_namespace: true,
        }),
    })
}

fn render_ollama_service(config: &LlmosConfig) -> Result<String> {
    render_helm_chart(config, "ollama")
}

fn render_dashboard(config: &LlmosConfig) -> Result<String> {
    render_helm_chart(config, "llmos-dashboard")
}

type Renderer = fn(&LlmosConfig) -> Result<String>;

const MANIFESTS: [(&str, Renderer); 3] = [
    ("llmos-namespace.yaml", render_namespace),
    ("ollama-service.yaml", render_ollama_service),
    ("llmos-dashboard.yaml", render_dashboard),
];

/// Render every bootstrap manifest as `(file name, content)`
pub fn render_manifests(config: &LlmosConfig) -> Result<Vec<(&'static str, String)>> {
    MANIFESTS
        .iter()
        .map(|(name, render)| Ok((*name, render(config)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunFlags;
    use crate::disk::GIB;
    use crate::installer::layout::build_partition_layout;

    fn config() -> LlmosConfig {
        let mut config = LlmosConfig::new_default(&RunFlags::default());
        config.install.device = "/dev/sda".to_string();
        config
    }

    #[test]
    fn test_rootfs_stage_volumes() {
        let mut cfg = config();
        let layout = build_partition_layout(&cfg, 200 * GIB).unwrap();
        let stage = rootfs_stage(&cfg, &layout);
        assert_eq!(stage.environment_file, LAYOUT_ENV_FILE);
        assert_eq!(
            stage.environment["VOLUMES"],
            "LABEL=COS_OEM:/oem LABEL=COS_PERSISTENT:/usr/local"
        );

        cfg.install.data_device = "/dev/sdb".to_string();
        let layout = build_partition_layout(&cfg, 200 * GIB).unwrap();
        let stage = rootfs_stage(&cfg, &layout);
        assert!(stage.environment["VOLUMES"]
            .ends_with("LABEL=LLMOS_DATA_PERSISTENT:/var/lib/llmos/data"));
    }

    #[test]
    fn test_rootfs_stage_adds_custom_state_paths_once() {
        let mut cfg = config();
        cfg.os.persistent_state_paths = vec!["/var/lib/ollama".to_string(), "/home".to_string()];
        let layout = build_partition_layout(&cfg, 200 * GIB).unwrap();
        let stage = rootfs_stage(&cfg, &layout);
        let paths = &stage.environment["PERSISTENT_STATE_PATHS"];
        assert!(paths.ends_with("/var/lib/ollama"));
        assert_eq!(paths.matches("/home").count(), 1);
    }

    #[test]
    fn test_render_k3s_config() {
        let mut cfg = config();
        cfg.os.k3s.token = "t0ken".to_string();
        cfg.os.k3s.node_label = vec!["gpu=true".to_string()];
        let rendered = render_k3s_config(&cfg).unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(doc["token"], "t0ken");
        assert_eq!(doc["node-label"][0], "gpu=true");
        assert_eq!(doc["disable"][0], "cloud-controller");
        assert!(doc.get("node-external-ip").is_none());
    }

    #[test]
    fn test_render_manifests_are_valid_yaml() {
        let mut cfg = config();
        cfg.os.labels.insert("zone".to_string(), "eu: west".to_string());
        let manifests = render_manifests(&cfg).unwrap();
        let names: Vec<&str> = manifests.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            ["llmos-namespace.yaml", "ollama-service.yaml", "llmos-dashboard.yaml"]
        );
        for (name, content) in &manifests {
            let doc: serde_yaml::Value = serde_yaml::from_str(content)
                .unwrap_or_else(|e| panic!("{} is not valid yaml: {}", name, e));
            assert_eq!(doc["metadata"]["labels"]["zone"], "eu: west", "{}", name);
        }
    }

    #[test]
    fn test_helm_charts_target_system_namespace() {
        let manifests = render_manifests(&config()).unwrap();
        let ollama: serde_yaml::Value = serde_yaml::from_str(&manifests[1].1).unwrap();
        assert_eq!(ollama["kind"], "HelmChart");
        assert_eq!(ollama["metadata"]["namespace"], "kube-system");
        assert_eq!(ollama["spec"]["chart"], "ollama");
        assert_eq!(ollama["spec"]["targetNamespace"], SYSTEM_NAMESPACE);
        assert_eq!(ollama["spec"]["repo"], CHART_REPO);

        let namespace: serde_yaml::Value = serde_yaml::from_str(&manifests[0].1).unwrap();
        assert_eq!(namespace["metadata"]["name"], SYSTEM_NAMESPACE);
        assert!(namespace["metadata"].get("labels").is_none());
        assert!(namespace.get("spec").is_none());
    }

    #[test]
    fn test_label_keys_cannot_add_fields() {
        let mut cfg = config();
        cfg.os
            .labels
            .insert("team: x\n  injected".to_string(), "v".to_string());
        for (name, content) in render_manifests(&cfg).unwrap() {
            let doc: serde_yaml::Value = serde_yaml::from_str(&content).unwrap();
            let labels = doc["metadata"]["labels"].as_mapping().unwrap();
            assert_eq!(labels.len(), 1, "{}", name);
            assert_eq!(labels["team: x\n  injected"], "v");
        }
    }
}
