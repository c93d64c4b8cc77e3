use async_trait::async_trait;
use flare_core::{
    config::KubernetesConfig,
    models::{MonitorSpec, TestClientSpec},
    FlareError, FlareResult, WorkerLauncher,
};
use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, Pod, PodSpec};
use kube::api::{Api, ObjectMeta, PostParams};
use kube::Client;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// 标记Pod所属任务的标签
pub const JOB_ID_LABEL: &str = "flare/job-id";

/// 通过 Kubernetes API 为每个Worker创建一个Pod
pub struct KubernetesLauncher {
    pods: Api<Pod>,
    config: KubernetesConfig,
}

impl KubernetesLauncher {
    /// 使用集群内配置或本地 kubeconfig 创建客户端
    pub async fn new(config: KubernetesConfig) -> FlareResult<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| FlareError::Kubernetes(format!("创建Kubernetes客户端失败: {e}")))?;

        info!("Kubernetes客户端已就绪，命名空间: {}", config.namespace);
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: KubernetesConfig) -> Self {
        let pods = Api::namespaced(client, &config.namespace);
        Self { pods, config }
    }

    /// 测试客户端的Pod定义
    pub fn test_client_pod(&self, spec: &TestClientSpec) -> Pod {
        build_pod(
            &self.config.test_client_name_prefix,
            &self.config.test_client_image,
            self.config.container_port,
            &spec.node_id,
            &spec.job_id,
            spec.env(),
        )
    }

    /// 监控Worker的Pod定义
    pub fn monitor_pod(&self, spec: &MonitorSpec) -> Pod {
        build_pod(
            &self.config.monitor_name_prefix,
            &self.config.monitor_image,
            self.config.container_port,
            &spec.monitor_id,
            &spec.job_id,
            spec.env(),
        )
    }

    async fn create_pod(&self, worker_id: &str, pod: Pod) -> FlareResult<()> {
        let name = pod.metadata.name.clone().unwrap_or_default();

        self.pods
            .create(&PostParams::default(), &pod)
            .await
            .map_err(|e| FlareError::provisioning(worker_id, format!("创建Pod {name} 失败: {e}")))?;

        debug!("Pod {} 创建请求已提交", name);
        Ok(())
    }
}

#[async_trait]
impl WorkerLauncher for KubernetesLauncher {
    async fn launch_test_client(&self, spec: &TestClientSpec) -> FlareResult<()> {
        self.create_pod(&spec.node_id, self.test_client_pod(spec))
            .await
    }

    async fn launch_monitor(&self, spec: &MonitorSpec) -> FlareResult<()> {
        self.create_pod(&spec.monitor_id, self.monitor_pod(spec))
            .await
    }
}

/// 构造单容器Pod，名称为 `<prefix>-<id>`
pub fn build_pod(
    prefix: &str,
    image: &str,
    container_port: i32,
    id: &str,
    job_id: &str,
    env: Vec<(&'static str, String)>,
) -> Pod {
    let name = format!("{prefix}-{id}");

    let labels = BTreeMap::from([
        ("app".to_string(), prefix.to_string()),
        (JOB_ID_LABEL.to_string(), job_id.to_string()),
    ]);

    let env = env
        .into_iter()
        .map(|(name, value)| EnvVar {
            name: name.to_string(),
            value: Some(value),
            ..Default::default()
        })
        .collect();

    Pod {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name,
                image: Some(image.to_string()),
                ports: Some(vec![ContainerPort {
                    container_port,
                    ..Default::default()
                }]),
                env: Some(env),
                ..Default::default()
            }],
            restart_policy: Some("Never".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_value(pod: &Pod, name: &str) -> Option<String> {
        pod.spec.as_ref()?.containers[0]
            .env
            .as_ref()?
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.value.clone())
    }

    #[test]
    fn test_build_pod() {
        let pod = build_pod(
            "ws-flare-test-client",
            "wsflare/test-client:1.0",
            80,
            "node-1",
            "job1",
            vec![("JOB_ID", "job1".to_string()), ("SCRIPT_INDEX", "2".to_string())],
        );

        assert_eq!(pod.metadata.name.as_deref(), Some("ws-flare-test-client-node-1"));
        let labels = pod.metadata.labels.clone().unwrap();
        assert_eq!(labels.get("app").map(String::as_str), Some("ws-flare-test-client"));
        assert_eq!(labels.get(JOB_ID_LABEL).map(String::as_str), Some("job1"));

        let spec = pod.spec.as_ref().unwrap();
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
        assert_eq!(spec.containers.len(), 1);
        assert_eq!(spec.containers[0].image.as_deref(), Some("wsflare/test-client:1.0"));
        assert_eq!(
            spec.containers[0].ports.as_ref().unwrap()[0].container_port,
            80
        );
        assert_eq!(env_value(&pod, "SCRIPT_INDEX").as_deref(), Some("2"));
        assert_eq!(env_value(&pod, "MISSING"), None);
    }
}
