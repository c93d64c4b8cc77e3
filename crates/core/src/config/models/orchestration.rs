use serde::{Deserialize, Serialize};

/// Kubernetes 相关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    pub namespace: String,
    pub test_client_image: String,
    pub monitor_image: String,
    pub test_client_name_prefix: String,
    pub monitor_name_prefix: String,
    pub container_port: i32,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            test_client_image: "wsflare/ws-flare-test-client:latest".to_string(),
            monitor_image: "wsflare/ws-flare-cf-monitor:latest".to_string(),
            test_client_name_prefix: "ws-flare-test-client".to_string(),
            monitor_name_prefix: "ws-flare-cf-monitor".to_string(),
            container_port: 80,
        }
    }
}

impl KubernetesConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.namespace.is_empty() {
            return Err(anyhow::anyhow!("Kubernetes命名空间不能为空"));
        }

        if self.test_client_image.is_empty() || self.monitor_image.is_empty() {
            return Err(anyhow::anyhow!("Worker镜像不能为空"));
        }

        if self.container_port <= 0 {
            return Err(anyhow::anyhow!("容器端口必须大于0"));
        }

        Ok(())
    }
}

/// 外部 Jobs API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsApiConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for JobsApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl JobsApiConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!("Jobs API地址必须是http://或https://格式"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("Jobs API请求超时时间必须大于0"));
        }

        Ok(())
    }

    /// 去掉末尾斜杠的基础地址
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// 监控Worker配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 监控Worker上报目标环境指标的API地址
    pub metrics_api: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            metrics_api: "http://localhost:3001".to_string(),
        }
    }
}

/// 编排控制参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// 单个Worker可承载的最大模拟连接数
    pub connection_limit_per_node: i64,
    /// 同一脚本内同时创建中的Worker上限
    pub max_concurrent_provisioning: usize,
    pub readiness_timeout_seconds: u64,
    pub completion_timeout_seconds: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            connection_limit_per_node: 1000,
            max_concurrent_provisioning: 10,
            readiness_timeout_seconds: 600,
            completion_timeout_seconds: 7200,
        }
    }
}

impl OrchestrationConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.connection_limit_per_node <= 0 {
            return Err(anyhow::anyhow!("单节点连接上限必须大于0"));
        }

        if self.max_concurrent_provisioning == 0 {
            return Err(anyhow::anyhow!("并发创建Worker数必须大于0"));
        }

        if self.readiness_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("就绪等待超时时间必须大于0"));
        }

        if self.completion_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("完成等待超时时间必须大于0"));
        }

        Ok(())
    }
}
