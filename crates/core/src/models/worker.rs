use serde::{Deserialize, Serialize};

use super::CloudTarget;
use crate::config::AmqpConfig;

/// Worker类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    TestClient,
    Monitor,
}

impl WorkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerKind::TestClient => "test_client",
            WorkerKind::Monitor => "monitor",
        }
    }
}

/// 已创建并发出就绪信号的Worker
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerHandle {
    pub id: String,
    pub job_id: String,
    pub kind: WorkerKind,
    /// 仅测试客户端有值
    pub script_index: Option<usize>,
    pub simulated_users: i64,
}

/// Worker连接消息中间件所需的参数
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// 创建测试客户端的请求
#[derive(Debug, Clone, PartialEq)]
pub struct TestClientSpec {
    pub job_id: String,
    pub node_id: String,
    pub jobs_api: String,
    pub script_index: usize,
    pub total_simulated_users: i64,
    pub broker: BrokerParams,
}

/// 创建监控Worker的请求
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSpec {
    pub job_id: String,
    pub monitor_id: String,
    pub jobs_api: String,
    pub metrics_api: String,
    pub target: CloudTarget,
    pub broker: BrokerParams,
}

impl TestClientSpec {
    /// 注入到容器中的环境变量
    pub fn env(&self) -> Vec<(&'static str, String)> {
        let mut env = vec![
            ("JOB_ID", self.job_id.clone()),
            ("NODE_ID", self.node_id.clone()),
            ("JOBS_API", self.jobs_api.clone()),
            ("SCRIPT_INDEX", self.script_index.to_string()),
            ("TOTAL_SIMULATED_USERS", self.total_simulated_users.to_string()),
        ];
        env.extend(self.broker.env());
        env
    }
}

impl MonitorSpec {
    pub fn env(&self) -> Vec<(&'static str, String)> {
        let mut env = vec![
            ("JOB_ID", self.job_id.clone()),
            ("MONITOR_ID", self.monitor_id.clone()),
            ("JOBS_API", self.jobs_api.clone()),
            ("CF_METRICS_API", self.metrics_api.clone()),
        ];

        let credentials = [
            ("CF_API", &self.target.api),
            ("CF_USER", &self.target.user),
            ("CF_PASS", &self.target.pass),
            ("CF_ORG", &self.target.org),
            ("CF_SPACE", &self.target.space),
            ("CF_APPS", &self.target.apps),
        ];
        for (name, value) in credentials {
            if let Some(value) = value {
                env.push((name, value.clone()));
            }
        }

        env.extend(self.broker.env());
        env
    }
}

impl From<&AmqpConfig> for BrokerParams {
    fn from(config: &AmqpConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

impl BrokerParams {
    fn env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("AMQP_URL", self.host.clone()),
            ("AMQP_PORT", self.port.to_string()),
            ("AMQP_USER", self.username.clone()),
            ("AMQP_PWD", self.password.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker() -> BrokerParams {
        BrokerParams {
            host: "rabbitmq".to_string(),
            port: 5672,
            username: "guest".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn test_broker_from_amqp_config() {
        let config = AmqpConfig {
            host: "rabbitmq".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        };
        let broker = BrokerParams::from(&config);
        assert_eq!(broker.host, "rabbitmq");
        assert_eq!(broker.port, 5672);
        assert_eq!(broker.username, "guest");
        assert_eq!(broker.password, "secret");
    }

    #[test]
    fn test_client_env() {
        let spec = TestClientSpec {
            job_id: "job1".to_string(),
            node_id: "node-1".to_string(),
            jobs_api: "http://jobs-api".to_string(),
            script_index: 1,
            total_simulated_users: 67,
            broker: broker(),
        };

        let env = spec.env();
        assert!(env.contains(&("SCRIPT_INDEX", "1".to_string())));
        assert!(env.contains(&("TOTAL_SIMULATED_USERS", "67".to_string())));
        assert!(env.contains(&("AMQP_PORT", "5672".to_string())));
        assert!(env.contains(&("AMQP_PWD", "secret".to_string())));
    }

    #[test]
    fn test_monitor_env_skips_missing_credentials() {
        let spec = MonitorSpec {
            job_id: "job1".to_string(),
            monitor_id: "monitor-1".to_string(),
            jobs_api: "http://jobs-api".to_string(),
            metrics_api: "http://cf-metrics".to_string(),
            target: CloudTarget {
                api: Some("https://api.cf".to_string()),
                apps: Some("app-a,app-b".to_string()),
                ..Default::default()
            },
            broker: broker(),
        };

        let env = spec.env();
        let names: Vec<_> = env.iter().map(|(name, _)| *name).collect();
        assert!(names.contains(&"CF_API"));
        assert!(names.contains(&"CF_APPS"));
        assert!(!names.contains(&"CF_USER"));
        assert!(env.contains(&("CF_METRICS_API", "http://cf-metrics".to_string())));
    }
}
