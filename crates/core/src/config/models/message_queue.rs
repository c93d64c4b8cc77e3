use serde::{Deserialize, Serialize};

/// RabbitMQ 连接配置
///
/// 这些参数同样会注入到每个Worker容器，Worker据此回传就绪/完成信号。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmqpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub vhost: String,
    pub connection_timeout_seconds: u64,
}

impl Default for AmqpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5672,
            username: "guest".to_string(),
            password: "guest".to_string(),
            vhost: "/".to_string(),
            connection_timeout_seconds: 30,
        }
    }
}

impl AmqpConfig {
    /// Validate AMQP configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host.is_empty() {
            return Err(anyhow::anyhow!("RabbitMQ主机地址不能为空"));
        }

        if self.port == 0 {
            return Err(anyhow::anyhow!("RabbitMQ端口必须大于0"));
        }

        if self.connection_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("RabbitMQ连接超时时间必须大于0"));
        }

        Ok(())
    }

    /// Build AMQP connection URL
    pub fn url(&self) -> String {
        let vhost = if self.vhost == "/" {
            "%2f".to_string()
        } else {
            self.vhost.trim_start_matches('/').to_string()
        };
        format!(
            "amqp://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, vhost
        )
    }
}

/// 消息通道名称
///
/// 名称是与Worker之间的协议，修改前需同步更新Worker镜像。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub create_job_queue: String,
    pub node_ready_topic: String,
    pub monitor_ready_topic: String,
    pub start_topic: String,
    pub node_complete_topic: String,
    pub job_complete_topic: String,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            create_job_queue: "job.create".to_string(),
            node_ready_topic: "node.ready".to_string(),
            monitor_ready_topic: "monitor.ready".to_string(),
            start_topic: "job.start".to_string(),
            node_complete_topic: "node.complete".to_string(),
            job_complete_topic: "job.complete".to_string(),
        }
    }
}

impl ChannelsConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let names = [
            ("create_job_queue", &self.create_job_queue),
            ("node_ready_topic", &self.node_ready_topic),
            ("monitor_ready_topic", &self.monitor_ready_topic),
            ("start_topic", &self.start_topic),
            ("node_complete_topic", &self.node_complete_topic),
            ("job_complete_topic", &self.job_complete_topic),
        ];

        for (field, value) in names {
            if value.is_empty() {
                return Err(anyhow::anyhow!("通道名称 {field} 不能为空"));
            }
        }

        if self.node_ready_topic == self.monitor_ready_topic {
            return Err(anyhow::anyhow!("监控Worker与测试Worker的就绪通道不能相同"));
        }

        Ok(())
    }
}
