//! Test helper utilities and common testing patterns

use flare_core::{
    config::AppConfig,
    models::{Job, Task},
};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

/// Test environment setup utilities
pub struct TestEnv;

impl TestEnv {
    /// Wait for a condition to be true with timeout
    pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let start = std::time::Instant::now();

        while start.elapsed() < timeout {
            if condition().await {
                return true;
            }
            sleep(Duration::from_millis(20)).await;
        }

        false
    }
}

/// 测试用配置：连接上限1000，超时较短
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.jobs_api.base_url = "http://jobs-api.test".to_string();
    config.monitor.metrics_api = "http://cf-metrics.test".to_string();
    config.amqp.host = "rabbitmq.test".to_string();
    config.orchestration.readiness_timeout_seconds = 10;
    config.orchestration.completion_timeout_seconds = 10;
    config
}

/// `job.create` 队列上的报文
pub fn create_job_payload(job: &Job, task: &Task) -> Vec<u8> {
    json!({
        "taskId": task.id,
        "job": job,
        "task": task,
    })
    .to_string()
    .into_bytes()
}
