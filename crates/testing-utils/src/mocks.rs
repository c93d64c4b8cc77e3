//! Mock implementations for the orchestrator's seam traits
//!
//! 全部为内存实现，记录调用参数，支持注入失败。

use async_trait::async_trait;
use flare_core::{
    models::{Job, MonitorSpec, Node, TestClientSpec},
    FlareError, FlareResult, IdGenerator, JobsApi, WorkerLauncher,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 只记录请求的Worker创建器，不会发出任何信号
#[derive(Debug, Clone, Default)]
pub struct MockWorkerLauncher {
    test_clients: Arc<Mutex<Vec<TestClientSpec>>>,
    monitors: Arc<Mutex<Vec<MonitorSpec>>>,
    fail_test_clients: Arc<AtomicBool>,
    fail_monitors: Arc<AtomicBool>,
    launch_delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockWorkerLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次创建请求耗时 `delay`，用于观察并发度
    pub fn with_launch_delay(delay: Duration) -> Self {
        Self {
            launch_delay: delay,
            ..Self::default()
        }
    }

    pub fn set_fail_test_clients(&self, fail: bool) {
        self.fail_test_clients.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_monitors(&self, fail: bool) {
        self.fail_monitors.store(fail, Ordering::SeqCst);
    }

    pub fn test_clients(&self) -> Vec<TestClientSpec> {
        self.test_clients.lock().unwrap().clone()
    }

    pub fn monitors(&self) -> Vec<MonitorSpec> {
        self.monitors.lock().unwrap().clone()
    }

    /// 同时进行中的创建请求的最大值
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn simulate_call(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.launch_delay.is_zero() {
            tokio::time::sleep(self.launch_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorkerLauncher for MockWorkerLauncher {
    async fn launch_test_client(&self, spec: &TestClientSpec) -> FlareResult<()> {
        self.simulate_call().await;
        if self.fail_test_clients.load(Ordering::SeqCst) {
            return Err(FlareError::provisioning(&spec.node_id, "mock launch failure"));
        }
        self.test_clients.lock().unwrap().push(spec.clone());
        Ok(())
    }

    async fn launch_monitor(&self, spec: &MonitorSpec) -> FlareResult<()> {
        self.simulate_call().await;
        if self.fail_monitors.load(Ordering::SeqCst) {
            return Err(FlareError::provisioning(&spec.monitor_id, "mock launch failure"));
        }
        self.monitors.lock().unwrap().push(spec.clone());
        Ok(())
    }
}

/// Mock implementation of JobsApi for testing
#[derive(Debug, Clone, Default)]
pub struct MockJobsApi {
    nodes: Arc<Mutex<HashMap<String, Vec<Node>>>>,
    updated_jobs: Arc<Mutex<Vec<Job>>>,
    fail_get_nodes: Arc<AtomicBool>,
    fail_update: Arc<AtomicBool>,
}

impl MockJobsApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(job_id: &str, nodes: Vec<Node>) -> Self {
        let api = Self::new();
        api.set_nodes(job_id, nodes);
        api
    }

    pub fn set_nodes(&self, job_id: &str, nodes: Vec<Node>) {
        self.nodes.lock().unwrap().insert(job_id.to_string(), nodes);
    }

    pub fn set_fail_get_nodes(&self, fail: bool) {
        self.fail_get_nodes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    /// 按调用顺序返回所有被更新过的任务
    pub fn updated_jobs(&self) -> Vec<Job> {
        self.updated_jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobsApi for MockJobsApi {
    async fn get_nodes(&self, job_id: &str) -> FlareResult<Vec<Node>> {
        if self.fail_get_nodes.load(Ordering::SeqCst) {
            return Err(FlareError::JobsApi("mock get_nodes failure".to_string()));
        }
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_job(&self, job: &Job) -> FlareResult<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(FlareError::JobsApi("mock update_job failure".to_string()));
        }
        self.updated_jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}

/// 生成 `<prefix>-1`, `<prefix>-2`, ... 的可预测ID
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicUsize,
}

impl SequentialIdGenerator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: AtomicUsize::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::NodeBuilder;

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIdGenerator::new("node");
        assert_eq!(ids.next_id(), "node-1");
        assert_eq!(ids.next_id(), "node-2");
    }

    #[tokio::test]
    async fn test_mock_jobs_api() {
        let api = MockJobsApi::with_nodes("job1", vec![NodeBuilder::new("job1").successful(10).build()]);
        assert_eq!(api.get_nodes("job1").await.unwrap().len(), 1);
        assert!(api.get_nodes("job2").await.unwrap().is_empty());

        api.set_fail_get_nodes(true);
        assert!(api.get_nodes("job1").await.is_err());
    }
}
