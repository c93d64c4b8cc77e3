use std::sync::Arc;
use std::time::Instant;

use flare_core::{
    config::AppConfig,
    models::{BrokerParams, Job, MonitorSpec, Task, TestClientSpec, WorkerHandle, WorkerKind},
    ChannelNames, FlareResult, IdGenerator, MessageBus, ShutdownSignal, Subscription,
    WorkerLauncher,
};
use metrics::{counter, histogram};
use tracing::{debug, error, info, warn};

use crate::signal::{next_signal, Deadline};

/// Worker创建器
///
/// 创建远端计算单元，并阻塞到它在专属就绪队列上发出信号为止。
/// 就绪队列在创建请求发出之前就已声明，启动很快的Worker不会把信号发到不存在的队列里，
/// 等待结束后即被删除。
pub struct WorkerProvisioner {
    launcher: Arc<dyn WorkerLauncher>,
    message_bus: Arc<dyn MessageBus>,
    id_generator: Arc<dyn IdGenerator>,
    channels: ChannelNames,
    broker: BrokerParams,
    jobs_api: String,
    metrics_api: String,
    readiness_timeout_seconds: u64,
}

impl WorkerProvisioner {
    pub fn new(
        config: &AppConfig,
        launcher: Arc<dyn WorkerLauncher>,
        message_bus: Arc<dyn MessageBus>,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            launcher,
            message_bus,
            id_generator,
            channels: ChannelNames::new(config.channels.clone()),
            broker: BrokerParams::from(&config.amqp),
            jobs_api: config.jobs_api.base().to_string(),
            metrics_api: config.monitor.metrics_api.clone(),
            readiness_timeout_seconds: config.orchestration.readiness_timeout_seconds,
        }
    }

    /// 创建一个测试客户端并等待其就绪
    pub async fn start_test_worker(
        &self,
        job: &Job,
        total_simulated_users: i64,
        script_index: usize,
        shutdown: ShutdownSignal,
    ) -> FlareResult<WorkerHandle> {
        let node_id = self.id_generator.next_id();
        let spec = TestClientSpec {
            job_id: job.id.clone(),
            node_id: node_id.clone(),
            jobs_api: self.jobs_api.clone(),
            script_index,
            total_simulated_users,
            broker: self.broker.clone(),
        };

        let ready_queue =
            ReadyQueue::new(self.channels.node_ready(&node_id), &self.message_bus);
        let mut readiness = self.message_bus.subscribe_queue(ready_queue.name(), true).await?;

        let started = Instant::now();
        debug!(
            "创建测试客户端 {} (脚本 {}, {} 个模拟用户)",
            node_id, script_index, total_simulated_users
        );
        let ready = match self.launcher.launch_test_client(&spec).await {
            Ok(()) => {
                self.await_ready(&mut readiness, &node_id, WorkerKind::TestClient, shutdown)
                    .await
            }
            Err(e) => {
                error!("任务 {} 创建测试客户端 {} 失败: {}", job.id, node_id, e);
                counter!("flare_provisioning_failures_total", "kind" => WorkerKind::TestClient.as_str())
                    .increment(1);
                Err(e)
            }
        };
        drop(readiness);
        ready_queue.release().await;
        ready?;
        self.record_ready(WorkerKind::TestClient, started);

        Ok(WorkerHandle {
            id: node_id,
            job_id: job.id.clone(),
            kind: WorkerKind::TestClient,
            script_index: Some(script_index),
            simulated_users: total_simulated_users,
        })
    }

    /// 创建监控Worker并等待其就绪
    ///
    /// 监控Worker额外拿到任务的目标环境凭据和单独的指标API地址。
    pub async fn start_monitor_worker(
        &self,
        job: &Job,
        task: &Task,
        shutdown: ShutdownSignal,
    ) -> FlareResult<WorkerHandle> {
        let monitor_id = self.id_generator.next_id();
        let spec = MonitorSpec {
            job_id: job.id.clone(),
            monitor_id: monitor_id.clone(),
            jobs_api: self.jobs_api.clone(),
            metrics_api: self.metrics_api.clone(),
            target: task.cloud_target(),
            broker: self.broker.clone(),
        };

        let ready_queue =
            ReadyQueue::new(self.channels.monitor_ready(&monitor_id), &self.message_bus);
        let mut readiness = self.message_bus.subscribe_queue(ready_queue.name(), true).await?;

        let started = Instant::now();
        info!("任务 {} 创建监控Worker {}", job.id, monitor_id);
        let ready = match self.launcher.launch_monitor(&spec).await {
            Ok(()) => {
                self.await_ready(&mut readiness, &monitor_id, WorkerKind::Monitor, shutdown)
                    .await
            }
            Err(e) => {
                error!("任务 {} 创建监控Worker {} 失败: {}", job.id, monitor_id, e);
                counter!("flare_provisioning_failures_total", "kind" => WorkerKind::Monitor.as_str())
                    .increment(1);
                Err(e)
            }
        };
        drop(readiness);
        ready_queue.release().await;
        ready?;
        self.record_ready(WorkerKind::Monitor, started);

        Ok(WorkerHandle {
            id: monitor_id,
            job_id: job.id.clone(),
            kind: WorkerKind::Monitor,
            script_index: None,
            simulated_users: 0,
        })
    }

    /// 就绪信号的内容不做解析，任何一条消息都算就绪
    async fn await_ready(
        &self,
        readiness: &mut Subscription,
        worker_id: &str,
        kind: WorkerKind,
        mut shutdown: ShutdownSignal,
    ) -> FlareResult<()> {
        let deadline = Deadline::after_secs(self.readiness_timeout_seconds);
        let what = match kind {
            WorkerKind::TestClient => format!("Worker {worker_id} 就绪信号"),
            WorkerKind::Monitor => format!("监控Worker {worker_id} 就绪信号"),
        };

        next_signal(readiness, &deadline, &mut shutdown, &what).await?;
        debug!("{} {} 已就绪", kind.as_str(), worker_id);
        Ok(())
    }

    fn record_ready(&self, kind: WorkerKind, started: Instant) {
        counter!("flare_workers_provisioned_total", "kind" => kind.as_str()).increment(1);
        histogram!("flare_worker_ready_duration_seconds", "kind" => kind.as_str())
            .record(started.elapsed().as_secs_f64());
    }
}

/// 一次性的就绪队列
///
/// 正常路径上由 [`ReadyQueue::release`] 删除；等待被取消（例如同一脚本的
/// 兄弟Worker失败导致整批中止）时在析构里派生任务删除。
struct ReadyQueue {
    name: String,
    message_bus: Arc<dyn MessageBus>,
    released: bool,
}

impl ReadyQueue {
    fn new(name: String, message_bus: &Arc<dyn MessageBus>) -> Self {
        Self {
            name,
            message_bus: message_bus.clone(),
            released: false,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn release(mut self) {
        self.released = true;
        delete_ready_queue(self.message_bus.as_ref(), &self.name).await;
    }
}

impl Drop for ReadyQueue {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("运行时已关闭，就绪队列 {} 未删除", self.name);
            return;
        };
        let message_bus = self.message_bus.clone();
        let name = std::mem::take(&mut self.name);
        runtime.spawn(async move { delete_ready_queue(message_bus.as_ref(), &name).await });
    }
}

async fn delete_ready_queue(message_bus: &dyn MessageBus, queue: &str) {
    if let Err(e) = message_bus.delete_queue(queue).await {
        warn!("删除就绪队列 {} 失败: {}", queue, e);
    }
}
