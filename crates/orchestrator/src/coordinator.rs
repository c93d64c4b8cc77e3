use std::fmt;
use std::sync::Arc;

use flare_core::{
    config::AppConfig,
    models::{
        message, Job, JobCompleteMessage, NodeCompleteMessage, NodePlan, StartTestMessage, Task,
        WorkerHandle,
    },
    ChannelNames, FlareResult, IdGenerator, JobsApi, MessageBus, ShutdownSignal, Subscription,
    WorkerLauncher,
};
use futures::{stream, StreamExt, TryStreamExt};
use metrics::counter;
use tracing::{error, info, instrument, warn};

use crate::completion::{CompletionOutcome, CompletionTracker};
use crate::partitioner::{expected_worker_count, partition};
use crate::provisioner::WorkerProvisioner;
use crate::results::{ResultsEvaluator, Verdict};
use crate::signal::{next_signal, Deadline};

/// 单个任务的编排阶段，只会向前推进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobPhase {
    Received,
    MonitorProvisioning,
    MonitorReady,
    ScriptsProvisioning,
    AllWorkersReady,
    TestStarted,
    AwaitingCompletion,
    ResultsEvaluated,
    JobCompleteBroadcast,
}

impl JobPhase {
    pub const ALL: [JobPhase; 9] = [
        JobPhase::Received,
        JobPhase::MonitorProvisioning,
        JobPhase::MonitorReady,
        JobPhase::ScriptsProvisioning,
        JobPhase::AllWorkersReady,
        JobPhase::TestStarted,
        JobPhase::AwaitingCompletion,
        JobPhase::ResultsEvaluated,
        JobPhase::JobCompleteBroadcast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Received => "received",
            JobPhase::MonitorProvisioning => "monitor_provisioning",
            JobPhase::MonitorReady => "monitor_ready",
            JobPhase::ScriptsProvisioning => "scripts_provisioning",
            JobPhase::AllWorkersReady => "all_workers_ready",
            JobPhase::TestStarted => "test_started",
            JobPhase::AwaitingCompletion => "awaiting_completion",
            JobPhase::ResultsEvaluated => "results_evaluated",
            JobPhase::JobCompleteBroadcast => "job_complete_broadcast",
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct PhaseTracker {
    job_id: String,
    history: Vec<JobPhase>,
}

impl PhaseTracker {
    fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            history: vec![JobPhase::Received],
        }
    }

    fn current(&self) -> JobPhase {
        self.history.last().copied().unwrap_or(JobPhase::Received)
    }

    fn advance(&mut self, next: JobPhase) {
        debug_assert!(next > self.current(), "阶段不能回退: {} -> {}", self.current(), next);
        info!("任务 {} 阶段: {} -> {}", self.job_id, self.current(), next);
        self.history.push(next);
    }
}

/// 一次成功编排的结果
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: String,
    pub monitor: WorkerHandle,
    pub workers: Vec<WorkerHandle>,
    pub verdict: Verdict,
    pub phases: Vec<JobPhase>,
}

impl JobOutcome {
    pub fn passed(&self) -> bool {
        self.verdict.passed
    }
}

/// 任务协调器
///
/// 每收到一个创建任务请求就跑一遍完整的状态机：监控Worker就绪、按脚本顺序
/// 创建测试客户端、广播开始、收集完成信号、评估结果、广播任务完成。
/// 并发任务之间只靠通道名隔离，协调器本身不保存跨任务状态。
pub struct JobCoordinator {
    provisioner: WorkerProvisioner,
    evaluator: ResultsEvaluator,
    message_bus: Arc<dyn MessageBus>,
    channels: ChannelNames,
    connection_limit_per_node: i64,
    max_concurrent_provisioning: usize,
    completion_timeout_seconds: u64,
}

impl JobCoordinator {
    pub fn new(
        config: &AppConfig,
        launcher: Arc<dyn WorkerLauncher>,
        message_bus: Arc<dyn MessageBus>,
        jobs_api: Arc<dyn JobsApi>,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Self {
        let provisioner =
            WorkerProvisioner::new(config, launcher, message_bus.clone(), id_generator);

        Self {
            provisioner,
            evaluator: ResultsEvaluator::new(jobs_api),
            message_bus,
            channels: ChannelNames::new(config.channels.clone()),
            connection_limit_per_node: config.orchestration.connection_limit_per_node,
            max_concurrent_provisioning: config.orchestration.max_concurrent_provisioning.max(1),
            completion_timeout_seconds: config.orchestration.completion_timeout_seconds,
        }
    }

    /// 执行一个任务的完整编排流程
    ///
    /// 任何一步失败都会停在当前阶段，不会发送任务完成广播。
    #[instrument(skip_all, fields(job_id = %job.id, task_id = %task.id))]
    pub async fn run(
        &self,
        job: &Job,
        task: &Task,
        shutdown: ShutdownSignal,
    ) -> FlareResult<JobOutcome> {
        let mut phases = PhaseTracker::new(&job.id);
        info!(
            "开始编排任务 {}: {} 个脚本，共 {} 个模拟用户",
            job.id,
            task.scripts.len(),
            task.total_simulators()
        );

        match self.execute(job, task, shutdown, &mut phases).await {
            Ok(outcome) => {
                counter!("flare_jobs_completed_total", "passed" => outcome.passed().to_string())
                    .increment(1);
                info!("任务 {} 编排完成，结果: {}", job.id, outcome.passed());
                Ok(outcome)
            }
            Err(e) => {
                counter!("flare_jobs_failed_total", "reason" => e.kind()).increment(1);
                error!("任务 {} 在阶段 {} 失败: {}", job.id, phases.current(), e);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        job: &Job,
        task: &Task,
        shutdown: ShutdownSignal,
        phases: &mut PhaseTracker,
    ) -> FlareResult<JobOutcome> {
        phases.advance(JobPhase::MonitorProvisioning);
        let monitor = self
            .provisioner
            .start_monitor_worker(job, task, shutdown.clone())
            .await?;
        phases.advance(JobPhase::MonitorReady);

        phases.advance(JobPhase::ScriptsProvisioning);
        let mut workers = Vec::new();
        for (script_index, script) in task.scripts.iter().enumerate() {
            let plans = partition(script.total_simulators, self.connection_limit_per_node);
            let handles = self
                .provision_script(job, script_index, &plans, shutdown.clone())
                .await?;
            workers.extend(handles);
        }
        phases.advance(JobPhase::AllWorkersReady);

        let expected = expected_worker_count(&task.scripts, self.connection_limit_per_node);
        if expected != workers.len() {
            warn!(
                "任务 {} 按总数计算需要 {} 个Worker，实际创建 {} 个，以实际创建数为准",
                job.id,
                expected,
                workers.len()
            );
        }

        // 先声明完成队列再广播开始，避免丢失最早的完成信号
        let complete_queue = self.channels.node_complete(&job.id);
        let mut completions = self.message_bus.subscribe_queue(&complete_queue, true).await?;

        let collected = self
            .start_and_collect(job, task, &workers, &mut completions, shutdown, phases)
            .await;
        drop(completions);
        if let Err(e) = self.message_bus.delete_queue(&complete_queue).await {
            warn!("删除完成队列 {} 失败: {}", complete_queue, e);
        }
        collected?;

        let verdict = self.evaluator.evaluate(task, job).await?;
        phases.advance(JobPhase::ResultsEvaluated);

        let done = message::encode(&JobCompleteMessage::new(verdict.passed))?;
        self.message_bus
            .publish_fanout(&self.channels.job_complete(&job.id), &done)
            .await?;
        phases.advance(JobPhase::JobCompleteBroadcast);

        Ok(JobOutcome {
            job_id: job.id.clone(),
            monitor,
            workers,
            verdict,
            phases: phases.history.clone(),
        })
    }

    async fn start_and_collect(
        &self,
        job: &Job,
        task: &Task,
        workers: &[WorkerHandle],
        completions: &mut Subscription,
        shutdown: ShutdownSignal,
        phases: &mut PhaseTracker,
    ) -> FlareResult<()> {
        let start = message::encode(&StartTestMessage::new(task.scripts.clone()))?;
        self.message_bus
            .publish_fanout(&self.channels.start(&job.id), &start)
            .await?;
        phases.advance(JobPhase::TestStarted);

        phases.advance(JobPhase::AwaitingCompletion);
        self.await_completions(job, workers, completions, shutdown)
            .await
    }

    /// 以固定并发度创建一个脚本的全部Worker，全部就绪后才返回
    ///
    /// 第一个错误即中止该脚本，已创建的兄弟Worker不做回收。
    async fn provision_script(
        &self,
        job: &Job,
        script_index: usize,
        plans: &[NodePlan],
        shutdown: ShutdownSignal,
    ) -> FlareResult<Vec<WorkerHandle>> {
        info!(
            "任务 {} 脚本 {} 需要 {} 个Worker (并发上限 {})",
            job.id,
            script_index,
            plans.len(),
            self.max_concurrent_provisioning
        );

        let launches: Vec<_> = plans
            .iter()
            .map(|plan| {
                self.provisioner.start_test_worker(
                    job,
                    plan.total_simulated_users,
                    script_index,
                    shutdown.clone(),
                )
            })
            .collect();

        let result = stream::iter(launches)
            .buffer_unordered(self.max_concurrent_provisioning)
            .try_collect::<Vec<_>>()
            .await;

        match result {
            Ok(handles) => {
                info!("任务 {} 脚本 {} 的 {} 个Worker全部就绪", job.id, script_index, handles.len());
                Ok(handles)
            }
            Err(e) => {
                error!(
                    "任务 {} 脚本 {} 创建中止，已创建的Worker不会被回收: {}",
                    job.id, script_index, e
                );
                Err(e)
            }
        }
    }

    async fn await_completions(
        &self,
        job: &Job,
        workers: &[WorkerHandle],
        completions: &mut Subscription,
        mut shutdown: ShutdownSignal,
    ) -> FlareResult<()> {
        let mut tracker = CompletionTracker::new(workers.iter().map(|w| w.id.clone()));
        let deadline = Deadline::after_secs(self.completion_timeout_seconds);
        let what = format!("任务 {} 的完成信号", job.id);

        while !tracker.is_complete() {
            let payload = match next_signal(completions, &deadline, &mut shutdown, &what).await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(
                        "任务 {} 已完成 {}/{}，未完成节点: {:?}",
                        job.id,
                        tracker.completed_count(),
                        tracker.expected_count(),
                        tracker.outstanding()
                    );
                    return Err(e);
                }
            };

            match tracker.record(&NodeCompleteMessage::from_slice_lenient(&payload)) {
                CompletionOutcome::Counted(_) | CompletionOutcome::Anonymous => {
                    counter!("flare_node_completions_total").increment(1);
                }
                CompletionOutcome::Duplicate(_) | CompletionOutcome::Surplus => {
                    counter!("flare_duplicate_completions_total").increment(1);
                }
                CompletionOutcome::Unknown(_) => {
                    counter!("flare_unknown_completions_total").increment(1);
                }
            }
        }

        info!(
            "任务 {} 的 {} 个Worker全部完成",
            job.id,
            tracker.expected_count()
        );
        Ok(())
    }
}
