use std::sync::Arc;

use flare_core::{
    models::{Job, Node, Task},
    FlareResult, JobsApi,
};
use tracing::{info, instrument};

/// 一次评估的结论及计算依据
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub total_simulators: i64,
    pub total_successful_connections: i64,
    pub threshold: f64,
    pub passed: bool,
}

/// 根据节点上报的成功连接数计算是否通过
///
/// 阈值是计划负载（而不是实际负载）的百分比，恰好等于阈值也算通过。
pub fn compute_verdict(task: &Task, nodes: &[Node]) -> Verdict {
    let total_simulators = task.total_simulators();
    let total_successful_connections: i64 =
        nodes.iter().map(|n| n.total_successful_connections).sum();
    let threshold = (total_simulators as f64 / 100.0) * task.success_threshold;

    Verdict {
        total_simulators,
        total_successful_connections,
        threshold,
        passed: total_successful_connections as f64 >= threshold,
    }
}

/// 结果评估器：拉取节点指标、判定并持久化任务结果
pub struct ResultsEvaluator {
    jobs_api: Arc<dyn JobsApi>,
}

impl ResultsEvaluator {
    pub fn new(jobs_api: Arc<dyn JobsApi>) -> Self {
        Self { jobs_api }
    }

    /// 失败不重试，直接向上返回
    #[instrument(skip_all, fields(job_id = %job.id))]
    pub async fn evaluate(&self, task: &Task, job: &Job) -> FlareResult<Verdict> {
        let nodes = self.jobs_api.get_nodes(&job.id).await?;
        let verdict = compute_verdict(task, &nodes);

        info!(
            "任务 {} 成功连接 {} / 计划 {}，阈值 {:.1}，结果: {}",
            job.id,
            verdict.total_successful_connections,
            verdict.total_simulators,
            verdict.threshold,
            if verdict.passed { "通过" } else { "未通过" }
        );

        self.jobs_api.update_job(&job.with_verdict(verdict.passed)).await?;
        Ok(verdict)
    }
}
