use async_trait::async_trait;

use crate::{
    models::{Job, Node},
    FlareResult,
};

/// 外部 Jobs API：保存任务记录与节点上报的统计
#[async_trait]
pub trait JobsApi: Send + Sync {
    /// 获取某个任务下所有节点的上报数据
    async fn get_nodes(&self, job_id: &str) -> FlareResult<Vec<Node>>;

    /// 回写任务记录
    async fn update_job(&self, job: &Job) -> FlareResult<()>;
}
