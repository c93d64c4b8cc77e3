//! 通道命名。
//!
//! 按任务/节点/监控ID加后缀隔离，两个并发任务永远不会收到对方的信号。

use crate::config::ChannelsConfig;

#[derive(Debug, Clone)]
pub struct ChannelNames {
    config: ChannelsConfig,
}

impl ChannelNames {
    pub fn new(config: ChannelsConfig) -> Self {
        Self { config }
    }

    /// 创建任务请求队列（持久化）
    pub fn create_job(&self) -> &str {
        &self.config.create_job_queue
    }

    /// `<node-ready-topic>.<nodeId>`
    pub fn node_ready(&self, node_id: &str) -> String {
        format!("{}.{}", self.config.node_ready_topic, node_id)
    }

    /// `<monitor-ready-topic>.<monitorId>`
    pub fn monitor_ready(&self, monitor_id: &str) -> String {
        format!("{}.{}", self.config.monitor_ready_topic, monitor_id)
    }

    /// 开始广播的 fanout 交换机 `<start-topic>.<jobId>`
    pub fn start(&self, job_id: &str) -> String {
        format!("{}.{}", self.config.start_topic, job_id)
    }

    /// `<node-complete-topic>.<jobId>`
    pub fn node_complete(&self, job_id: &str) -> String {
        format!("{}.{}", self.config.node_complete_topic, job_id)
    }

    /// 任务完成广播的 fanout 交换机 `<job-complete-topic>.<jobId>`
    pub fn job_complete(&self, job_id: &str) -> String {
        format!("{}.{}", self.config.job_complete_topic, job_id)
    }
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self::new(ChannelsConfig::default())
    }
}
