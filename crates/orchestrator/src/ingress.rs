use std::sync::Arc;

use flare_core::{
    models::CreateJobMessage, ChannelNames, FlareError, FlareResult, MessageBus, ShutdownSignal,
};
use metrics::counter;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::coordinator::{JobCoordinator, JobOutcome};

/// 创建任务请求的入口
///
/// 从持久化的创建任务队列消费请求，每个合法请求启动一个独立的协调任务。
/// 无法解析的消息记录日志后丢弃，不影响后续消费。
pub struct IngressListener {
    coordinator: Arc<JobCoordinator>,
    message_bus: Arc<dyn MessageBus>,
    queue: String,
}

impl IngressListener {
    pub fn new(
        coordinator: Arc<JobCoordinator>,
        message_bus: Arc<dyn MessageBus>,
        channels: &ChannelNames,
    ) -> Self {
        Self {
            coordinator,
            message_bus,
            queue: channels.create_job().to_string(),
        }
    }

    /// 持续消费直到收到关闭信号或队列被关闭
    ///
    /// 退出前等待所有进行中的任务结束；这些任务同样持有关闭信号，会尽快以取消结束。
    pub async fn run(&self, mut shutdown: ShutdownSignal) -> FlareResult<()> {
        let mut subscription = self.message_bus.subscribe_queue(&self.queue, true).await?;
        let mut jobs: JoinSet<FlareResult<JobOutcome>> = JoinSet::new();
        let mut closed = false;

        info!("开始监听创建任务队列: {}", self.queue);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("收到关闭信号，停止消费创建任务队列");
                    break;
                }
                Some(joined) = jobs.join_next(), if !jobs.is_empty() => {
                    Self::log_joined(joined);
                }
                message = subscription.next_message() => match message {
                    Some(Ok(payload)) => self.dispatch(&mut jobs, &payload, &shutdown),
                    Some(Err(e)) => error!("接收创建任务消息失败: {}", e),
                    None => {
                        warn!("创建任务队列 {} 已关闭", self.queue);
                        closed = true;
                        break;
                    }
                },
            }
        }

        drop(subscription);

        if !jobs.is_empty() {
            info!("等待 {} 个进行中的任务结束", jobs.len());
        }
        while let Some(joined) = jobs.join_next().await {
            Self::log_joined(joined);
        }

        if closed {
            return Err(FlareError::ChannelClosed(self.queue.clone()));
        }

        info!("创建任务监听已停止");
        Ok(())
    }

    fn dispatch(
        &self,
        jobs: &mut JoinSet<FlareResult<JobOutcome>>,
        payload: &[u8],
        shutdown: &ShutdownSignal,
    ) {
        let request = match CreateJobMessage::from_slice(payload) {
            Ok(request) => request,
            Err(e) => {
                warn!("丢弃无法解析的创建任务消息: {}", e);
                counter!("flare_invalid_messages_total").increment(1);
                return;
            }
        };

        counter!("flare_jobs_received_total").increment(1);
        info!(
            "收到创建任务请求: job={} task={}",
            request.job.id, request.task.id
        );

        let coordinator = self.coordinator.clone();
        let shutdown = shutdown.clone();
        jobs.spawn(async move {
            coordinator
                .run(&request.job, &request.task, shutdown)
                .await
        });
    }

    fn log_joined(joined: Result<FlareResult<JobOutcome>, tokio::task::JoinError>) {
        match joined {
            Ok(Ok(outcome)) => debug!("任务 {} 的协调任务已结束", outcome.job_id),
            // 协调器已经记录过失败原因
            Ok(Err(_)) => {}
            Err(e) => error!("协调任务异常退出: {}", e),
        }
    }
}
