use std::sync::Arc;

use anyhow::{Context, Result};
use flare_core::{config::AppConfig, ChannelNames, ShutdownSignal, UuidIdGenerator};
use flare_infrastructure::{
    install_metrics_recorder, serve_status, status_router, HttpJobsApi, KubernetesLauncher,
    PrometheusHandle, RabbitMqMessageBus,
};
use flare_orchestrator::{IngressListener, JobCoordinator};
use tokio::net::TcpListener;
use tracing::{error, info};

/// 主应用程序
pub struct Application {
    config: AppConfig,
    message_bus: Arc<RabbitMqMessageBus>,
    ingress: IngressListener,
    metrics: Option<PrometheusHandle>,
}

impl Application {
    /// 连接外部依赖并组装编排组件
    pub async fn new(config: AppConfig) -> Result<Self> {
        let metrics = if config.observability.metrics_enabled {
            Some(install_metrics_recorder()?)
        } else {
            None
        };

        let message_bus = Arc::new(
            RabbitMqMessageBus::new(&config.amqp)
                .await
                .context("连接RabbitMQ失败")?,
        );

        let launcher = Arc::new(
            KubernetesLauncher::new(config.kubernetes.clone())
                .await
                .context("初始化Kubernetes客户端失败")?,
        );

        let jobs_api = Arc::new(HttpJobsApi::new(&config.jobs_api).context("创建Jobs API客户端失败")?);
        info!("Jobs API: {}", jobs_api.base_url());

        let coordinator = Arc::new(JobCoordinator::new(
            &config,
            launcher,
            message_bus.clone(),
            jobs_api,
            Arc::new(UuidIdGenerator),
        ));

        let channels = ChannelNames::new(config.channels.clone());
        let ingress = IngressListener::new(coordinator, message_bus.clone(), &channels);

        Ok(Self {
            config,
            message_bus,
            ingress,
            metrics,
        })
    }

    /// 运行到收到关闭信号，或创建任务队列意外关闭
    pub async fn run(&self, shutdown: ShutdownSignal) -> Result<()> {
        let status_server = if self.config.server.enabled {
            let listener = TcpListener::bind(&self.config.server.bind_address)
                .await
                .with_context(|| format!("绑定状态服务地址失败: {}", self.config.server.bind_address))?;
            let router = status_router(self.metrics.clone());
            let shutdown = shutdown.clone();

            Some(tokio::spawn(async move {
                if let Err(e) = serve_status(listener, router, shutdown).await {
                    error!("状态服务异常退出: {e:#}");
                }
            }))
        } else {
            None
        };

        let result = self
            .ingress
            .run(shutdown)
            .await
            .context("创建任务监听异常退出");

        if let Some(handle) = status_server {
            handle.abort();
        }

        if self.message_bus.is_connected() {
            if let Err(e) = self.message_bus.close().await {
                error!("关闭RabbitMQ连接失败: {e}");
            }
        }

        result
    }
}
