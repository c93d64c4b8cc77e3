use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use flare_core::ShutdownSignal;
use metrics_exporter_prometheus::PrometheusBuilder;
pub use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志系统
///
/// `RUST_LOG` 优先于传入的日志级别。
pub fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 安装全局 Prometheus 指标记录器，返回用于渲染抓取结果的句柄
pub fn install_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))?;

    info!("Prometheus metrics recorder installed");
    Ok(handle)
}

#[derive(Clone)]
struct ServerState {
    metrics: Option<PrometheusHandle>,
}

/// `/health` 与 `/metrics` 路由
pub fn status_router(metrics: Option<PrometheusHandle>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .with_state(ServerState { metrics })
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "flare-orchestrator",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn render_metrics(State(state): State<ServerState>) -> impl IntoResponse {
    match state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}

/// 在已绑定的监听器上运行状态服务，直到收到关闭信号
pub async fn serve_status(
    listener: TcpListener,
    router: Router,
    mut shutdown: ShutdownSignal,
) -> Result<()> {
    let addr = listener.local_addr().context("获取监听地址失败")?;
    info!("状态服务监听于 {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("状态服务运行失败")
}
