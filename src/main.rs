use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use flare_core::{config::AppConfig, ShutdownManager};
use flare_infrastructure::init_logging;
use tracing::{error, info, warn};

mod app;
mod shutdown;

use app::Application;
use shutdown::wait_for_shutdown_signal;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("flare")
        .version(env!("CARGO_PKG_VERSION"))
        .about("分布式压测任务编排服务")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时依次查找 config/flare.toml、flare.toml、/etc/flare/config.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty"]),
        )
        .arg(
            Arg::new("check-config")
                .long("check-config")
                .help("只校验配置并打印生效的配置后退出")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);

    let config = AppConfig::load(config_path).with_context(|| match config_path {
        Some(path) => format!("加载配置文件失败: {path}"),
        None => "加载配置失败".to_string(),
    })?;

    if matches.get_flag("check-config") {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    let log_level = matches
        .get_one::<String>("log-level")
        .cloned()
        .unwrap_or_else(|| config.observability.log_level.clone());
    let log_format = matches
        .get_one::<String>("log-format")
        .cloned()
        .unwrap_or_else(|| config.observability.log_format.clone());
    init_logging(&log_level, &log_format)?;

    info!("启动分布式压测任务编排服务");
    info!(
        "RabbitMQ: {}:{}，Kubernetes命名空间: {}，单节点连接上限: {}",
        config.amqp.host,
        config.amqp.port,
        config.kubernetes.namespace,
        config.orchestration.connection_limit_per_node
    );

    let app = Arc::new(Application::new(config).await?);
    let shutdown_manager = ShutdownManager::new();

    let mut app_handle = {
        let app = Arc::clone(&app);
        let shutdown = shutdown_manager.subscribe();
        tokio::spawn(async move { app.run(shutdown).await })
    };

    tokio::select! {
        _ = wait_for_shutdown_signal() => {
            info!("收到关闭信号，开始优雅关闭...");
        }
        joined = &mut app_handle => {
            // 应用在没有关闭信号的情况下退出
            return match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!("应用运行失败: {e:#}");
                    Err(e)
                }
                Err(e) => Err(anyhow::anyhow!("应用任务异常退出: {e}")),
            };
        }
    }

    shutdown_manager.shutdown();

    match tokio::time::timeout(Duration::from_secs(30), app_handle).await {
        Ok(Ok(Ok(()))) => info!("应用已优雅关闭"),
        Ok(Ok(Err(e))) => error!("应用关闭时发生错误: {e:#}"),
        Ok(Err(e)) => error!("应用任务异常退出: {e}"),
        Err(_) => warn!("应用关闭超时，强制退出"),
    }

    info!("分布式压测任务编排服务已退出");
    Ok(())
}
