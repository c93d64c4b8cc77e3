use tokio::sync::watch;
use tracing::{debug, info};

/// 优雅关闭管理器
///
/// 基于 watch 通道：关闭后才订阅的接收端同样能立即观察到关闭状态。
#[derive(Debug)]
pub struct ShutdownManager {
    shutdown_tx: watch::Sender<bool>,
}

/// 关闭信号，可克隆后交给任意数量的等待点
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownManager {
    /// 创建新的关闭管理器
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self { shutdown_tx }
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown_tx.subscribe(),
        }
    }

    /// 触发关闭
    pub fn shutdown(&self) {
        if *self.shutdown_tx.borrow() {
            debug!("关闭管理器已经触发过关闭");
            return;
        }

        info!("触发系统关闭");
        self.shutdown_tx.send_replace(true);
        debug!("关闭信号已发送给 {} 个订阅者", self.shutdown_tx.receiver_count());
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// 永远不会触发的信号，用于不需要取消的场景
    pub fn never() -> Self {
        // 发送端随即丢弃，cancelled() 永远挂起
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等待关闭信号
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|stopped| *stopped).await.is_err() {
            // 管理器已被丢弃且从未触发关闭
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_late_subscriber_sees_shutdown() {
        let manager = ShutdownManager::new();
        manager.shutdown();

        let mut signal = manager.subscribe();
        assert!(signal.is_shutdown());
        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .expect("已关闭的信号应立即返回");
    }

    #[tokio::test]
    async fn test_signal_wakes_waiters() {
        let manager = ShutdownManager::new();
        let mut signal = manager.subscribe();

        let waiter = tokio::spawn(async move {
            signal.cancelled().await;
        });

        manager.shutdown();
        manager.shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("等待者应被唤醒")
            .unwrap();
        assert!(manager.is_shutdown());
    }

    #[tokio::test]
    async fn test_never_signal_stays_pending() {
        let mut signal = ShutdownSignal::never();
        let result = tokio::time::timeout(Duration::from_millis(50), signal.cancelled()).await;
        assert!(result.is_err());
    }
}
