//! 带截止时间和关闭信号的消息等待。

use std::time::Duration;

use flare_core::{FlareError, FlareResult, ShutdownSignal, Subscription};
use tokio::time::Instant;

/// 约30年，实际等同于不限时
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// 一次等待的绝对截止时间
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    seconds: u64,
}

impl Deadline {
    /// 超出时钟表示范围的超时按 [`FAR_FUTURE`] 处理
    pub fn after_secs(seconds: u64) -> Self {
        let now = Instant::now();
        let at = now
            .checked_add(Duration::from_secs(seconds))
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self { at, seconds }
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }
}

/// 等待订阅上的下一条消息
///
/// 先到者为准：消息、截止时间、关闭信号，或者通道被关闭。
/// 同一个 `Deadline` 可以跨多次调用复用，用于收集多条消息。
pub async fn next_signal(
    subscription: &mut Subscription,
    deadline: &Deadline,
    shutdown: &mut ShutdownSignal,
    what: &str,
) -> FlareResult<Vec<u8>> {
    let channel = subscription.name().to_string();

    tokio::select! {
        biased;

        _ = shutdown.cancelled() => Err(FlareError::Cancelled(what.to_string())),

        received = tokio::time::timeout_at(deadline.at, subscription.next_message()) => {
            match received {
                Ok(Some(message)) => message,
                Ok(None) => Err(FlareError::ChannelClosed(channel)),
                Err(_) => Err(FlareError::timeout(what, deadline.seconds)),
            }
        }
    }
}
