use thiserror::Error;

/// 编排服务错误类型定义
#[derive(Debug, Error)]
pub enum FlareError {
    #[error("消息队列错误: {0}")]
    MessageQueue(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("创建Worker {worker_id} 失败: {message}")]
    Provisioning { worker_id: String, message: String },

    #[error("Kubernetes错误: {0}")]
    Kubernetes(String),

    #[error("Jobs API错误: {0}")]
    JobsApi(String),

    #[error("等待{what}超时 ({seconds}秒)")]
    Timeout { what: String, seconds: u64 },

    #[error("操作已取消: {0}")]
    Cancelled(String),

    #[error("通道已关闭: {0}")]
    ChannelClosed(String),

    #[error("无效的消息: {0}")]
    InvalidMessage(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的Result类型
pub type FlareResult<T> = std::result::Result<T, FlareError>;

impl FlareError {
    pub fn provisioning<S: Into<String>, M: Into<String>>(worker_id: S, message: M) -> Self {
        Self::Provisioning {
            worker_id: worker_id.into(),
            message: message.into(),
        }
    }

    pub fn timeout<S: Into<String>>(what: S, seconds: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            seconds,
        }
    }

    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FlareError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FlareError::Cancelled(_))
    }

    /// 用于指标标签的简短错误类别
    pub fn kind(&self) -> &'static str {
        match self {
            FlareError::MessageQueue(_) => "message_queue",
            FlareError::Serialization(_) => "serialization",
            FlareError::Configuration(_) => "configuration",
            FlareError::Provisioning { .. } => "provisioning",
            FlareError::Kubernetes(_) => "kubernetes",
            FlareError::JobsApi(_) => "jobs_api",
            FlareError::Timeout { .. } => "timeout",
            FlareError::Cancelled(_) => "cancelled",
            FlareError::ChannelClosed(_) => "channel_closed",
            FlareError::InvalidMessage(_) => "invalid_message",
            FlareError::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for FlareError {
    fn from(err: serde_json::Error) -> Self {
        FlareError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlareError::timeout("Worker node-1 就绪信号", 30);
        assert_eq!(err.to_string(), "等待Worker node-1 就绪信号超时 (30秒)");

        let err = FlareError::provisioning("node-2", "HTTP 500");
        assert_eq!(err.to_string(), "创建Worker node-2 失败: HTTP 500");
    }

    #[test]
    fn test_error_predicates() {
        assert!(FlareError::timeout("x", 1).is_timeout());
        assert!(!FlareError::timeout("x", 1).is_cancelled());
        assert!(FlareError::Cancelled("shutdown".to_string()).is_cancelled());
        assert_eq!(FlareError::JobsApi("boom".to_string()).kind(), "jobs_api");
    }

    #[test]
    fn test_from_serde_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: FlareError = parse_err.into();
        assert!(matches!(err, FlareError::Serialization(_)));
    }
}
