//! # flare-infrastructure
//!
//! 核心接口的具体实现：RabbitMQ / 内存消息总线、Kubernetes Worker创建、
//! Jobs API HTTP 客户端，以及日志、指标和健康检查端点。

pub mod in_memory_queue;
pub mod jobs_api;
pub mod kubernetes;
pub mod message_queue;
pub mod observability;

pub use in_memory_queue::InMemoryMessageBus;
pub use jobs_api::HttpJobsApi;
pub use kubernetes::KubernetesLauncher;
pub use message_queue::RabbitMqMessageBus;
pub use observability::*;
