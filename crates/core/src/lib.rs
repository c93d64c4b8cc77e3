//! # flare-core
//!
//! 压测编排服务的共享基础：错误类型、数据模型、通道命名、配置模型，
//! 以及基础设施层需要实现的接口（消息中间件、Worker创建、Jobs API）。

pub mod channels;
pub mod config;
pub mod errors;
pub mod models;
pub mod shutdown;
pub mod traits;

pub use channels::ChannelNames;
pub use errors::*;
pub use shutdown::{ShutdownManager, ShutdownSignal};
pub use traits::{IdGenerator, JobsApi, MessageBus, Subscription, UuidIdGenerator, WorkerLauncher};
