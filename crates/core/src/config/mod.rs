//! 配置管理
//!
//! 所有配置集中在 [`AppConfig`] 中，启动时一次性加载并校验，
//! 之后以值的形式传入各组件的构造函数。
//!
//! 加载顺序：默认值 → TOML 配置文件 → `FLARE__` 前缀的环境变量，
//! 例如 `FLARE__AMQP__HOST=rabbitmq`、`FLARE__ORCHESTRATION__CONNECTION_LIMIT_PER_NODE=500`。

pub mod models;

pub use models::*;
