//! # Flare Testing Utils
//!
//! 工作区各crate共用的测试工具：
//!
//! - **SimulatedWorkerFleet**: 在内存消息总线上模拟真实Pod的行为（就绪 → 等待开始 → 完成）
//! - **Mocks**: Worker创建器、Jobs API、可预测的ID生成器
//! - **Builders**: Job/Task/Script/Node 测试数据构建器
//! - **Helpers**: 测试配置与异步等待工具
//!
//! ```toml
//! [dev-dependencies]
//! flare-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod fleet;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use fleet::*;
pub use helpers::*;
pub use mocks::*;
