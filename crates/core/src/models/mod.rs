//! # 数据模型
//!
//! 压测编排服务的核心数据结构：任务定义(Task/Script)、任务执行实例(Job)、
//! 由远端Worker上报的节点结果(Node)，以及各消息通道上的报文格式。
//!
//! Job、Task、Node 与外部 Jobs API 以 camelCase JSON 交换，未识别的字段会原样保留，
//! 回写 Job 时不会丢失外部服务追加的属性。

pub mod job;
pub mod message;
pub mod node;
pub mod task;
pub mod worker;

pub use job::*;
pub use message::*;
pub use node::*;
pub use task::*;
pub use worker::*;
