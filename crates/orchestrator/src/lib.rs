//! # flare-orchestrator
//!
//! 分布式压测的编排控制面：按连接上限切分负载、创建并同步远端Worker、
//! 收集完成信号、评估结果并广播任务完成。

pub mod completion;
pub mod coordinator;
pub mod ingress;
pub mod partitioner;
pub mod provisioner;
pub mod results;
pub mod signal;

pub use completion::{CompletionOutcome, CompletionTracker};
pub use coordinator::{JobCoordinator, JobOutcome, JobPhase};
pub use ingress::IngressListener;
pub use partitioner::{expected_worker_count, partition, planned_worker_count};
pub use provisioner::WorkerProvisioner;
pub use results::{compute_verdict, ResultsEvaluator, Verdict};
pub use signal::Deadline;
