//! 完成信号记账。

use std::collections::HashSet;

use flare_core::models::NodeCompleteMessage;
use tracing::{debug, warn};

/// 一条完成信号的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// 已知节点第一次完成
    Counted(String),
    /// 不带节点ID的完成信号，直接计数
    Anonymous,
    /// 全部完成之后多出来的匿名信号
    Surplus,
    Duplicate(String),
    Unknown(String),
}

/// 按节点身份统计完成情况
///
/// 期望集合是实际创建出来的节点ID；每个ID只计一次，未知ID忽略。
/// 不带身份的信号按匿名完成计数，兼容不回传ID的旧版Worker。
#[derive(Debug)]
pub struct CompletionTracker {
    expected: HashSet<String>,
    completed: HashSet<String>,
    anonymous: usize,
    duplicates: usize,
    unknown: usize,
}

impl CompletionTracker {
    pub fn new<I, S>(expected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expected: expected.into_iter().map(Into::into).collect(),
            completed: HashSet::new(),
            anonymous: 0,
            duplicates: 0,
            unknown: 0,
        }
    }

    pub fn record(&mut self, message: &NodeCompleteMessage) -> CompletionOutcome {
        let Some(node_id) = message.node_id.as_ref() else {
            if self.is_complete() {
                self.duplicates += 1;
                return CompletionOutcome::Surplus;
            }
            self.anonymous += 1;
            debug!("收到匿名完成信号 ({}/{})", self.completed_count(), self.expected_count());
            return CompletionOutcome::Anonymous;
        };

        if !self.expected.contains(node_id) {
            self.unknown += 1;
            warn!("忽略未知节点 {} 的完成信号", node_id);
            return CompletionOutcome::Unknown(node_id.clone());
        }

        if !self.completed.insert(node_id.clone()) {
            self.duplicates += 1;
            warn!("节点 {} 重复发送完成信号", node_id);
            return CompletionOutcome::Duplicate(node_id.clone());
        }

        debug!(
            "节点 {} 已完成 ({}/{})",
            node_id,
            self.completed_count(),
            self.expected_count()
        );
        CompletionOutcome::Counted(node_id.clone())
    }

    pub fn expected_count(&self) -> usize {
        self.expected.len()
    }

    /// 已计入的完成数，匿名信号最多补足未完成的部分
    pub fn completed_count(&self) -> usize {
        (self.completed.len() + self.anonymous).min(self.expected_count())
    }

    pub fn is_complete(&self) -> bool {
        self.completed.len() + self.anonymous >= self.expected_count()
    }

    /// 还没有带身份完成的节点
    pub fn outstanding(&self) -> Vec<String> {
        let mut outstanding: Vec<_> = self
            .expected
            .difference(&self.completed)
            .cloned()
            .collect();
        outstanding.sort();
        outstanding
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicates
    }

    pub fn unknown_count(&self) -> usize {
        self.unknown
    }
}
