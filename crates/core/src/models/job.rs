use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 一次压测执行实例
///
/// 由外部服务在编排开始前创建，编排过程中只在出结果时被修改一次。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    /// 原样保存，回写时不重新格式化
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub user_id: String,
    pub task_id: String,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub passed: bool,
    /// Jobs API 返回的其余字段，回写时保持不变
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Job {
    /// 生成记录最终结果的副本：`passed` 写入判定结果，`isRunning` 置为 false
    pub fn with_verdict(&self, passed: bool) -> Self {
        Self {
            passed,
            is_running: false,
            ..self.clone()
        }
    }
}
