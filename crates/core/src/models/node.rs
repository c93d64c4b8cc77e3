use serde::{Deserialize, Serialize};

/// 远端Worker通过 Jobs API 上报的连接统计，编排侧只读
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub total_successful_connections: i64,
    #[serde(default)]
    pub total_failed_connections: i64,
    #[serde(default)]
    pub total_dropped_connections: i64,
}

/// 分片结果：单个Worker承载的模拟用户数，不持久化
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodePlan {
    pub total_simulated_users: i64,
}

impl NodePlan {
    pub fn new(total_simulated_users: i64) -> Self {
        Self {
            total_simulated_users,
        }
    }
}
