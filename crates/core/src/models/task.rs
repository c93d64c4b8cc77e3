use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 压测任务定义
///
/// 一次编排期间不可变。`scripts` 的顺序决定创建Worker的顺序，
/// 下标会作为 `scriptIndex` 传给每个Worker。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub project_id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub scripts: Vec<Script>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf_api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf_pass: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf_org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf_space: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cf_apps: Option<String>,
    /// 通过阈值，百分比 (0-100)
    #[serde(default)]
    pub success_threshold: f64,
}

/// 单个压测脚本
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// 启动偏移（秒）
    #[serde(default)]
    pub start: f64,
    /// 超时时间（秒）
    #[serde(default)]
    pub timeout: f64,
    pub total_simulators: i64,
    pub target: String,
    #[serde(default)]
    pub retry_limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payloads: Option<Vec<SocketPayload>>,
    /// 原样转发给Worker的其余字段
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 连接建立后按时间发送的报文
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocketPayload {
    /// 发送偏移（秒）
    pub start: f64,
    pub payload: Value,
}

/// 监控Worker使用的目标环境凭据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloudTarget {
    pub api: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub org: Option<String>,
    pub space: Option<String>,
    pub apps: Option<String>,
}

impl Task {
    /// 所有脚本计划的模拟连接总数
    pub fn total_simulators(&self) -> i64 {
        self.scripts.iter().map(|s| s.total_simulators).sum()
    }

    pub fn cloud_target(&self) -> CloudTarget {
        CloudTarget {
            api: self.cf_api.clone(),
            user: self.cf_user.clone(),
            pass: self.cf_pass.clone(),
            org: self.cf_org.clone(),
            space: self.cf_space.clone(),
            apps: self.cf_apps.clone(),
        }
    }
}
