//! 各消息通道上的报文格式。
//!
//! 就绪信号不解析内容，任何消息都算一次就绪。

use serde::{Deserialize, Serialize};

use super::{Job, Script, Task};
use crate::{FlareError, FlareResult};

/// `job.create` 队列上的创建任务请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub job: Job,
    pub task: Task,
}

/// 开始压测广播，Worker 通过创建时分配的 `scriptIndex` 找到自己的脚本
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartTestMessage {
    pub start: bool,
    pub scripts: Vec<Script>,
}

/// 单个Worker的完成信号
///
/// 旧版Worker发送的报文不带 `nodeId`，此时按匿名完成计数。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeCompleteMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

/// 整个任务完成广播
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct JobCompleteMessage {
    pub done: bool,
    pub passed: bool,
}

impl CreateJobMessage {
    pub fn from_slice(data: &[u8]) -> FlareResult<Self> {
        serde_json::from_slice(data)
            .map_err(|e| FlareError::InvalidMessage(format!("解析创建任务消息失败: {e}")))
    }
}

impl StartTestMessage {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            start: true,
            scripts,
        }
    }
}

impl NodeCompleteMessage {
    pub fn for_node<S: Into<String>>(node_id: S) -> Self {
        Self {
            node_id: Some(node_id.into()),
        }
    }

    /// 宽松解析：空报文或非JSON报文视为不带身份的完成信号
    pub fn from_slice_lenient(data: &[u8]) -> Self {
        serde_json::from_slice(data).unwrap_or_default()
    }
}

impl JobCompleteMessage {
    pub fn new(passed: bool) -> Self {
        Self { done: true, passed }
    }
}

/// 把报文序列化为JSON字节
pub fn encode<T: Serialize>(message: &T) -> FlareResult<Vec<u8>> {
    serde_json::to_vec(message)
        .map_err(|e| FlareError::Serialization(format!("序列化消息失败: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_job_message_parse() {
        let payload = json!({
            "taskId": "abc123",
            "job": {"id": "job1", "userId": "user1", "taskId": "task1", "isRunning": true, "passed": false},
            "task": {
                "id": "abc1", "userId": "user1", "projectId": "project1", "name": "task1",
                "successThreshold": 80,
                "scripts": [{"start": 0, "timeout": 10, "totalSimulators": 5, "target": "ws://localhost", "retryLimit": 0}]
            }
        });
        let message = CreateJobMessage::from_slice(payload.to_string().as_bytes()).unwrap();
        assert_eq!(message.task_id.as_deref(), Some("abc123"));
        assert_eq!(message.job.id, "job1");
        assert_eq!(message.task.scripts.len(), 1);
    }

    #[test]
    fn test_create_job_message_rejects_garbage() {
        let err = CreateJobMessage::from_slice(b"not json").unwrap_err();
        assert!(matches!(err, FlareError::InvalidMessage(_)));
    }

    #[test]
    fn test_node_complete_lenient_parse() {
        assert_eq!(
            NodeCompleteMessage::from_slice_lenient(br#"{"nodeId":"n1"}"#).node_id.as_deref(),
            Some("n1")
        );
        assert_eq!(NodeCompleteMessage::from_slice_lenient(b"").node_id, None);
        assert_eq!(NodeCompleteMessage::from_slice_lenient(b"done").node_id, None);
        assert_eq!(NodeCompleteMessage::from_slice_lenient(b"{}").node_id, None);
    }

    #[test]
    fn test_wire_shapes() {
        let start = encode(&StartTestMessage::new(vec![])).unwrap();
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&start).unwrap(),
            json!({"start": true, "scripts": []})
        );

        let done = encode(&JobCompleteMessage::new(false)).unwrap();
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&done).unwrap(),
            json!({"done": true, "passed": false})
        );
    }
}
