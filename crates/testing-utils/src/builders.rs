//! Test data builders for creating test entities
//!
//! 默认值贴近真实请求，按需覆盖个别字段。

use chrono::{SecondsFormat, Utc};
use flare_core::models::{Job, Node, Script, SocketPayload, Task};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

static NODE_SEQ: AtomicUsize = AtomicUsize::new(1);

/// Builder for creating test Job entities
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self {
            job: Job {
                id: "job1".to_string(),
                created_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
                user_id: "user1".to_string(),
                task_id: "task1".to_string(),
                is_running: true,
                passed: false,
                extra: Map::new(),
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.job.id = id.to_string();
        self
    }

    pub fn with_task_id(mut self, task_id: &str) -> Self {
        self.job.task_id = task_id.to_string();
        self
    }

    /// 外部服务追加的字段，回写时应原样保留
    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.job.extra.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Task entities
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self {
            task: Task {
                id: "task1".to_string(),
                project_id: "project1".to_string(),
                user_id: "user1".to_string(),
                name: "load test".to_string(),
                scripts: Vec::new(),
                cf_api: None,
                cf_user: None,
                cf_pass: None,
                cf_org: None,
                cf_space: None,
                cf_apps: None,
                success_threshold: 80.0,
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.task.id = id.to_string();
        self
    }

    pub fn with_script(mut self, script: Script) -> Self {
        self.task.scripts.push(script);
        self
    }

    /// 每个元素生成一个只设置了模拟用户数的脚本
    pub fn with_simulators(mut self, simulators: &[i64]) -> Self {
        for &total in simulators {
            self.task.scripts.push(ScriptBuilder::new(total).build());
        }
        self
    }

    pub fn with_success_threshold(mut self, threshold: f64) -> Self {
        self.task.success_threshold = threshold;
        self
    }

    pub fn with_cloud_credentials(mut self, api: &str, user: &str, pass: &str) -> Self {
        self.task.cf_api = Some(api.to_string());
        self.task.cf_user = Some(user.to_string());
        self.task.cf_pass = Some(pass.to_string());
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Script entities
pub struct ScriptBuilder {
    script: Script,
}

impl ScriptBuilder {
    pub fn new(total_simulators: i64) -> Self {
        Self {
            script: Script {
                start: 0.0,
                timeout: 60.0,
                total_simulators,
                target: "ws://localhost:8080".to_string(),
                retry_limit: 0,
                payloads: None,
                extra: Map::new(),
            },
        }
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.script.target = target.to_string();
        self
    }

    pub fn with_timing(mut self, start: f64, timeout: f64) -> Self {
        self.script.start = start;
        self.script.timeout = timeout;
        self
    }

    pub fn with_payload(mut self, start: f64, payload: Value) -> Self {
        self.script
            .payloads
            .get_or_insert_with(Vec::new)
            .push(SocketPayload { start, payload });
        self
    }

    pub fn build(self) -> Script {
        self.script
    }
}

/// Builder for creating Node records as reported by workers
pub struct NodeBuilder {
    node: Node,
}

impl NodeBuilder {
    pub fn new(job_id: &str) -> Self {
        let seq = NODE_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            node: Node {
                id: format!("reported-node-{seq}"),
                created_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
                job_id: job_id.to_string(),
                name: None,
                running: false,
                total_successful_connections: 0,
                total_failed_connections: 0,
                total_dropped_connections: 0,
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.node.id = id.to_string();
        self
    }

    pub fn successful(mut self, connections: i64) -> Self {
        self.node.total_successful_connections = connections;
        self
    }

    pub fn failed(mut self, connections: i64) -> Self {
        self.node.total_failed_connections = connections;
        self
    }

    pub fn dropped(mut self, connections: i64) -> Self {
        self.node.total_dropped_connections = connections;
        self
    }

    pub fn build(self) -> Node {
        self.node
    }
}

/// 一组只设置了成功连接数的节点
pub fn nodes_with_successes(job_id: &str, successes: &[i64]) -> Vec<Node> {
    successes
        .iter()
        .map(|&n| NodeBuilder::new(job_id).successful(n).build())
        .collect()
}
