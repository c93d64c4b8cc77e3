//! 模拟Worker集群
//!
//! 每个"Pod"在内存消息总线上按真实Worker的协议行事：订阅开始广播，
//! 发出就绪信号，收到开始后发出完成信号。

use async_trait::async_trait;
use flare_core::{
    models::{encode, MonitorSpec, NodeCompleteMessage, StartTestMessage, TestClientSpec},
    ChannelNames, FlareError, FlareResult, MessageBus, WorkerLauncher,
};
use flare_infrastructure::InMemoryMessageBus;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// 模拟Worker等待开始广播的最长时间
const START_WAIT: Duration = Duration::from_secs(30);

/// 完成信号的发送方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStyle {
    /// `{"nodeId": "<id>"}`
    WithNodeId,
    /// 每个节点发送两次带ID的完成信号
    Duplicated,
    /// 不带ID的旧版报文
    Anonymous,
}

/// 测试客户端生命周期中的关键事件，按发生顺序记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetEvent {
    Launched { script_index: usize },
    Ready { script_index: usize },
}

#[derive(Debug, Default)]
struct FleetState {
    test_clients: Vec<TestClientSpec>,
    events: Vec<FleetEvent>,
    monitors: Vec<MonitorSpec>,
    start_messages: Vec<(String, StartTestMessage)>,
}

/// 按协议行事的模拟Worker集群，实现 [`WorkerLauncher`]
#[derive(Clone)]
pub struct SimulatedWorkerFleet {
    bus: InMemoryMessageBus,
    channels: ChannelNames,
    ready_delay: Duration,
    completion_style: CompletionStyle,
    fail_at_launch: Option<usize>,
    never_ready: Arc<Mutex<HashSet<usize>>>,
    silent: Arc<Mutex<HashSet<usize>>>,
    monitor_never_ready: bool,
    launched: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    state: Arc<Mutex<FleetState>>,
}

impl SimulatedWorkerFleet {
    pub fn new(bus: InMemoryMessageBus, channels: ChannelNames) -> Self {
        Self {
            bus,
            channels,
            ready_delay: Duration::from_millis(5),
            completion_style: CompletionStyle::WithNodeId,
            fail_at_launch: None,
            never_ready: Arc::new(Mutex::new(HashSet::new())),
            silent: Arc::new(Mutex::new(HashSet::new())),
            monitor_never_ready: false,
            launched: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            state: Arc::new(Mutex::new(FleetState::default())),
        }
    }

    /// 从创建到发出就绪信号的耗时
    pub fn with_ready_delay(mut self, delay: Duration) -> Self {
        self.ready_delay = delay;
        self
    }

    pub fn with_completion_style(mut self, style: CompletionStyle) -> Self {
        self.completion_style = style;
        self
    }

    /// 第 `index` 个（从0开始）测试客户端的创建请求失败
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at_launch = Some(index);
        self
    }

    /// 第 `index` 个测试客户端创建成功但永远不发就绪信号
    pub fn never_ready_at(self, index: usize) -> Self {
        self.never_ready.lock().unwrap().insert(index);
        self
    }

    /// 第 `index` 个测试客户端收到开始后不发完成信号
    pub fn silent_at(self, index: usize) -> Self {
        self.silent.lock().unwrap().insert(index);
        self
    }

    pub fn with_silent_monitor(mut self) -> Self {
        self.monitor_never_ready = true;
        self
    }

    pub fn test_clients(&self) -> Vec<TestClientSpec> {
        self.state.lock().unwrap().test_clients.clone()
    }

    pub fn monitors(&self) -> Vec<MonitorSpec> {
        self.state.lock().unwrap().monitors.clone()
    }

    /// 各节点收到的开始广播，(节点ID, 报文)
    pub fn start_messages(&self) -> Vec<(String, StartTestMessage)> {
        self.state.lock().unwrap().start_messages.clone()
    }

    pub fn events(&self) -> Vec<FleetEvent> {
        self.state.lock().unwrap().events.clone()
    }

    /// 同时处于"已创建未就绪"状态的测试客户端数量最大值
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn run_test_client(self, spec: TestClientSpec, index: usize) {
        let never_ready = self.never_ready.lock().unwrap().contains(&index);
        let silent = self.silent.lock().unwrap().contains(&index);

        let start_exchange = self.channels.start(&spec.job_id);
        let mut start = match self.bus.subscribe_fanout(&start_exchange).await {
            Ok(subscription) => subscription,
            Err(_) => return,
        };

        tokio::time::sleep(self.ready_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if never_ready {
            debug!("模拟节点 {} 不发送就绪信号", spec.node_id);
            return;
        }

        // 先记录再发信号，编排服务看到的就绪一定排在事件之后
        self.state.lock().unwrap().events.push(FleetEvent::Ready {
            script_index: spec.script_index,
        });
        let ready_queue = self.channels.node_ready(&spec.node_id);
        if self.bus.publish_to_queue(&ready_queue, b"ready").await.is_err() {
            return;
        }

        let payload = match tokio::time::timeout(START_WAIT, start.next_message()).await {
            Ok(Some(Ok(payload))) => payload,
            _ => return,
        };
        if let Ok(message) = serde_json::from_slice::<StartTestMessage>(&payload) {
            self.state
                .lock()
                .unwrap()
                .start_messages
                .push((spec.node_id.clone(), message));
        }

        if silent {
            return;
        }

        let complete_queue = self.channels.node_complete(&spec.job_id);
        let (message, times) = match self.completion_style {
            CompletionStyle::WithNodeId => (NodeCompleteMessage::for_node(&spec.node_id), 1),
            CompletionStyle::Duplicated => (NodeCompleteMessage::for_node(&spec.node_id), 2),
            CompletionStyle::Anonymous => (NodeCompleteMessage::default(), 1),
        };
        let Ok(body) = encode(&message) else { return };
        for _ in 0..times {
            let _ = self.bus.publish_to_queue(&complete_queue, &body).await;
        }
    }

    async fn run_monitor(self, spec: MonitorSpec) {
        tokio::time::sleep(self.ready_delay).await;
        if self.monitor_never_ready {
            return;
        }
        let ready_queue = self.channels.monitor_ready(&spec.monitor_id);
        let _ = self.bus.publish_to_queue(&ready_queue, b"ready").await;
    }
}

#[async_trait]
impl WorkerLauncher for SimulatedWorkerFleet {
    async fn launch_test_client(&self, spec: &TestClientSpec) -> FlareResult<()> {
        let index = self.launched.fetch_add(1, Ordering::SeqCst);
        if self.fail_at_launch == Some(index) {
            return Err(FlareError::provisioning(&spec.node_id, "simulated pod rejection"));
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        {
            let mut state = self.state.lock().unwrap();
            state.test_clients.push(spec.clone());
            state.events.push(FleetEvent::Launched {
                script_index: spec.script_index,
            });
        }

        tokio::spawn(self.clone().run_test_client(spec.clone(), index));
        Ok(())
    }

    async fn launch_monitor(&self, spec: &MonitorSpec) -> FlareResult<()> {
        self.state.lock().unwrap().monitors.push(spec.clone());
        tokio::spawn(self.clone().run_monitor(spec.clone()));
        Ok(())
    }
}
