use async_trait::async_trait;
use flare_core::{FlareError, FlareResult, MessageBus, Subscription};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// 内存消息总线实现
///
/// 使用 Tokio channels 模拟 RabbitMQ 的两种用法：具名队列（多个消费者竞争消费，
/// 没有消费者时消息会缓存）和 fanout 交换机（每个订阅者一份拷贝，没有订阅者时丢弃）。
/// 适用于嵌入式运行和测试。
#[derive(Debug, Clone)]
pub struct InMemoryMessageBus {
    /// 队列存储：队列名 -> 通道
    queues: Arc<RwLock<HashMap<String, QueueChannels>>>,
    /// 交换机存储：交换机名 -> 广播发送端
    exchanges: Arc<RwLock<HashMap<String, ExchangeChannel>>>,
    /// 每个队列累计发布的消息数，删除队列不清零
    queue_published: Arc<RwLock<HashMap<String, u64>>>,
    broadcast_capacity: usize,
}

#[derive(Debug)]
struct QueueChannels {
    sender: mpsc::UnboundedSender<Vec<u8>>,
    /// 共享接收端，多个消费者轮流取消息
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
    durable: bool,
}

#[derive(Debug)]
struct ExchangeChannel {
    sender: broadcast::Sender<Vec<u8>>,
    published: Arc<AtomicU64>,
}

impl InMemoryMessageBus {
    /// 创建新的内存消息总线实例
    pub fn new() -> Self {
        Self::with_broadcast_capacity(1024)
    }

    pub fn with_broadcast_capacity(broadcast_capacity: usize) -> Self {
        info!(
            "Creating in-memory message bus (broadcast capacity: {})",
            broadcast_capacity
        );
        Self {
            queues: Arc::new(RwLock::new(HashMap::new())),
            exchanges: Arc::new(RwLock::new(HashMap::new())),
            queue_published: Arc::new(RwLock::new(HashMap::new())),
            broadcast_capacity,
        }
    }

    /// 获取或创建队列通道
    async fn get_or_create_queue(
        &self,
        queue_name: &str,
        durable: bool,
    ) -> (
        mpsc::UnboundedSender<Vec<u8>>,
        Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
    ) {
        let mut queues = self.queues.write().await;
        let channels = queues.entry(queue_name.to_string()).or_insert_with(|| {
            debug!("Creating new queue: {} (durable: {})", queue_name, durable);
            let (sender, receiver) = mpsc::unbounded_channel();
            QueueChannels {
                sender,
                receiver: Arc::new(Mutex::new(receiver)),
                durable,
            }
        });

        (channels.sender.clone(), channels.receiver.clone())
    }

    /// 获取或创建 fanout 交换机
    async fn get_or_create_exchange(
        &self,
        exchange: &str,
    ) -> (broadcast::Sender<Vec<u8>>, Arc<AtomicU64>) {
        let mut exchanges = self.exchanges.write().await;
        let channel = exchanges.entry(exchange.to_string()).or_insert_with(|| {
            debug!("Creating new fanout exchange: {}", exchange);
            let (sender, _) = broadcast::channel(self.broadcast_capacity);
            ExchangeChannel {
                sender,
                published: Arc::new(AtomicU64::new(0)),
            }
        });

        (channel.sender.clone(), channel.published.clone())
    }

    /// 已发布到某个队列的消息总数
    pub async fn published_to_queue(&self, queue: &str) -> u64 {
        self.queue_published
            .read()
            .await
            .get(queue)
            .copied()
            .unwrap_or(0)
    }

    /// 已广播到某个交换机的消息总数
    pub async fn published_to_exchange(&self, exchange: &str) -> u64 {
        self.exchanges
            .read()
            .await
            .get(exchange)
            .map(|e| e.published.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub async fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.queues.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn is_durable(&self, queue: &str) -> Option<bool> {
        self.queues.read().await.get(queue).map(|q| q.durable)
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn subscribe_queue(&self, queue: &str, durable: bool) -> FlareResult<Subscription> {
        let (_, receiver) = self.get_or_create_queue(queue, durable).await;

        let stream = futures::stream::unfold(receiver, |receiver| async move {
            let next = receiver.lock().await.recv().await;
            next.map(|payload| (Ok(payload), receiver))
        });

        debug!("Subscribed to queue '{}'", queue);
        Ok(Subscription::new(queue, stream))
    }

    async fn delete_queue(&self, queue: &str) -> FlareResult<()> {
        if self.queues.write().await.remove(queue).is_some() {
            debug!("Deleted queue '{}'", queue);
        }
        Ok(())
    }

    async fn publish_to_queue(&self, queue: &str, payload: &[u8]) -> FlareResult<()> {
        // AMQP 默认交换机会丢弃发往不存在队列的消息；这里直接创建队列缓存下来
        let (sender, _) = self.get_or_create_queue(queue, false).await;

        sender.send(payload.to_vec()).map_err(|e| {
            FlareError::MessageQueue(format!("发布消息到队列 {queue} 失败: {e}"))
        })?;
        *self
            .queue_published
            .write()
            .await
            .entry(queue.to_string())
            .or_insert(0) += 1;

        debug!("消息已发布到队列: {}", queue);
        Ok(())
    }

    async fn publish_fanout(&self, exchange: &str, payload: &[u8]) -> FlareResult<()> {
        let (sender, published) = self.get_or_create_exchange(exchange).await;
        published.fetch_add(1, Ordering::Relaxed);

        match sender.send(payload.to_vec()) {
            Ok(receivers) => debug!("消息已广播到交换机 {} ({} 个订阅者)", exchange, receivers),
            Err(_) => debug!("交换机 {} 没有订阅者，消息被丢弃", exchange),
        }

        Ok(())
    }

    async fn subscribe_fanout(&self, exchange: &str) -> FlareResult<Subscription> {
        let (sender, _) = self.get_or_create_exchange(exchange).await;
        let receiver = sender.subscribe();
        let name = exchange.to_string();

        let stream = futures::stream::unfold(
            (receiver, name.clone()),
            |(mut receiver, name)| async move {
                loop {
                    match receiver.recv().await {
                        Ok(payload) => return Some((Ok(payload), (receiver, name))),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("订阅 {} 落后，丢失 {} 条消息", name, skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            },
        );

        Ok(Subscription::new(name, stream))
    }
}
