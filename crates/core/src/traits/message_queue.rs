use std::fmt;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

use crate::FlareResult;

/// 消息中间件抽象接口
///
/// 队列语义对应 AMQP 默认交换机上的具名队列，fanout 语义对应非持久化的
/// fanout 交换机，每个订阅者拿到一份拷贝。
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// 声明队列并开始消费
    async fn subscribe_queue(&self, queue: &str, durable: bool) -> FlareResult<Subscription>;

    /// 删除队列及其中未消费的消息，队列不存在时视为成功
    async fn delete_queue(&self, queue: &str) -> FlareResult<()>;

    /// 发布消息到指定队列
    async fn publish_to_queue(&self, queue: &str, payload: &[u8]) -> FlareResult<()>;

    /// 声明 fanout 交换机并广播消息，没有订阅者时消息被丢弃
    async fn publish_fanout(&self, exchange: &str, payload: &[u8]) -> FlareResult<()>;

    /// 绑定一个独占队列到 fanout 交换机并开始消费
    async fn subscribe_fanout(&self, exchange: &str) -> FlareResult<Subscription>;
}

/// 一个正在消费的通道，按到达顺序产出消息体
pub struct Subscription {
    name: String,
    stream: BoxStream<'static, FlareResult<Vec<u8>>>,
}

impl Subscription {
    pub fn new<S>(name: impl Into<String>, stream: S) -> Self
    where
        S: futures::Stream<Item = FlareResult<Vec<u8>>> + Send + 'static,
    {
        Self {
            name: name.into(),
            stream: stream.boxed(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 下一条消息；通道关闭时返回 None
    pub async fn next_message(&mut self) -> Option<FlareResult<Vec<u8>>> {
        self.stream.next().await
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
