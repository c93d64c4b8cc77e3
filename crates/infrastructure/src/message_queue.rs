use async_trait::async_trait;
use flare_core::{config::AmqpConfig, FlareError, FlareResult, MessageBus, Subscription};
use futures::StreamExt;
use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection, ConnectionProperties,
    Consumer, ExchangeKind,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// RabbitMQ消息总线实现
///
/// 发布共用一个通道；每个订阅独占一个通道，订阅被丢弃时随之释放。
pub struct RabbitMqMessageBus {
    connection: Connection,
    publish_channel: Arc<Mutex<Channel>>,
}

impl RabbitMqMessageBus {
    /// 创建新的RabbitMQ消息总线实例
    pub async fn new(config: &AmqpConfig) -> FlareResult<Self> {
        Self::connect(&config.url(), config.connection_timeout_seconds).await
    }

    /// 使用完整的 AMQP URL 连接
    pub async fn connect(url: &str, timeout_seconds: u64) -> FlareResult<Self> {
        let connect = Connection::connect(url, ConnectionProperties::default());
        let connection = tokio::time::timeout(Duration::from_secs(timeout_seconds), connect)
            .await
            .map_err(|_| FlareError::timeout("连接RabbitMQ", timeout_seconds))?
            .map_err(|e| FlareError::MessageQueue(format!("连接RabbitMQ失败: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| FlareError::MessageQueue(format!("创建通道失败: {e}")))?;

        info!("成功连接到RabbitMQ");

        Ok(Self {
            connection,
            publish_channel: Arc::new(Mutex::new(channel)),
        })
    }

    async fn create_channel(&self) -> FlareResult<Channel> {
        self.connection
            .create_channel()
            .await
            .map_err(|e| FlareError::MessageQueue(format!("创建通道失败: {e}")))
    }

    /// 声明队列
    async fn declare_queue(
        channel: &Channel,
        queue_name: &str,
        options: QueueDeclareOptions,
    ) -> FlareResult<String> {
        let queue = channel
            .queue_declare(queue_name, options, FieldTable::default())
            .await
            .map_err(|e| FlareError::MessageQueue(format!("声明队列 {queue_name} 失败: {e}")))?;

        debug!("队列 {} 声明成功", queue.name().as_str());
        Ok(queue.name().as_str().to_string())
    }

    /// 声明非持久化的 fanout 交换机
    async fn declare_fanout(channel: &Channel, exchange: &str) -> FlareResult<()> {
        channel
            .exchange_declare(
                exchange,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| FlareError::MessageQueue(format!("声明交换机 {exchange} 失败: {e}")))
    }

    /// 创建消费者（自动确认）
    async fn create_consumer(channel: &Channel, queue: &str) -> FlareResult<Consumer> {
        let consumer = channel
            .basic_consume(
                queue,
                "",
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| FlareError::MessageQueue(format!("创建消费者失败: {e}")))?;

        debug!("为队列 {} 创建消费者", queue);
        Ok(consumer)
    }

    fn into_subscription(name: String, channel: Channel, consumer: Consumer) -> Subscription {
        // 通道随流一起存活
        let stream = futures::stream::unfold((consumer, channel), |(mut consumer, channel)| async move {
            let item = consumer.next().await?;
            let item = item
                .map(|delivery| delivery.data)
                .map_err(|e| FlareError::MessageQueue(format!("接收消息失败: {e}")));
            Some((item, (consumer, channel)))
        });

        Subscription::new(name, stream)
    }

    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> FlareResult<()> {
        let channel = self.publish_channel.lock().await;

        if !exchange.is_empty() {
            Self::declare_fanout(&channel, exchange).await?;
        }

        let confirm = channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| FlareError::MessageQueue(format!("发布消息失败: {e}")))?;

        confirm
            .await
            .map_err(|e| FlareError::MessageQueue(format!("消息发布确认失败: {e}")))?;

        Ok(())
    }

    /// 获取连接状态
    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    /// 关闭连接
    pub async fn close(&self) -> FlareResult<()> {
        self.connection
            .close(200, "正常关闭")
            .await
            .map_err(|e| FlareError::MessageQueue(format!("关闭连接失败: {e}")))?;

        info!("RabbitMQ连接已关闭");
        Ok(())
    }
}

#[async_trait]
impl MessageBus for RabbitMqMessageBus {
    async fn subscribe_queue(&self, queue: &str, durable: bool) -> FlareResult<Subscription> {
        let channel = self.create_channel().await?;
        let options = QueueDeclareOptions {
            durable,
            ..Default::default()
        };
        let name = Self::declare_queue(&channel, queue, options).await?;
        let consumer = Self::create_consumer(&channel, &name).await?;

        Ok(Self::into_subscription(name, channel, consumer))
    }

    /// 使用临时通道删除，删除失败导致的通道关闭不影响发布通道
    async fn delete_queue(&self, queue: &str) -> FlareResult<()> {
        let channel = self.create_channel().await?;
        let purged = channel
            .queue_delete(queue, QueueDeleteOptions::default())
            .await
            .map_err(|e| FlareError::MessageQueue(format!("删除队列 {queue} 失败: {e}")))?;
        let _ = channel.close(200, "OK").await;

        debug!("队列 {} 已删除 (丢弃 {} 条消息)", queue, purged);
        Ok(())
    }

    /// 发布消息到指定队列
    ///
    /// 不在这里声明队列：与已存在队列的参数不一致时服务端会关闭通道。
    async fn publish_to_queue(&self, queue: &str, payload: &[u8]) -> FlareResult<()> {
        self.publish("", queue, payload).await?;
        debug!("消息已发布到队列: {}", queue);
        Ok(())
    }

    async fn publish_fanout(&self, exchange: &str, payload: &[u8]) -> FlareResult<()> {
        self.publish(exchange, "", payload).await?;
        debug!("消息已广播到交换机: {}", exchange);
        Ok(())
    }

    async fn subscribe_fanout(&self, exchange: &str) -> FlareResult<Subscription> {
        let channel = self.create_channel().await?;
        Self::declare_fanout(&channel, exchange).await?;

        let options = QueueDeclareOptions {
            exclusive: true,
            auto_delete: true,
            ..Default::default()
        };
        let queue = Self::declare_queue(&channel, "", options).await?;

        channel
            .queue_bind(
                &queue,
                exchange,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                FlareError::MessageQueue(format!("绑定队列 {queue} 到交换机 {exchange} 失败: {e}"))
            })?;

        let consumer = Self::create_consumer(&channel, &queue).await?;
        Ok(Self::into_subscription(exchange.to_string(), channel, consumer))
    }
}
