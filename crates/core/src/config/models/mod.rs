pub mod api_observability;
pub mod app_config;
pub mod message_queue;
pub mod orchestration;

pub use api_observability::{ObservabilityConfig, ServerConfig};
pub use app_config::AppConfig;
pub use message_queue::{AmqpConfig, ChannelsConfig};
pub use orchestration::{JobsApiConfig, KubernetesConfig, MonitorConfig, OrchestrationConfig};
