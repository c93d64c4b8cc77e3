use async_trait::async_trait;

use crate::{
    models::{MonitorSpec, TestClientSpec},
    FlareResult,
};

/// 远端计算单元（Pod）创建接口
///
/// 调用返回即表示创建请求已被接受，不代表Worker已就绪。
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    /// 创建一个测试客户端
    async fn launch_test_client(&self, spec: &TestClientSpec) -> FlareResult<()>;

    /// 创建监控Worker
    async fn launch_monitor(&self, spec: &MonitorSpec) -> FlareResult<()>;
}
