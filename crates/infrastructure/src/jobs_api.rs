use async_trait::async_trait;
use flare_core::{
    config::JobsApiConfig,
    models::{Job, Node},
    FlareError, FlareResult, JobsApi,
};
use serde_json::json;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, error};

/// Jobs API 的 HTTP 客户端
pub struct HttpJobsApi {
    base_url: String,
    base: Url,
    http_client: reqwest::Client,
}

impl HttpJobsApi {
    pub fn new(config: &JobsApiConfig) -> FlareResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| FlareError::JobsApi(format!("创建HTTP客户端失败: {e}")))?;

        let base = Url::parse(config.base())
            .map_err(|e| FlareError::Configuration(format!("Jobs API 地址无效 {}: {e}", config.base())))?;
        if base.cannot_be_a_base() {
            return Err(FlareError::Configuration(format!(
                "Jobs API 地址无效: {}",
                config.base()
            )));
        }

        Ok(Self {
            base_url: config.base().to_string(),
            base,
            http_client,
        })
    }

    /// 在基础地址后追加路径段，每段单独做百分号编码
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check_status(response: reqwest::Response, action: &str) -> FlareResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("{}失败: HTTP {} - {}", action, status, body);
        Err(FlareError::JobsApi(format!("{action}失败: HTTP {status} - {body}")))
    }
}

#[async_trait]
impl JobsApi for HttpJobsApi {
    async fn get_nodes(&self, job_id: &str) -> FlareResult<Vec<Node>> {
        let url = self.endpoint(&["nodes"]);
        let filter = json!({ "where": { "jobId": job_id } }).to_string();

        let response = self
            .http_client
            .get(url)
            .query(&[("filter", filter)])
            .send()
            .await
            .map_err(|e| FlareError::JobsApi(format!("请求节点数据失败: {e}")))?;

        let response = Self::check_status(response, "获取节点数据").await?;
        let nodes: Vec<Node> = response
            .json()
            .await
            .map_err(|e| FlareError::JobsApi(format!("解析节点数据失败: {e}")))?;

        debug!("任务 {} 共获取到 {} 个节点", job_id, nodes.len());
        Ok(nodes)
    }

    async fn update_job(&self, job: &Job) -> FlareResult<()> {
        let url = self.endpoint(&["jobs", &job.id]);

        let response = self
            .http_client
            .patch(url)
            .json(job)
            .send()
            .await
            .map_err(|e| FlareError::JobsApi(format!("更新任务 {} 失败: {e}", job.id)))?;

        Self::check_status(response, "更新任务").await?;
        debug!("任务 {} 已更新", job.id);
        Ok(())
    }
}
