// ==========================================
// 批量导入管道 - 导入端点
// ==========================================
// 职责: 单批次提交到外部导入端点，返回计数与行级错误
// 协议: POST <endpoint_url>/<entity>s/import，JSON {entity, records}
// 说明: 行错误可能给出批内 0 起 index 或 1 起 row，由编排器换算为源文件行号
// ==========================================

use crate::config::ImportConfig;
use crate::domain::{CanonicalRecord, EntityKind, ImportBatch};
use crate::importer::error::{ImportError, ImportResult, SubmissionError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

// ==========================================
// EndpointResponse - 端点响应
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointResponse {
    #[serde(default)]
    pub imported: usize,
    #[serde(default)]
    pub updated: usize,
    #[serde(default)]
    pub skipped: usize,
    #[serde(default)]
    pub errors: Vec<EndpointRowError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRowError {
    #[serde(default)]
    pub index: Option<usize>, // 批内 0 起
    #[serde(default)]
    pub row: Option<usize>,   // 批内 1 起
    #[serde(default, alias = "error")]
    pub message: String,
}

impl EndpointRowError {
    /// 统一为批内 0 起下标
    pub fn batch_index(&self) -> Option<usize> {
        self.index
            .or_else(|| self.row.map(|r| r.saturating_sub(1)))
    }
}

// ==========================================
// ImportEndpoint Trait
// ==========================================
// 用途: 外部导入端点接口
// 实现者: HttpImportEndpoint（测试中为模拟端点）
#[async_trait]
pub trait ImportEndpoint: Send + Sync {
    /// 提交一个批次
    ///
    /// # 返回
    /// - Ok(EndpointResponse): 端点已处理（可能包含行级错误）
    /// - Err(SubmissionError): 整批失败（传输/服务端/响应解析）
    async fn submit(
        &self,
        kind: EntityKind,
        batch: &ImportBatch,
    ) -> Result<EndpointResponse, SubmissionError>;
}

#[derive(Debug, Serialize)]
struct ImportPayload<'a> {
    entity: &'a str,
    records: &'a [CanonicalRecord],
}

// ==========================================
// HttpImportEndpoint - HTTP 实现
// ==========================================
#[derive(Debug, Clone)]
pub struct HttpImportEndpoint {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpImportEndpoint {
    pub fn new(base_url: impl Into<String>, token: Option<String>, config: &ImportConfig) -> ImportResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("field-service-import/{}", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ImportError::Other(anyhow::anyhow!("HTTP 客户端创建失败: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// 从配置构建，endpoint_url 必填
    pub fn from_config(config: &ImportConfig) -> ImportResult<Self> {
        let url = config.endpoint_url.clone().ok_or_else(|| ImportError::Config {
            key: "endpoint_url".to_string(),
            message: "未配置导入端点地址".to_string(),
        })?;
        Self::new(url, config.api_token.clone(), config)
    }

    pub fn url_for(&self, kind: EntityKind) -> String {
        format!("{}/{}s/import", self.base_url, kind.as_str())
    }
}

#[async_trait]
impl ImportEndpoint for HttpImportEndpoint {
    #[instrument(skip(self, batch), fields(batch_index = batch.index, size = batch.len()))]
    async fn submit(
        &self,
        kind: EntityKind,
        batch: &ImportBatch,
    ) -> Result<EndpointResponse, SubmissionError> {
        let payload = ImportPayload {
            entity: kind.as_str(),
            records: &batch.records,
        };

        let mut request = self.http.post(self.url_for(kind)).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SubmissionError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;
        let parsed = decode_response(&body)?;
        debug!(
            imported = parsed.imported,
            updated = parsed.updated,
            skipped = parsed.skipped,
            errors = parsed.errors.len(),
            "批次提交完成"
        );
        Ok(parsed)
    }
}

/// 解析端点响应体
pub fn decode_response(body: &str) -> Result<EndpointResponse, SubmissionError> {
    serde_json::from_str(body).map_err(|e| SubmissionError::Decode(e.to_string()))
}
