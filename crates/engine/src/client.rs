//! 원격 취약점 API 클라이언트
//!
//! [`AdvisoryClient`]는 배치 하나를 원격 서비스에 조회하는 확장 포인트이고,
//! [`HttpAdvisoryClient`]는 `reqwest` 기반 기본 구현입니다.
//!
//! # 요청 형식
//!
//! ```text
//! POST <server_url>/component-analyses?utm_content=<manifest hash>[&utm_source=..][&user_key=..]
//! Content-Type: application/json
//! Authorization: Bearer <api_token>
//! request_id: <cycle correlation id>
//! x-3scale-account-secret: <account_secret>
//! uuid: <uuid>                       (선택)
//!
//! {"ecosystem": "npm", "package_versions": [{"package": "..", "version": ".."}]}
//! ```
//!
//! 응답은 패키지별 레코드의 JSON 배열입니다. 2xx 이외의 응답, 전송 실패,
//! 디코딩 실패는 모두 [`FetchError`]로 반환되며 재시도하지 않습니다.

use std::future::Future;

use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};

use vulnlens_core::error::FetchError;

use crate::batch::RequestBatch;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::record::VulnerabilityRecord;

/// 에러 메시지에 포함할 응답 본문 최대 길이
const MAX_ERROR_BODY_CHARS: usize = 512;

/// 사이클 단위 요청 컨텍스트
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// 매니페스트 경로의 SHA-256 (hex)
    pub manifest_hash: String,
    /// 사이클 상관 ID (UUID v4)
    pub request_id: String,
}

impl RequestContext {
    /// 매니페스트 URI로 새 컨텍스트를 생성합니다 (상관 ID는 새로 발급).
    pub fn new(manifest_uri: &str) -> Self {
        Self {
            manifest_hash: manifest_hash(manifest_uri),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// 매니페스트 경로의 안정적인 해시를 계산합니다.
pub fn manifest_hash(path: &str) -> String {
    format!("{:x}", Sha256::digest(path.as_bytes()))
}

/// 배치 조회 trait
pub trait AdvisoryClient: Send + Sync + 'static {
    /// 배치 하나를 조회합니다.
    fn fetch(
        &self,
        batch: &RequestBatch,
        ctx: &RequestContext,
    ) -> impl Future<Output = Result<Vec<VulnerabilityRecord>, FetchError>> + Send;
}

/// `reqwest` 기반 HTTP 클라이언트
pub struct HttpAdvisoryClient {
    http: reqwest::Client,
    endpoint: String,
    api_token: String,
    account_secret: String,
    user_key: Option<String>,
    uuid: Option<String>,
    utm_source: Option<String>,
}

impl HttpAdvisoryClient {
    /// 엔진 설정으로 클라이언트를 생성합니다.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EngineError::Client(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/component-analyses",
                config.server_url.trim_end_matches('/')
            ),
            api_token: config.api_token.clone(),
            account_secret: config.account_secret.clone(),
            user_key: config.user_key.clone(),
            uuid: config.uuid.clone(),
            utm_source: config.utm_source.clone(),
        })
    }

    /// 요청 대상 URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl AdvisoryClient for HttpAdvisoryClient {
    async fn fetch(
        &self,
        batch: &RequestBatch,
        ctx: &RequestContext,
    ) -> Result<Vec<VulnerabilityRecord>, FetchError> {
        let mut query: Vec<(&str, &str)> = vec![("utm_content", ctx.manifest_hash.as_str())];
        if let Some(source) = &self.utm_source {
            query.push(("utm_source", source.as_str()));
        }
        if let Some(key) = &self.user_key {
            query.push(("user_key", key.as_str()));
        }

        let mut request = self
            .http
            .post(&self.endpoint)
            .query(&query)
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(&self.api_token)
            .header("request_id", &ctx.request_id)
            .header("x-3scale-account-secret", &self.account_secret)
            .json(&batch.to_request_body());
        if let Some(uuid) = &self.uuid {
            request = request.header("uuid", uuid);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
