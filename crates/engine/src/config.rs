//! 엔진 설정
//!
//! [`EngineConfig`]는 core의 [`VulnlensConfig`](vulnlens_core::config::VulnlensConfig)를
//! 평탄화하고 엔진 고유 설정(매니페스트 크기 제한, 알림 채널 용량)을 추가합니다.
//!
//! # 사용 예시
//!
//! ```
//! use vulnlens_engine::EngineConfig;
//!
//! // 기본값으로 생성
//! let config = EngineConfig::default();
//! config.validate().unwrap();
//!
//! // 빌더로 생성
//! use vulnlens_engine::EngineConfigBuilder;
//!
//! let config = EngineConfigBuilder::new()
//!     .server_url("http://127.0.0.1:9000/api/v2")
//!     .batch_size(5)
//!     .build()
//!     .unwrap();
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use vulnlens_core::config::VulnlensConfig;

use crate::batch::MAX_BATCH_ENTRIES;
use crate::error::EngineError;

/// 분석 엔진 설정
///
/// # 필드
///
/// - **server_url / api_token / account_secret / user_key / uuid / utm_source**: 원격 API 접속 정보
/// - **timeout_secs**: 요청 타임아웃
/// - **debounce_ms**: 편집 후 분석까지 대기 시간
/// - **batch_size**: 요청 1회당 최대 패키지 수
/// - **max_concurrent_batches**: 동시 진행 배치 요청 상한
/// - **cache_max_items / cache_max_age_secs**: 생태계별 캐시 한도
/// - **max_manifest_size**: 분석할 매니페스트 최대 크기 (바이트)
/// - **notification_channel_capacity**: 알림 채널 용량
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// API 서버 주소
    pub server_url: String,
    /// Bearer 토큰
    pub api_token: String,
    /// 계정 시크릿 헤더 값
    pub account_secret: String,
    /// `user_key` 쿼리 파라미터
    pub user_key: Option<String>,
    /// `uuid` 헤더
    pub uuid: Option<String>,
    /// `utm_source` 쿼리 파라미터
    pub utm_source: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 디바운스 대기 시간 (밀리초)
    pub debounce_ms: u64,
    /// 배치 크기
    pub batch_size: usize,
    /// 동시 배치 요청 상한
    pub max_concurrent_batches: usize,
    /// 생태계별 캐시 최대 엔트리 수
    pub cache_max_items: usize,
    /// 캐시 엔트리 유효 기간 (초)
    pub cache_max_age_secs: u64,

    // --- 모듈 고유 확장 ---
    /// 매니페스트 최대 크기 (바이트)
    pub max_manifest_size: usize,
    /// 알림 채널 용량
    pub notification_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_core(&VulnlensConfig::default())
    }
}

/// 설정 상한값 상수
const MAX_CONCURRENT_BATCHES: usize = 64;
const MAX_MANIFEST_SIZE: usize = 50 * 1024 * 1024; // 50 MB
const DEFAULT_MAX_MANIFEST_SIZE: usize = 5 * 1024 * 1024; // 5 MB
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

impl EngineConfig {
    /// core의 `VulnlensConfig`에서 엔진 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값을 사용합니다.
    pub fn from_core(core: &VulnlensConfig) -> Self {
        Self {
            server_url: core.api.server_url.clone(),
            api_token: core.api.api_token.clone(),
            account_secret: core.api.account_secret.clone(),
            user_key: core.api.user_key.clone(),
            uuid: core.api.uuid.clone(),
            utm_source: core.api.utm_source.clone(),
            timeout_secs: core.api.timeout_secs,
            debounce_ms: core.analysis.debounce_ms,
            batch_size: core.analysis.batch_size,
            max_concurrent_batches: core.analysis.max_concurrent_batches,
            cache_max_items: core.cache.max_items,
            cache_max_age_secs: core.cache.max_age_secs,
            max_manifest_size: DEFAULT_MAX_MANIFEST_SIZE,
            notification_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// 디바운스 대기 시간
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// 요청 타임아웃
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 캐시 엔트리 유효 기간
    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age_secs)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `server_url`: http:// 또는 https://로 시작
    /// - `timeout_secs`: 0보다 커야 함
    /// - `batch_size`: 1-10 (원격 API 요청 상한)
    /// - `max_concurrent_batches`: 1-64
    /// - `cache_max_items`, `cache_max_age_secs`: 0보다 커야 함
    /// - `max_manifest_size`: 1-52428800 (50MB)
    /// - `notification_channel_capacity`: 0보다 커야 함
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(config_err(
                "server_url",
                "must start with http:// or https://",
            ));
        }

        if self.timeout_secs == 0 {
            return Err(config_err("timeout_secs", "must be greater than 0"));
        }

        if self.batch_size == 0 || self.batch_size > MAX_BATCH_ENTRIES {
            return Err(config_err(
                "batch_size",
                &format!("must be 1-{MAX_BATCH_ENTRIES}"),
            ));
        }

        if self.max_concurrent_batches == 0 || self.max_concurrent_batches > MAX_CONCURRENT_BATCHES
        {
            return Err(config_err(
                "max_concurrent_batches",
                &format!("must be 1-{MAX_CONCURRENT_BATCHES}"),
            ));
        }

        if self.cache_max_items == 0 {
            return Err(config_err("cache_max_items", "must be greater than 0"));
        }

        if self.cache_max_age_secs == 0 {
            return Err(config_err("cache_max_age_secs", "must be greater than 0"));
        }

        if self.max_manifest_size == 0 || self.max_manifest_size > MAX_MANIFEST_SIZE {
            return Err(config_err(
                "max_manifest_size",
                &format!("must be 1-{MAX_MANIFEST_SIZE}"),
            ));
        }

        if self.notification_channel_capacity == 0 {
            return Err(config_err(
                "notification_channel_capacity",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn config_err(field: &str, reason: &str) -> EngineError {
    EngineError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

/// [`EngineConfig`] 빌더
///
/// 빌드 시 유효성 검증을 수행합니다.
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// API 서버 주소를 설정합니다.
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into();
        self
    }

    /// Bearer 토큰을 설정합니다.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config.api_token = token.into();
        self
    }

    /// 계정 시크릿을 설정합니다.
    pub fn account_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.account_secret = secret.into();
        self
    }

    /// `user_key` 쿼리 파라미터를 설정합니다.
    pub fn user_key(mut self, key: impl Into<String>) -> Self {
        self.config.user_key = Some(key.into());
        self
    }

    /// `uuid` 헤더를 설정합니다.
    pub fn uuid(mut self, uuid: impl Into<String>) -> Self {
        self.config.uuid = Some(uuid.into());
        self
    }

    /// `utm_source` 쿼리 파라미터를 설정합니다.
    pub fn utm_source(mut self, source: impl Into<String>) -> Self {
        self.config.utm_source = Some(source.into());
        self
    }

    /// 요청 타임아웃(초)을 설정합니다.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// 디바운스 대기 시간(밀리초)을 설정합니다.
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.debounce_ms = ms;
        self
    }

    /// 배치 크기를 설정합니다.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// 동시 배치 요청 상한을 설정합니다.
    pub fn max_concurrent_batches(mut self, max: usize) -> Self {
        self.config.max_concurrent_batches = max;
        self
    }

    /// 캐시 최대 엔트리 수를 설정합니다.
    pub fn cache_max_items(mut self, max: usize) -> Self {
        self.config.cache_max_items = max;
        self
    }

    /// 캐시 유효 기간(초)을 설정합니다.
    pub fn cache_max_age_secs(mut self, secs: u64) -> Self {
        self.config.cache_max_age_secs = secs;
        self
    }

    /// 매니페스트 최대 크기(바이트)를 설정합니다.
    pub fn max_manifest_size(mut self, size: usize) -> Self {
        self.config.max_manifest_size = size;
        self
    }

    /// 알림 채널 용량을 설정합니다.
    pub fn notification_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.notification_channel_capacity = capacity;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `EngineError::Config` 반환
    pub fn build(self) -> Result<EngineConfig, EngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_concurrent_batches, 4);
        assert_eq!(config.debounce(), Duration::from_millis(500));
    }

    #[test]
    fn from_core_preserves_values() {
        let mut core = VulnlensConfig::default();
        core.api.server_url = "https://advisories.internal/api/v2".to_owned();
        core.api.api_token = "token".to_owned();
        core.api.utm_source = Some("vscode".to_owned());
        core.analysis.batch_size = 7;
        core.cache.max_items = 42;

        let config = EngineConfig::from_core(&core);
        assert_eq!(config.server_url, "https://advisories.internal/api/v2");
        assert_eq!(config.api_token, "token");
        assert_eq!(config.utm_source.as_deref(), Some("vscode"));
        assert_eq!(config.batch_size, 7);
        assert_eq!(config.cache_max_items, 42);
        // extended fields use defaults
        assert_eq!(config.max_manifest_size, 5 * 1024 * 1024);
        assert_eq!(config.notification_channel_capacity, 256);
    }

    #[test]
    fn validate_rejects_non_http_url() {
        let config = EngineConfig {
            server_url: "ftp://example".to_owned(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let config = EngineConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_batch_size_above_api_limit() {
        let config = EngineConfig {
            batch_size: 11,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            batch_size: 10,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_too_many_concurrent_batches() {
        let config = EngineConfig {
            max_concurrent_batches: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_cache_age() {
        let config = EngineConfig {
            cache_max_age_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = EngineConfigBuilder::new()
            .server_url("http://127.0.0.1:9000")
            .api_token("t")
            .account_secret("s")
            .user_key("k")
            .uuid("u")
            .utm_source("cli")
            .timeout_secs(5)
            .debounce_ms(250)
            .batch_size(3)
            .max_concurrent_batches(2)
            .cache_max_items(10)
            .cache_max_age_secs(60)
            .max_manifest_size(1024)
            .notification_channel_capacity(8)
            .build()
            .unwrap();

        assert_eq!(config.server_url, "http://127.0.0.1:9000");
        assert_eq!(config.user_key.as_deref(), Some("k"));
        assert_eq!(config.uuid.as_deref(), Some("u"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.max_concurrent_batches, 2);
        assert_eq!(config.cache_max_age(), Duration::from_secs(60));
        assert_eq!(config.max_manifest_size, 1024);
        assert_eq!(config.notification_channel_capacity, 8);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = EngineConfigBuilder::new().batch_size(0).build();
        assert!(matches!(result, Err(EngineError::Config { .. })));
    }
}
