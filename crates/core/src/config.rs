//! 설정 관리 — vulnlens.toml 파싱 및 런타임 설정
//!
//! [`VulnlensConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`VULNLENS_API_SERVER_URL=https://...` 형식)
//! 3. 설정 파일 (`vulnlens.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), vulnlens_core::error::VulnlensError> {
//! use vulnlens_core::config::VulnlensConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = VulnlensConfig::load("vulnlens.toml").await?;
//!
//! // 파일이 잘못되어도 기본값으로 계속 진행
//! let config = VulnlensConfig::load_or_default("vulnlens.toml").await;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = VulnlensConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, VulnlensError};

/// Vulnlens 통합 설정
///
/// `vulnlens.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VulnlensConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 원격 취약점 API 설정
    #[serde(default)]
    pub api: ApiConfig,
    /// 분석 사이클 설정
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// 취약점 캐시 설정
    #[serde(default)]
    pub cache: CacheConfig,
}

impl VulnlensConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, VulnlensError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 로드에 실패하면 경고를 남기고 기본값(+환경변수)을 사용합니다.
    ///
    /// 잘못된 로컬 설정 파일이 분석 자체를 막지 않도록 합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path).await {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to load config, falling back to defaults"
                );
                let mut config = Self::default();
                config.apply_env_overrides();
                if let Err(e) = config.validate() {
                    warn!(error = %e, "env overrides produced invalid config, ignoring them");
                    return Self::default();
                }
                config
            }
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, VulnlensError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VulnlensError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                VulnlensError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, VulnlensError> {
        toml::from_str(toml_str).map_err(|e| {
            VulnlensError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `VULNLENS_{SECTION}_{FIELD}`
    /// 예: `VULNLENS_CACHE_MAX_ITEMS=5000`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "VULNLENS_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "VULNLENS_GENERAL_LOG_FORMAT");

        // API
        override_string(&mut self.api.server_url, "VULNLENS_API_SERVER_URL");
        override_string(&mut self.api.api_token, "VULNLENS_API_TOKEN");
        override_string(&mut self.api.account_secret, "VULNLENS_API_ACCOUNT_SECRET");
        override_opt_string(&mut self.api.user_key, "VULNLENS_API_USER_KEY");
        override_opt_string(&mut self.api.uuid, "VULNLENS_API_UUID");
        override_opt_string(&mut self.api.utm_source, "VULNLENS_API_UTM_SOURCE");
        override_u64(&mut self.api.timeout_secs, "VULNLENS_API_TIMEOUT_SECS");

        // Analysis
        override_u64(
            &mut self.analysis.debounce_ms,
            "VULNLENS_ANALYSIS_DEBOUNCE_MS",
        );
        override_usize(
            &mut self.analysis.batch_size,
            "VULNLENS_ANALYSIS_BATCH_SIZE",
        );
        override_usize(
            &mut self.analysis.max_concurrent_batches,
            "VULNLENS_ANALYSIS_MAX_CONCURRENT_BATCHES",
        );

        // Cache
        override_usize(&mut self.cache.max_items, "VULNLENS_CACHE_MAX_ITEMS");
        override_u64(&mut self.cache.max_age_secs, "VULNLENS_CACHE_MAX_AGE_SECS");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), VulnlensError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if !(self.api.server_url.starts_with("http://")
            || self.api.server_url.starts_with("https://"))
        {
            return Err(invalid(
                "api.server_url",
                "must start with http:// or https://".to_owned(),
            ));
        }

        if self.api.timeout_secs == 0 || self.api.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(invalid(
                "api.timeout_secs",
                format!("must be 1-{MAX_TIMEOUT_SECS}"),
            ));
        }

        if self.analysis.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(invalid(
                "analysis.debounce_ms",
                format!("must be 0-{MAX_DEBOUNCE_MS}"),
            ));
        }

        if self.analysis.batch_size == 0 || self.analysis.batch_size > MAX_BATCH_SIZE {
            return Err(invalid(
                "analysis.batch_size",
                format!("must be 1-{MAX_BATCH_SIZE}"),
            ));
        }

        if self.analysis.max_concurrent_batches == 0 {
            return Err(invalid(
                "analysis.max_concurrent_batches",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.cache.max_items == 0 {
            return Err(invalid(
                "cache.max_items",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.cache.max_age_secs == 0 {
            return Err(invalid(
                "cache.max_age_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }
}

/// 설정 상한값 상수
const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_DEBOUNCE_MS: u64 = 60_000;
const MAX_BATCH_SIZE: usize = 10;

fn invalid(field: &str, reason: String) -> VulnlensError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 원격 취약점 API 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API 서버 주소 (`/component-analyses`가 뒤에 붙습니다)
    pub server_url: String,
    /// `Authorization: Bearer` 토큰
    pub api_token: String,
    /// `x-3scale-account-secret` 헤더 값
    pub account_secret: String,
    /// `user_key` 쿼리 파라미터 (선택)
    pub user_key: Option<String>,
    /// `uuid` 헤더 (선택)
    pub uuid: Option<String>,
    /// `utm_source` 쿼리 파라미터 (선택)
    pub utm_source: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080/api/v2".to_owned(),
            api_token: String::new(),
            account_secret: String::new(),
            user_key: None,
            uuid: None,
            utm_source: None,
            timeout_secs: 30,
        }
    }
}

/// 분석 사이클 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 편집 후 분석까지 대기하는 시간 (밀리초)
    pub debounce_ms: u64,
    /// 원격 요청 1회당 최대 패키지 수
    pub batch_size: usize,
    /// 동시에 진행할 수 있는 최대 배치 요청 수
    pub max_concurrent_batches: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            batch_size: 10,
            max_concurrent_batches: 4,
        }
    }
}

/// 취약점 캐시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 네임스페이스(생태계)당 최대 엔트리 수
    pub max_items: usize,
    /// 엔트리 유효 기간 (초)
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_items: 1000,
            max_age_secs: 3600,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.is_empty() { None } else { Some(val) };
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
