//! 엔진 에러 타입
//!
//! [`EngineError`]는 분석 엔진 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<EngineError> for VulnlensError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **매니페스트**: `Manifest`, `UnsupportedManifest`
//! - **원격 조회**: `Fetch`
//! - **진단 엔진**: `Engine`
//! - **설정**: `Config`
//! - **HTTP 클라이언트 초기화**: `Client`

use vulnlens_core::error::{ConfigError, FetchError, ParseError, VulnlensError};

/// 분석 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 매니페스트 파싱 실패 (사이클 중단)
    #[error("manifest parse error: {uri}: {source}")]
    Manifest {
        /// 문서 URI
        uri: String,
        /// 원본 파싱 에러
        source: ParseError,
    },

    /// 등록된 수집기가 없는 매니페스트
    #[error("unsupported manifest: {0}")]
    UnsupportedManifest(String),

    /// 원격 조회 실패
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// 진단 엔진 처리 실패 (해당 의존성만 건너뜀)
    #[error("engine '{engine}' failed: {reason}")]
    Engine {
        /// 엔진 이름
        engine: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// HTTP 클라이언트 생성 실패
    #[error("http client error: {0}")]
    Client(String),
}

impl From<EngineError> for VulnlensError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Manifest { source, .. } => VulnlensError::Parse(source),
            EngineError::UnsupportedManifest(name) => {
                VulnlensError::Parse(ParseError::UnsupportedManifest(name))
            }
            EngineError::Fetch(e) => VulnlensError::Fetch(e),
            EngineError::Engine { engine, reason } => VulnlensError::Parse(ParseError::Failed {
                line: 0,
                reason: format!("engine '{engine}' failed: {reason}"),
            }),
            EngineError::Config { field, reason } => {
                VulnlensError::Config(ConfigError::InvalidValue { field, reason })
            }
            EngineError::Client(msg) => VulnlensError::Fetch(FetchError::Transport(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_error_display() {
        let err = EngineError::Manifest {
            uri: "file:///app/package.json".to_owned(),
            source: ParseError::Failed {
                line: 3,
                reason: "expected value".to_owned(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("package.json"));
        assert!(msg.contains("line 3"));
    }

    #[test]
    fn config_error_display() {
        let err = EngineError::Config {
            field: "batch_size".to_owned(),
            reason: "must be 1-100".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("batch_size"));
        assert!(msg.contains("must be 1-100"));
    }

    #[test]
    fn converts_manifest_to_parse_error() {
        let err = EngineError::Manifest {
            uri: "file:///go.mod".to_owned(),
            source: ParseError::Failed {
                line: 1,
                reason: "bad".to_owned(),
            },
        };
        let top: VulnlensError = err.into();
        assert!(matches!(top, VulnlensError::Parse(ParseError::Failed { line: 1, .. })));
    }

    #[test]
    fn converts_unsupported_manifest() {
        let top: VulnlensError = EngineError::UnsupportedManifest("Gemfile".to_owned()).into();
        assert!(matches!(
            top,
            VulnlensError::Parse(ParseError::UnsupportedManifest(_))
        ));
    }

    #[test]
    fn converts_fetch_error() {
        let err: EngineError = FetchError::Status {
            status: 500,
            body: "boom".to_owned(),
        }
        .into();
        let top: VulnlensError = err.into();
        assert!(matches!(
            top,
            VulnlensError::Fetch(FetchError::Status { status: 500, .. })
        ));
    }

    #[test]
    fn converts_config_error() {
        let err = EngineError::Config {
            field: "cache_max_items".to_owned(),
            reason: "must be greater than 0".to_owned(),
        };
        let top: VulnlensError = err.into();
        assert!(matches!(
            top,
            VulnlensError::Config(ConfigError::InvalidValue { .. })
        ));
    }
}
