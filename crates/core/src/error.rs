//! 에러 타입 — 도메인별 에러 정의

/// Vulnlens 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum VulnlensError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 매니페스트 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 원격 조회 에러
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 매니페스트 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 지원하지 않는 매니페스트
    #[error("unsupported manifest: {0}")]
    UnsupportedManifest(String),

    /// 파싱 실패
    #[error("parse failed at line {line}: {reason}")]
    Failed { line: u32, reason: String },

    /// 입력 데이터 초과
    #[error("input too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}

/// 원격 조회 에러
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// 전송 실패 (연결, 타임아웃 등)
    #[error("transport error: {0}")]
    Transport(String),

    /// 2xx 이외의 응답
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// 응답 본문 디코딩 실패
    #[error("invalid response body: {0}")]
    Decode(String),
}
