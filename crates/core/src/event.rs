//! 이벤트 시스템 — 에디터로 전달되는 알림의 기본 단위
//!
//! 분석 사이클의 모든 출력(진행 상황, 오류, 진단 게시)은
//! [`NotificationEvent`]로 감싸 `tokio::mpsc` 채널을 통해 전달됩니다.
//! [`EventMetadata`]의 `trace_id`에는 사이클 상관 ID(`request_id`)가 들어가므로
//! 같은 사이클에서 나온 알림을 서로 연결할 수 있습니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::Diagnostic;

// --- 모듈명 상수 ---

/// 분석 엔진 모듈명
pub const MODULE_ENGINE: &str = "engine";

// --- 이벤트 타입 상수 ---

/// 진행 상황 알림 타입
pub const EVENT_TYPE_PROGRESS: &str = "progress";
/// 오류 알림 타입
pub const EVENT_TYPE_ERROR: &str = "error";
/// 진단 게시 타입
pub const EVENT_TYPE_DIAGNOSTICS: &str = "diagnostics";

/// 이벤트 메타데이터 — 모든 이벤트에 공통으로 포함되는 추적 정보
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 이벤트 발생 시각
    pub timestamp: SystemTime,
    /// 이벤트를 생성한 모듈명
    pub source_module: String,
    /// 추적 ID — 같은 사이클의 이벤트를 연결합니다
    pub trace_id: String,
}

impl EventMetadata {
    /// 기존 trace_id를 사용하여 새 메타데이터를 생성합니다.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }
}

impl fmt::Display for EventMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] source={} trace={}",
            unix_timestamp_str(self.timestamp),
            self.source_module,
            self.trace_id,
        )
    }
}

/// 모든 이벤트가 구현해야 하는 기본 trait
///
/// `Send + Sync + 'static` 바운드로 `tokio::mpsc` 채널을 통한
/// 안전한 전송을 보장합니다.
pub trait Event: Send + Sync + 'static {
    /// 이벤트 고유 ID (UUID v4)
    fn event_id(&self) -> &str;

    /// 이벤트 메타데이터 (timestamp, source_module, trace_id)
    fn metadata(&self) -> &EventMetadata;

    /// 이벤트 타입명 (로깅 및 라우팅에 사용)
    fn event_type(&self) -> &str;
}

/// 에디터 알림 채널로 나가는 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// 사이클 시작/종료 시점의 진행 상황
    Progress {
        data: String,
        done: bool,
        uri: String,
    },
    /// 매니페스트 파싱 실패 등으로 사이클이 중단됨
    Error { data: String, uri: String },
    /// URI의 진단 전체를 교체
    PublishDiagnostics {
        uri: String,
        diagnostics: Vec<Diagnostic>,
    },
}

impl Notification {
    /// 알림 대상 URI를 반환합니다.
    pub fn uri(&self) -> &str {
        match self {
            Self::Progress { uri, .. }
            | Self::Error { uri, .. }
            | Self::PublishDiagnostics { uri, .. } => uri,
        }
    }
}

/// 알림 이벤트
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 알림 본문
    pub notification: Notification,
}

impl NotificationEvent {
    /// 사이클 상관 ID에 연결된 알림 이벤트를 생성합니다.
    pub fn with_trace(notification: Notification, trace_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(MODULE_ENGINE, trace_id),
            notification,
        }
    }
}

impl Event for NotificationEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        match self.notification {
            Notification::Progress { .. } => EVENT_TYPE_PROGRESS,
            Notification::Error { .. } => EVENT_TYPE_ERROR,
            Notification::PublishDiagnostics { .. } => EVENT_TYPE_DIAGNOSTICS,
        }
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NotificationEvent[{}] type={} uri={}",
            &self.id[..8.min(self.id.len())],
            self.event_type(),
            self.notification.uri(),
        )
    }
}

fn unix_timestamp_str(time: SystemTime) -> String {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => format!("{}", duration.as_secs()),
        Err(_) => "unknown".to_owned(),
    }
}
