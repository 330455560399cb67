//! # vulnlens-core
//!
//! Vulnlens 공통 타입, trait, 에러, 설정.
//!
//! 엔진(`vulnlens-engine`)과 CLI(`vulnlens-cli`)가 공유하는
//! 도메인 타입과 확장 포인트를 정의합니다.

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, FetchError, ParseError, VulnlensError};

// 설정
pub use config::VulnlensConfig;

// 이벤트
pub use event::{Event, EventMetadata, Notification, NotificationEvent};

// 파이프라인 trait
pub use pipeline::Collector;

// 도메인 타입
pub use types::{
    CodeAction, Dependency, DependencyIdentity, Diagnostic, DiagnosticSeverity, Ecosystem,
    Position, Range, Spanned, TextEdit,
};
