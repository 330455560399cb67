//! 분석 사이클 세대 관리와 결과 보고
//!
//! URI마다 단조 증가하는 세대 카운터를 두고, 사이클은 시작 시점의 세대를
//! [`CycleGuard`]로 기억합니다. 이후 같은 URI에서 새 사이클이 시작되거나
//! 문서가 닫히면 카운터가 증가하므로, 기존 사이클은 게시 직전에
//! [`CycleGuard::is_current`]로 자신이 오래되었음을 알고 결과를 버립니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use vulnlens_core::types::{Diagnostic, Ecosystem};

use crate::pipeline::TotalCount;

/// 사이클 세대 가드
#[derive(Debug, Clone)]
pub struct CycleGuard {
    counter: Arc<AtomicU64>,
    generation: u64,
}

impl CycleGuard {
    /// 카운터를 증가시키고 새 세대의 가드를 반환합니다.
    ///
    /// 같은 카운터로 만든 이전 가드는 모두 오래된 것이 됩니다.
    pub fn begin(counter: &Arc<AtomicU64>) -> Self {
        let generation = counter.fetch_add(1, Ordering::AcqRel) + 1;
        Self {
            counter: Arc::clone(counter),
            generation,
        }
    }

    /// 다른 사이클과 공유하지 않는 독립 가드 (일회성 스캔용)
    pub fn detached() -> Self {
        Self::begin(&Arc::new(AtomicU64::new(0)))
    }

    /// 이 가드의 세대 번호
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 아직 최신 사이클인지
    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::Acquire) == self.generation
    }
}

/// 사이클 하나의 결과 보고
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// 사이클 상관 ID (원격 요청의 `request_id`)
    pub cycle_id: String,
    /// URI 세대 번호
    pub generation: u64,
    /// 매니페스트 URI
    pub uri: String,
    /// 생태계
    pub ecosystem: Ecosystem,
    /// 유효한 의존성 선언 수
    pub dependency_count: usize,
    /// 마지막으로 게시된 진단
    pub diagnostics: Vec<Diagnostic>,
    /// 누적 집계
    pub counts: TotalCount,
    /// 실패한 배치 수
    pub failed_batches: usize,
    /// 새 사이클에 밀려 중단되었는지
    pub superseded: bool,
    /// 요약 알림 문구 (중단된 사이클은 없음)
    pub summary: Option<String>,
}
