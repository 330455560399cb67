//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `vulnlens_`
//! - 모듈명: `cycle_`, `cache_`, `batch_`, `tracker_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(vulnlens_core::metrics::CACHE_HITS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 에코시스템 레이블 키 (npm, maven, pypi, golang)
pub const LABEL_ECOSYSTEM: &str = "ecosystem";

// ─── 분석 사이클 메트릭 ────────────────────────────────────────────

/// Cycle: 시작된 분석 사이클 수 (counter, label: ecosystem)
pub const CYCLES_STARTED_TOTAL: &str = "vulnlens_cycles_started_total";

/// Cycle: 새 사이클에 밀려 폐기된 사이클 수 (counter)
pub const CYCLES_SUPERSEDED_TOTAL: &str = "vulnlens_cycles_superseded_total";

/// Cycle: 매니페스트 파싱 실패로 중단된 사이클 수 (counter)
pub const CYCLES_ABORTED_TOTAL: &str = "vulnlens_cycles_aborted_total";

/// Cycle: 사이클 전체 소요 시간 (histogram, 초)
pub const CYCLE_DURATION_SECONDS: &str = "vulnlens_cycle_duration_seconds";

/// Cycle: 게시된 진단 수 (counter)
pub const DIAGNOSTICS_PUBLISHED_TOTAL: &str = "vulnlens_diagnostics_published_total";

// ─── 캐시 메트릭 ────────────────────────────────────────────────────

/// Cache: 적중 수 (counter, label: ecosystem)
pub const CACHE_HITS_TOTAL: &str = "vulnlens_cache_hits_total";

/// Cache: 미적중 수 (counter, label: ecosystem)
pub const CACHE_MISSES_TOTAL: &str = "vulnlens_cache_misses_total";

/// Cache: 용량 초과로 제거된 엔트리 수 (counter)
pub const CACHE_EVICTIONS_TOTAL: &str = "vulnlens_cache_evictions_total";

// ─── 배치 요청 메트릭 ───────────────────────────────────────────────

/// Batch: 전송된 배치 요청 수 (counter)
pub const BATCHES_SENT_TOTAL: &str = "vulnlens_batches_sent_total";

/// Batch: 실패한 배치 요청 수 (counter)
pub const BATCHES_FAILED_TOTAL: &str = "vulnlens_batches_failed_total";

/// Batch: 배치 요청 왕복 시간 (histogram, 초)
pub const BATCH_DURATION_SECONDS: &str = "vulnlens_batch_duration_seconds";

// ─── Change Tracker 메트릭 ──────────────────────────────────────────

/// Tracker: 열린 문서 수 (gauge)
pub const TRACKER_OPEN_DOCUMENTS: &str = "vulnlens_tracker_open_documents";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Cycle
    describe_counter!(
        CYCLES_STARTED_TOTAL,
        "Total number of analysis cycles started"
    );
    describe_counter!(
        CYCLES_SUPERSEDED_TOTAL,
        "Total number of cycles dropped because a newer cycle started for the same document"
    );
    describe_counter!(
        CYCLES_ABORTED_TOTAL,
        "Total number of cycles aborted by a manifest parse failure"
    );
    describe_histogram!(
        CYCLE_DURATION_SECONDS,
        "Time from cycle start to summary notification in seconds"
    );
    describe_counter!(
        DIAGNOSTICS_PUBLISHED_TOTAL,
        "Total number of diagnostics published to the editor"
    );

    // Cache
    describe_counter!(CACHE_HITS_TOTAL, "Total number of advisory cache hits");
    describe_counter!(CACHE_MISSES_TOTAL, "Total number of advisory cache misses");
    describe_counter!(
        CACHE_EVICTIONS_TOTAL,
        "Total number of cache entries evicted due to capacity"
    );

    // Batch
    describe_counter!(
        BATCHES_SENT_TOTAL,
        "Total number of batch requests sent to the advisory service"
    );
    describe_counter!(
        BATCHES_FAILED_TOTAL,
        "Total number of batch requests that failed"
    );
    describe_histogram!(
        BATCH_DURATION_SECONDS,
        "Advisory service batch request round-trip time in seconds"
    );

    // Tracker
    describe_gauge!(
        TRACKER_OPEN_DOCUMENTS,
        "Number of manifest documents currently open"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        CYCLES_STARTED_TOTAL,
        CYCLES_SUPERSEDED_TOTAL,
        CYCLES_ABORTED_TOTAL,
        CYCLE_DURATION_SECONDS,
        DIAGNOSTICS_PUBLISHED_TOTAL,
        CACHE_HITS_TOTAL,
        CACHE_MISSES_TOTAL,
        CACHE_EVICTIONS_TOTAL,
        BATCHES_SENT_TOTAL,
        BATCHES_FAILED_TOTAL,
        BATCH_DURATION_SECONDS,
        TRACKER_OPEN_DOCUMENTS,
    ];

    #[test]
    fn all_metrics_start_with_vulnlens_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("vulnlens_"),
                "Metric '{}' does not start with 'vulnlens_' prefix",
                name
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut names = ALL_METRIC_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn label_key_is_lowercase() {
        assert_eq!(LABEL_ECOSYSTEM.to_lowercase(), LABEL_ECOSYSTEM);
    }
}
