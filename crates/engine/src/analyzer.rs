//! 분석 오케스트레이터 -- 매니페스트 텍스트 -> 진단 게시
//!
//! [`Analyzer`]는 매니페스트 하나에 대한 분석 사이클을 실행합니다.
//!
//! ```text
//! 텍스트 -> 수집기 -> 버전 필터 -> 집계기(조회 계획)
//!        -> 캐시 분할 ─┬─ 적중: 즉시 파이프라인 실행, 게시
//!                      └─ 미적중: 배치 분할 -> 동시 조회 (세마포어로 제한)
//!                                 -> 배치마다 캐시 기록, 파이프라인 실행, 게시
//!        -> 모든 배치 종료 후 요약 알림
//! ```
//!
//! # 동시성
//!
//! 사이클은 하나의 태스크에서 실행되며 사이클 상태([`CycleState`])를 혼자 소유합니다.
//! 배치 조회만 `JoinSet`의 하위 태스크로 실행되고, 결과는 사이클 태스크가
//! 도착 순서대로 하나씩 소비합니다. 캐시 잠금은 동기 구간에서만 잡습니다.
//!
//! # 세대
//!
//! 게시 직전마다 [`CycleGuard`]로 최신 사이클인지 확인합니다. 오래된 사이클은
//! 남은 배치를 중단하고 요약 없이 `superseded` 보고를 반환합니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use metrics::{counter, histogram};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use vulnlens_core::error::{FetchError, ParseError};
use vulnlens_core::event::{Notification, NotificationEvent};
use vulnlens_core::metrics as m;
use vulnlens_core::types::{CodeAction, DependencyIdentity, Range};

use crate::aggregator::{QueryPlan, aggregator_for};
use crate::batch::{RequestBatch, slice_batches};
use crate::cache::{AdvisoryCache, SharedRecord};
use crate::client::{AdvisoryClient, RequestContext};
use crate::collector::CollectorRegistry;
use crate::config::EngineConfig;
use crate::cycle::{CycleGuard, CycleReport};
use crate::error::EngineError;
use crate::pipeline::{CodeActionIndex, CycleState, DiagnosticsPipeline};
use crate::summary::build_summary;
use crate::tracker::CycleRunner;
use crate::validity::filter_valid;

/// 사이클 시작 진행 알림 문구
const PROGRESS_STARTED: &str = "Vulnerability analysis started";

/// 배치 하나의 조회 결과
struct BatchOutcome {
    index: usize,
    size: usize,
    result: Result<Vec<SharedRecord>, FetchError>,
}

/// 분석 오케스트레이터
///
/// `Arc`로 감싸 [`ChangeTracker`](crate::tracker::ChangeTracker)와 공유하거나,
/// [`Analyzer::analyze`]로 직접 사이클을 실행할 수 있습니다.
pub struct Analyzer<C: AdvisoryClient> {
    /// 엔진 설정
    config: EngineConfig,
    /// 원격 조회 클라이언트
    client: Arc<C>,
    /// 취약점 캐시 (사이클, 문서 간 공유)
    cache: Arc<AdvisoryCache>,
    /// 진단 파이프라인
    pipeline: DiagnosticsPipeline,
    /// 매니페스트 수집기
    collectors: CollectorRegistry,
    /// 에디터 알림 채널
    notify_tx: mpsc::Sender<NotificationEvent>,
    /// URI별 세대 카운터 (`analyze` 경로)
    generations: Mutex<HashMap<String, Arc<AtomicU64>>>,
    /// URI별 최신 빠른 수정 색인
    code_actions: Mutex<HashMap<String, CodeActionIndex>>,
    /// 완료된 사이클 수
    cycles_completed: AtomicU64,
}

impl<C: AdvisoryClient> Analyzer<C> {
    /// 엔진 설정을 반환합니다.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 공유 캐시를 반환합니다.
    pub fn cache(&self) -> &Arc<AdvisoryCache> {
        &self.cache
    }

    /// 요약까지 완료된 사이클 수
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    /// URI의 새 사이클 가드를 발급합니다. 같은 URI의 이전 사이클은 오래된 것이 됩니다.
    pub fn begin_cycle(&self, uri: &str) -> CycleGuard {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let counter = generations.entry(uri.to_owned()).or_default();
        CycleGuard::begin(counter)
    }

    /// 새 세대로 사이클 하나를 실행합니다.
    pub async fn analyze(&self, uri: &str, text: &str) -> Result<CycleReport, EngineError> {
        let guard = self.begin_cycle(uri);
        self.run_cycle(guard, uri, text).await
    }

    /// 문서를 닫습니다. 진행 중인 사이클은 오래된 것이 되고 빠른 수정 색인은 제거됩니다.
    pub fn close(&self, uri: &str) {
        // 세대 증가와 색인 제거는 색인 잠금 안에서 함께 일어나야 합니다
        let mut index = self
            .code_actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(counter) = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri)
        {
            counter.fetch_add(1, Ordering::AcqRel);
        }
        index.remove(uri);
        drop(index);
        debug!(uri, "document closed");
    }

    /// 범위와 겹치는 빠른 수정을 반환합니다 (최신 게시 기준).
    pub fn code_actions(&self, uri: &str, range: &Range) -> Vec<CodeAction> {
        self.code_actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .map(|index| index.lookup(range))
            .unwrap_or_default()
    }

    /// 주어진 가드로 사이클 하나를 실행합니다.
    ///
    /// 매니페스트 파싱 실패 시 에러 알림을 보내고 [`EngineError::Manifest`]를 반환하며,
    /// 이전에 게시된 진단은 그대로 둡니다.
    pub async fn run_cycle(
        &self,
        guard: CycleGuard,
        uri: &str,
        text: &str,
    ) -> Result<CycleReport, EngineError> {
        let started = Instant::now();
        let ctx = RequestContext::new(uri);
        let cycle = guard.generation();

        let collector = self
            .collectors
            .for_uri(uri)
            .ok_or_else(|| EngineError::UnsupportedManifest(uri.to_owned()))?;
        let ecosystem = collector.ecosystem();

        let collected = if text.len() > self.config.max_manifest_size {
            Err(ParseError::TooLarge {
                size: text.len(),
                max: self.config.max_manifest_size,
            })
        } else {
            collector.collect(text)
        };
        let dependencies = match collected {
            Ok(deps) => deps,
            Err(e) => {
                counter!(m::CYCLES_ABORTED_TOTAL).increment(1);
                warn!(uri, cycle, request_id = %ctx.request_id, error = %e, "manifest parse failed, aborting cycle");
                self.notify(
                    &guard,
                    &ctx,
                    Notification::Error {
                        data: format!("analysis aborted: {e}"),
                        uri: uri.to_owned(),
                    },
                )
                .await;
                return Err(EngineError::Manifest {
                    uri: uri.to_owned(),
                    source: e,
                });
            }
        };

        counter!(m::CYCLES_STARTED_TOTAL, m::LABEL_ECOSYSTEM => ecosystem.as_str()).increment(1);
        info!(
            uri,
            cycle,
            request_id = %ctx.request_id,
            ecosystem = %ecosystem,
            declared = dependencies.len(),
            "analysis cycle started"
        );

        let mut report = CycleReport {
            cycle_id: ctx.request_id.clone(),
            generation: cycle,
            uri: uri.to_owned(),
            ecosystem,
            dependency_count: 0,
            diagnostics: Vec::new(),
            counts: Default::default(),
            failed_batches: 0,
            superseded: false,
            summary: None,
        };

        let started_sent = self
            .notify(
                &guard,
                &ctx,
                Notification::Progress {
                    data: PROGRESS_STARTED.to_owned(),
                    done: false,
                    uri: uri.to_owned(),
                },
            )
            .await;
        if !started_sent {
            return Ok(self.superseded(report, &ctx));
        }
        self.clear_code_actions(&guard, uri);

        let valid = filter_valid(ecosystem, dependencies);
        report.dependency_count = valid.len();
        let plan = aggregator_for(ecosystem).plan(valid);

        // 캐시 분할
        let mut state = CycleState::default();
        let mut misses = Vec::new();
        for lookup in self.cache.get(ecosystem, &plan.queries) {
            match lookup.value {
                Some(record) => self.run_pipeline(&plan, &lookup.key, &record, &mut state),
                None => misses.push(lookup.key),
            }
        }
        debug!(
            uri,
            cycle,
            queries = plan.queries.len(),
            misses = misses.len(),
            "cache partitioned"
        );

        // 적중분은 네트워크 대기 없이 먼저 게시
        if !self.publish(&guard, &ctx, uri, &state).await {
            return Ok(self.superseded(report, &ctx));
        }

        let batches = slice_batches(ecosystem, &misses, self.config.batch_size);
        let mut tasks = self.spawn_batches(batches, &ctx);

        while let Some(joined) = tasks.join_next().await {
            if !guard.is_current() {
                tasks.abort_all();
                return Ok(self.superseded(report, &ctx));
            }

            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    report.failed_batches += 1;
                    counter!(m::BATCHES_FAILED_TOTAL).increment(1);
                    warn!(uri, cycle, request_id = %ctx.request_id, error = %e, "batch task failed");
                    continue;
                }
            };

            let records = match outcome.result {
                Ok(records) => records,
                Err(e) => {
                    report.failed_batches += 1;
                    counter!(m::BATCHES_FAILED_TOTAL).increment(1);
                    warn!(
                        uri,
                        cycle,
                        request_id = %ctx.request_id,
                        batch = outcome.index,
                        size = outcome.size,
                        error = %e,
                        "batch request failed, skipping"
                    );
                    continue;
                }
            };

            self.cache.add(
                ecosystem,
                records
                    .iter()
                    .map(|record| (record.identity(), Arc::clone(record))),
            );
            for record in &records {
                let key = record.identity();
                if plan.declarations_for(&key).is_empty() {
                    debug!(uri, package = %key, "record matches no declaration");
                    continue;
                }
                self.run_pipeline(&plan, &key, record, &mut state);
            }

            if !self.publish(&guard, &ctx, uri, &state).await {
                tasks.abort_all();
                return Ok(self.superseded(report, &ctx));
            }
        }

        let summary = build_summary(report.dependency_count, &state.diagnostics, &state.counts);
        let summary_sent = self
            .notify(
                &guard,
                &ctx,
                Notification::Progress {
                    data: summary.clone(),
                    done: true,
                    uri: uri.to_owned(),
                },
            )
            .await;
        if !summary_sent {
            return Ok(self.superseded(report, &ctx));
        }

        let elapsed = started.elapsed();
        histogram!(m::CYCLE_DURATION_SECONDS).record(elapsed.as_secs_f64());
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        info!(
            uri,
            cycle,
            request_id = %ctx.request_id,
            dependencies = report.dependency_count,
            diagnostics = state.diagnostics.len(),
            failed_batches = report.failed_batches,
            elapsed_ms = elapsed.as_millis() as u64,
            "analysis cycle completed"
        );

        report.diagnostics = state.diagnostics;
        report.counts = state.counts;
        report.summary = Some(summary);
        Ok(report)
    }

    /// 조회 키에 연결된 모든 선언에 대해 파이프라인을 실행합니다.
    fn run_pipeline(
        &self,
        plan: &QueryPlan,
        key: &DependencyIdentity,
        record: &SharedRecord,
        state: &mut CycleState,
    ) {
        for declaration in plan.declarations_for(key) {
            self.pipeline.run(declaration, record, state);
        }
    }

    /// 배치마다 조회 태스크를 생성합니다. 동시 실행 수는 세마포어로 제한됩니다.
    fn spawn_batches(
        &self,
        batches: Vec<RequestBatch>,
        ctx: &RequestContext,
    ) -> JoinSet<BatchOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_batches.max(1)));
        let mut tasks = JoinSet::new();

        for (index, batch) in batches.into_iter().enumerate() {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let ctx = ctx.clone();
            counter!(m::BATCHES_SENT_TOTAL).increment(1);

            tasks.spawn(async move {
                let size = batch.len();
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        let started = Instant::now();
                        let fetched = client.fetch(&batch, &ctx).await;
                        histogram!(m::BATCH_DURATION_SECONDS)
                            .record(started.elapsed().as_secs_f64());
                        fetched.map(|records| records.into_iter().map(Arc::new).collect())
                    }
                    Err(e) => Err(FetchError::Transport(e.to_string())),
                };
                BatchOutcome {
                    index,
                    size,
                    result,
                }
            });
        }

        tasks
    }

    /// 최신 사이클일 때만 진단과 빠른 수정 색인을 게시합니다.
    ///
    /// 채널 슬롯을 먼저 예약한 뒤 세대를 확인하므로, 확인과 전송 사이에
    /// 대기 지점이 없습니다.
    async fn publish(
        &self,
        guard: &CycleGuard,
        ctx: &RequestContext,
        uri: &str,
        state: &CycleState,
    ) -> bool {
        let permit = self.notify_tx.reserve().await;
        {
            let mut index = self
                .code_actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !guard.is_current() {
                return false;
            }
            index.insert(uri.to_owned(), state.code_actions.clone());
        }

        let event = NotificationEvent::with_trace(
            Notification::PublishDiagnostics {
                uri: uri.to_owned(),
                diagnostics: state.diagnostics.clone(),
            },
            ctx.request_id.clone(),
        );
        match permit {
            Ok(permit) => permit.send(event),
            Err(e) => warn!(error = %e, "failed to send notification"),
        }
        counter!(m::DIAGNOSTICS_PUBLISHED_TOTAL).increment(state.diagnostics.len() as u64);
        true
    }

    /// 최신 사이클일 때만 알림을 전송합니다. 오래된 사이클이면 `false`.
    async fn notify(
        &self,
        guard: &CycleGuard,
        ctx: &RequestContext,
        notification: Notification,
    ) -> bool {
        let permit = self.notify_tx.reserve().await;
        if !guard.is_current() {
            return false;
        }
        let event = NotificationEvent::with_trace(notification, ctx.request_id.clone());
        match permit {
            Ok(permit) => permit.send(event),
            Err(e) => warn!(error = %e, "failed to send notification"),
        }
        true
    }

    fn clear_code_actions(&self, guard: &CycleGuard, uri: &str) {
        let mut index = self
            .code_actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.is_current() {
            index.remove(uri);
        }
    }

    fn superseded(&self, mut report: CycleReport, ctx: &RequestContext) -> CycleReport {
        counter!(m::CYCLES_SUPERSEDED_TOTAL).increment(1);
        debug!(
            uri = %report.uri,
            cycle = report.generation,
            request_id = %ctx.request_id,
            "cycle superseded, dropping results"
        );
        report.superseded = true;
        report
    }
}

impl<C: AdvisoryClient> CycleRunner for Analyzer<C> {
    async fn run(
        &self,
        guard: CycleGuard,
        uri: String,
        text: String,
    ) -> Result<CycleReport, EngineError> {
        self.run_cycle(guard, &uri, &text).await
    }

    fn release(&self, uri: &str) {
        self.close(uri);
    }
}

/// 분석기 빌더
///
/// 분석기를 구성하고 알림 채널을 생성합니다.
pub struct AnalyzerBuilder<C: AdvisoryClient> {
    config: EngineConfig,
    client: Option<C>,
    notify_tx: Option<mpsc::Sender<NotificationEvent>>,
    cache: Option<Arc<AdvisoryCache>>,
    pipeline: Option<DiagnosticsPipeline>,
    collectors: Option<CollectorRegistry>,
}

impl<C: AdvisoryClient> AnalyzerBuilder<C> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            client: None,
            notify_tx: None,
            cache: None,
            pipeline: None,
            collectors: None,
        }
    }

    /// 엔진 설정을 지정합니다.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 원격 조회 클라이언트를 지정합니다 (필수).
    pub fn client(mut self, client: C) -> Self {
        self.client = Some(client);
        self
    }

    /// 외부 알림 전송 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn notification_sender(mut self, tx: mpsc::Sender<NotificationEvent>) -> Self {
        self.notify_tx = Some(tx);
        self
    }

    /// 다른 분석기와 공유할 캐시를 지정합니다.
    pub fn cache(mut self, cache: Arc<AdvisoryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 진단 파이프라인을 교체합니다 (기본: 보안 엔진).
    pub fn pipeline(mut self, pipeline: DiagnosticsPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// 수집기 레지스트리를 교체합니다 (기본: npm, pypi, golang).
    pub fn collectors(mut self, collectors: CollectorRegistry) -> Self {
        self.collectors = Some(collectors);
        self
    }

    /// 분석기를 빌드합니다.
    ///
    /// # Returns
    ///
    /// - `Analyzer`: 분석기 인스턴스
    /// - `Option<mpsc::Receiver<NotificationEvent>>`: 알림 수신 채널
    ///   (외부 notification_sender를 설정한 경우 None)
    pub fn build(
        self,
    ) -> Result<(Analyzer<C>, Option<mpsc::Receiver<NotificationEvent>>), EngineError> {
        self.config.validate()?;

        let client = self.client.ok_or_else(|| EngineError::Config {
            field: "client".to_owned(),
            reason: "advisory client is required".to_owned(),
        })?;

        let (notify_tx, notify_rx) = match self.notify_tx {
            Some(tx) => (tx, None),
            None => {
                let (tx, rx) = mpsc::channel(self.config.notification_channel_capacity);
                (tx, Some(rx))
            }
        };

        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(AdvisoryCache::new(
                self.config.cache_max_items,
                self.config.cache_max_age(),
            ))
        });

        let analyzer = Analyzer {
            client: Arc::new(client),
            cache,
            pipeline: self.pipeline.unwrap_or_default(),
            collectors: self.collectors.unwrap_or_default(),
            notify_tx,
            generations: Mutex::new(HashMap::new()),
            code_actions: Mutex::new(HashMap::new()),
            cycles_completed: AtomicU64::new(0),
            config: self.config,
        };

        Ok((analyzer, notify_rx))
    }
}

impl<C: AdvisoryClient> Default for AnalyzerBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
