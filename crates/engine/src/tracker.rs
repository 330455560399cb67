//! 문서 변경 추적 -- 디바운스와 사이클 트리거
//!
//! [`ChangeTracker`]는 열린 매니페스트마다 세션(최신 텍스트, 대기 중인 타이머,
//! 세대 카운터)을 유지하고 문서 이벤트에 따라 분석 사이클을 시작합니다.
//!
//! - 편집: 해당 URI의 대기 타이머를 취소하고 디바운스 시간 후 새 타이머 예약
//! - 저장/열기: 대기 타이머를 취소하고 즉시 실행
//! - 닫기: 대기 타이머 취소, 세션 제거, 진행 중인 사이클 무효화
//!
//! 타이머는 URI마다 하나이며 다른 문서의 편집에 영향을 받지 않습니다.
//! 타이머 예약 시점의 텍스트가 사이클 입력으로 고정됩니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::gauge;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vulnlens_core::metrics as m;

use crate::cycle::{CycleGuard, CycleReport};
use crate::error::EngineError;

/// 에디터 문서 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// 문서 열림
    Opened { uri: String, text: String },
    /// 문서 편집 (전체 텍스트)
    Changed { uri: String, text: String },
    /// 문서 저장 (텍스트가 없으면 마지막 편집 텍스트 사용)
    Saved { uri: String, text: Option<String> },
    /// 문서 닫힘
    Closed { uri: String },
}

impl DocumentEvent {
    /// 이벤트 대상 URI
    pub fn uri(&self) -> &str {
        match self {
            Self::Opened { uri, .. }
            | Self::Changed { uri, .. }
            | Self::Saved { uri, .. }
            | Self::Closed { uri } => uri,
        }
    }
}

/// 사이클 실행 trait
///
/// [`Analyzer`](crate::analyzer::Analyzer)가 구현하며, 테스트에서는 기록용 구현으로 대체합니다.
pub trait CycleRunner: Send + Sync + 'static {
    /// 가드의 세대로 사이클 하나를 실행합니다.
    fn run(
        &self,
        guard: CycleGuard,
        uri: String,
        text: String,
    ) -> impl Future<Output = Result<CycleReport, EngineError>> + Send;

    /// 닫힌 문서의 상태를 정리합니다.
    fn release(&self, uri: &str);
}

/// 열린 문서 하나의 세션
struct DocumentSession {
    text: String,
    pending: Option<CancellationToken>,
    generation: Arc<AtomicU64>,
}

impl DocumentSession {
    fn new(text: String) -> Self {
        Self {
            text,
            pending: None,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

/// 문서 변경 추적기
pub struct ChangeTracker<R: CycleRunner> {
    runner: Arc<R>,
    debounce: Duration,
    sessions: HashMap<String, DocumentSession>,
    tasks: JoinSet<()>,
}

impl<R: CycleRunner> ChangeTracker<R> {
    /// 새 추적기를 생성합니다.
    pub fn new(runner: Arc<R>, debounce: Duration) -> Self {
        Self {
            runner,
            debounce,
            sessions: HashMap::new(),
            tasks: JoinSet::new(),
        }
    }

    /// 열린 문서 수
    pub fn open_documents(&self) -> usize {
        self.sessions.len()
    }

    /// 디바운스 타이머가 아직 만료되지 않았는지
    pub fn has_pending(&self, uri: &str) -> bool {
        self.sessions
            .get(uri)
            .is_some_and(|s| s.pending.as_ref().is_some_and(|t| !t.is_cancelled()))
    }

    /// 이벤트 하나를 처리합니다.
    pub fn handle(&mut self, event: DocumentEvent) {
        while self.tasks.try_join_next().is_some() {}

        match event {
            DocumentEvent::Opened { uri, text } => {
                let session = self
                    .sessions
                    .entry(uri.clone())
                    .or_insert_with(|| DocumentSession::new(String::new()));
                session.text = text;
                session.cancel_pending();
                self.update_gauge();
                debug!(uri = %uri, "document opened");
                self.trigger_now(uri);
            }
            DocumentEvent::Changed { uri, text } => {
                let session = self
                    .sessions
                    .entry(uri.clone())
                    .or_insert_with(|| DocumentSession::new(String::new()));
                session.text = text;
                session.cancel_pending();
                self.update_gauge();
                self.schedule(uri);
            }
            DocumentEvent::Saved { uri, text } => {
                if let Some(session) = self.sessions.get_mut(&uri) {
                    if let Some(text) = text {
                        session.text = text;
                    }
                    session.cancel_pending();
                } else if let Some(text) = text {
                    self.sessions.insert(uri.clone(), DocumentSession::new(text));
                    self.update_gauge();
                } else {
                    debug!(uri = %uri, "save for unknown document ignored");
                    return;
                }
                self.trigger_now(uri);
            }
            DocumentEvent::Closed { uri } => {
                if let Some(mut session) = self.sessions.remove(&uri) {
                    session.cancel_pending();
                    session.generation.fetch_add(1, Ordering::AcqRel);
                }
                self.runner.release(&uri);
                self.update_gauge();
                debug!(uri = %uri, "document closed");
            }
        }
    }

    /// 이벤트 채널을 소비합니다. 채널이 닫히거나 취소 토큰이 발동되면 종료합니다.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<DocumentEvent>,
        cancel: CancellationToken,
    ) {
        info!(debounce_ms = self.debounce.as_millis() as u64, "change tracker started");

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => self.handle(event),
                        None => {
                            info!("document event channel closed, stopping change tracker");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("change tracker received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
    }

    /// 대기 중인 타이머를 모두 취소하고 실행 중인 사이클을 중단합니다.
    pub async fn shutdown(&mut self) {
        for session in self.sessions.values_mut() {
            session.cancel_pending();
        }
        self.tasks.shutdown().await;
        info!("change tracker stopped");
    }

    /// 디바운스 타이머를 예약합니다.
    fn schedule(&mut self, uri: String) {
        let Some(session) = self.sessions.get_mut(&uri) else {
            return;
        };
        let token = CancellationToken::new();
        session.pending = Some(token.clone());

        let runner = Arc::clone(&self.runner);
        let generation = Arc::clone(&session.generation);
        let text = session.text.clone();
        let debounce = self.debounce;
        let fired = token.clone();

        self.tasks.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(debounce) => {
                    fired.cancel();
                    let guard = CycleGuard::begin(&generation);
                    execute(runner.as_ref(), guard, uri, text).await;
                }
            }
        });
    }

    /// 사이클을 즉시 시작합니다. 세대는 호출 시점에 발급됩니다.
    fn trigger_now(&mut self, uri: String) {
        let Some(session) = self.sessions.get(&uri) else {
            return;
        };
        let guard = CycleGuard::begin(&session.generation);
        let text = session.text.clone();
        let runner = Arc::clone(&self.runner);

        self.tasks.spawn(async move {
            execute(runner.as_ref(), guard, uri, text).await;
        });
    }

    fn update_gauge(&self) {
        gauge!(m::TRACKER_OPEN_DOCUMENTS).set(self.sessions.len() as f64);
    }
}

async fn execute<R: CycleRunner>(runner: &R, guard: CycleGuard, uri: String, text: String) {
    let log_uri = uri.clone();
    match runner.run(guard, uri, text).await {
        Ok(report) if report.superseded => {
            debug!(uri = %log_uri, cycle = report.generation, "cycle superseded");
        }
        Ok(_) => {}
        Err(EngineError::UnsupportedManifest(_)) => {
            debug!(uri = %log_uri, "not a supported manifest, ignoring");
        }
        Err(e) => {
            warn!(uri = %log_uri, error = %e, "analysis cycle failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vulnlens_core::types::Ecosystem;

    use crate::pipeline::TotalCount;

    #[derive(Default)]
    struct RecordingRunner {
        runs: Mutex<Vec<(String, String, CycleGuard)>>,
        released: Mutex<Vec<String>>,
    }

    impl RecordingRunner {
        fn texts(&self) -> Vec<String> {
            self.runs
                .lock()
                .unwrap()
                .iter()
                .map(|(_, text, _)| text.clone())
                .collect()
        }
    }

    impl CycleRunner for RecordingRunner {
        async fn run(
            &self,
            guard: CycleGuard,
            uri: String,
            text: String,
        ) -> Result<CycleReport, EngineError> {
            self.runs
                .lock()
                .unwrap()
                .push((uri.clone(), text, guard.clone()));
            Ok(CycleReport {
                cycle_id: "test".to_owned(),
                generation: guard.generation(),
                uri,
                ecosystem: Ecosystem::Npm,
                dependency_count: 0,
                diagnostics: vec![],
                counts: TotalCount::default(),
                failed_batches: 0,
                superseded: false,
                summary: None,
            })
        }

        fn release(&self, uri: &str) {
            self.released.lock().unwrap().push(uri.to_owned());
        }
    }

    const URI: &str = "file:///app/package.json";
    const DEBOUNCE: Duration = Duration::from_millis(500);

    fn changed(text: &str) -> DocumentEvent {
        DocumentEvent::Changed {
            uri: URI.to_owned(),
            text: text.to_owned(),
        }
    }

    fn tracker() -> (ChangeTracker<RecordingRunner>, Arc<RecordingRunner>) {
        let runner = Arc::new(RecordingRunner::default());
        (ChangeTracker::new(Arc::clone(&runner), DEBOUNCE), runner)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_runs_once_with_last_text() {
        let (mut tracker, runner) = tracker();

        tracker.handle(changed("a"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        tracker.handle(changed("ab"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        tracker.handle(changed("abc"));
        assert!(tracker.has_pending(URI));

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(runner.texts(), vec!["abc"]);
    }

    #[tokio::test(start_paused = true)]
    async fn save_runs_immediately_and_cancels_timer() {
        let (mut tracker, runner) = tracker();

        tracker.handle(changed("draft"));
        tracker.handle(DocumentEvent::Saved {
            uri: URI.to_owned(),
            text: None,
        });
        assert!(!tracker.has_pending(URI));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(runner.texts(), vec!["draft"]);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runner.texts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn open_triggers_immediately() {
        let (mut tracker, runner) = tracker();
        tracker.handle(DocumentEvent::Opened {
            uri: URI.to_owned(),
            text: "{}".to_owned(),
        });
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(runner.texts(), vec!["{}"]);
        assert_eq!(tracker.open_documents(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pending_and_invalidates_cycle() {
        let (mut tracker, runner) = tracker();

        tracker.handle(DocumentEvent::Opened {
            uri: URI.to_owned(),
            text: "v1".to_owned(),
        });
        tokio::time::sleep(Duration::from_millis(1)).await;
        tracker.handle(changed("v2"));
        tracker.handle(DocumentEvent::Closed {
            uri: URI.to_owned(),
        });

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runner.texts(), vec!["v1"]);
        assert_eq!(*runner.released.lock().unwrap(), vec![URI.to_owned()]);
        assert_eq!(tracker.open_documents(), 0);

        let runs = runner.runs.lock().unwrap();
        assert!(!runs[0].2.is_current());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_cycle_supersedes_older_guard() {
        let (mut tracker, runner) = tracker();

        tracker.handle(DocumentEvent::Opened {
            uri: URI.to_owned(),
            text: "v1".to_owned(),
        });
        tracker.handle(DocumentEvent::Saved {
            uri: URI.to_owned(),
            text: Some("v2".to_owned()),
        });
        tokio::time::sleep(Duration::from_millis(1)).await;

        let runs = runner.runs.lock().unwrap();
        assert_eq!(runs.len(), 2);
        let (first, second): (Vec<_>, Vec<_>) =
            runs.iter().partition(|(_, text, _)| text == "v1");
        assert!(!first[0].2.is_current());
        assert!(second[0].2.is_current());
    }

    #[tokio::test(start_paused = true)]
    async fn timers_are_per_uri() {
        let (mut tracker, runner) = tracker();
        let other = "file:///lib/go.mod";

        tracker.handle(changed("a"));
        tokio::time::sleep(Duration::from_millis(300)).await;
        tracker.handle(DocumentEvent::Changed {
            uri: other.to_owned(),
            text: "b".to_owned(),
        });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(runner.texts(), vec!["a"]);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let mut texts = runner.texts();
        texts.sort();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn save_of_unknown_document_without_text_is_ignored() {
        let (mut tracker, runner) = tracker();
        tracker.handle(DocumentEvent::Saved {
            uri: URI.to_owned(),
            text: None,
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(runner.texts().is_empty());
        assert_eq!(tracker.open_documents(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_stops_on_cancel() {
        let (tracker, runner) = tracker();
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tracker.run(rx, cancel.clone()));

        tx.send(DocumentEvent::Opened {
            uri: URI.to_owned(),
            text: "x".to_owned(),
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(runner.texts(), vec!["x"]);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn event_uri_accessor() {
        let e = DocumentEvent::Closed {
            uri: "file:///x".to_owned(),
        };
        assert_eq!(e.uri(), "file:///x");
    }
}
