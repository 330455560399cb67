//! 진단 파이프라인 -- (의존성, 취약점 레코드) -> 진단, 빠른 수정, 집계
//!
//! [`DiagnosticsPipeline`]은 순서가 있는 [`Engine`] 목록을 보유합니다.
//! 각 엔진은 의존성 하나에 대해
//!
//! - 버전 범위에 고정된 진단을 추가하고
//! - 진단 범위를 키로 빠른 수정을 등록하고
//! - 사이클 공유 집계([`TotalCount`])를 증가시킬 수 있습니다.
//!
//! 엔진 출력은 임시 버퍼([`EngineOutput`])에 모았다가 성공 시에만
//! [`CycleState`]에 합칩니다. 한 엔진이 한 의존성에서 실패해도
//! 다른 엔진과 다른 의존성 처리는 계속됩니다.

pub mod security;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use vulnlens_core::types::{CodeAction, Dependency, Diagnostic, Range};

use crate::error::EngineError;
use crate::record::VulnerabilityRecord;

pub use security::SecurityEngine;

/// 사이클 단위 취약점 집계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalCount {
    /// 알려진 보안 취약점 수
    pub vulnerability_count: u32,
    /// 보안 권고 수
    pub advisory_count: u32,
    /// 악용 가능한 취약점 수
    pub exploit_count: u32,
}

impl TotalCount {
    /// 다른 집계를 더합니다.
    pub fn add(&mut self, other: TotalCount) {
        self.vulnerability_count = self
            .vulnerability_count
            .saturating_add(other.vulnerability_count);
        self.advisory_count = self.advisory_count.saturating_add(other.advisory_count);
        self.exploit_count = self.exploit_count.saturating_add(other.exploit_count);
    }

    /// 취약점 + 권고 수
    pub fn findings(&self) -> u32 {
        self.vulnerability_count.saturating_add(self.advisory_count)
    }
}

/// 진단 범위 -> 빠른 수정 색인
///
/// 가장 최근에 게시된 진단 집합에 대해서만 유효합니다.
#[derive(Debug, Clone, Default)]
pub struct CodeActionIndex {
    actions: HashMap<Range, Vec<CodeAction>>,
}

impl CodeActionIndex {
    /// 빠른 수정을 등록합니다.
    pub fn insert(&mut self, anchor: Range, action: CodeAction) {
        self.actions.entry(anchor).or_default().push(action);
    }

    /// 범위와 겹치는 모든 빠른 수정을 반환합니다.
    pub fn lookup(&self, range: &Range) -> Vec<CodeAction> {
        let mut found: Vec<(&Range, &Vec<CodeAction>)> = self
            .actions
            .iter()
            .filter(|(anchor, _)| anchor.start <= range.end && range.start <= anchor.end)
            .collect();
        found.sort_by_key(|(anchor, _)| **anchor);
        found
            .into_iter()
            .flat_map(|(_, actions)| actions.iter().cloned())
            .collect()
    }

    /// 등록된 빠른 수정 수
    pub fn len(&self) -> usize {
        self.actions.values().map(Vec::len).sum()
    }

    /// 비어 있는지
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn merge(&mut self, entries: Vec<(Range, CodeAction)>) {
        for (anchor, action) in entries {
            self.insert(anchor, action);
        }
    }
}

/// 사이클 하나가 소유하는 진단 상태
///
/// 사이클 시작 시 비어 있는 상태로 만들어지고, 단계가 끝날 때마다 게시됩니다.
#[derive(Debug, Clone, Default)]
pub struct CycleState {
    /// 지금까지 완료된 배치의 진단 합집합
    pub diagnostics: Vec<Diagnostic>,
    /// 빠른 수정 색인
    pub code_actions: CodeActionIndex,
    /// 누적 집계
    pub counts: TotalCount,
}

/// 엔진 하나의 의존성 단위 출력 버퍼
#[derive(Debug, Default)]
pub struct EngineOutput {
    diagnostics: Vec<Diagnostic>,
    actions: Vec<(Range, CodeAction)>,
    counts: TotalCount,
}

impl EngineOutput {
    /// 진단을 추가합니다.
    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 진단 범위를 키로 빠른 수정을 등록합니다.
    pub fn register_action(&mut self, anchor: Range, action: CodeAction) {
        self.actions.push((anchor, action));
    }

    /// 집계를 증가시킵니다.
    pub fn count(&mut self, counts: TotalCount) {
        self.counts.add(counts);
    }
}

/// 진단 엔진 trait
///
/// 새로운 분석을 추가하려면 이 trait을 구현하고 파이프라인에 등록합니다.
pub trait Engine: Send + Sync {
    /// 엔진 이름
    fn name(&self) -> &str;

    /// 의존성 하나와 해당 레코드를 분석합니다.
    fn analyze(
        &self,
        dependency: &Dependency,
        record: &VulnerabilityRecord,
        out: &mut EngineOutput,
    ) -> Result<(), EngineError>;
}

/// 순서가 있는 진단 엔진 목록
pub struct DiagnosticsPipeline {
    engines: Vec<Box<dyn Engine>>,
}

impl DiagnosticsPipeline {
    /// 엔진 목록으로 파이프라인을 생성합니다.
    pub fn new(engines: Vec<Box<dyn Engine>>) -> Self {
        Self { engines }
    }

    /// 기본 엔진(보안 권고)으로 파이프라인을 생성합니다.
    pub fn with_default_engines() -> Self {
        Self::new(vec![Box::new(SecurityEngine)])
    }

    /// 등록된 엔진 이름 목록
    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// 의존성 하나를 모든 엔진에 통과시키고 결과를 `state`에 합칩니다.
    pub fn run(
        &self,
        dependency: &Dependency,
        record: &VulnerabilityRecord,
        state: &mut CycleState,
    ) {
        for engine in &self.engines {
            let mut out = EngineOutput::default();
            match engine.analyze(dependency, record, &mut out) {
                Ok(()) => {
                    state.diagnostics.append(&mut out.diagnostics);
                    state.code_actions.merge(out.actions);
                    state.counts.add(out.counts);
                }
                Err(e) => {
                    warn!(
                        engine = engine.name(),
                        dependency = %dependency,
                        error = %e,
                        "engine failed on dependency, skipping"
                    );
                }
            }
        }
    }
}

impl Default for DiagnosticsPipeline {
    fn default() -> Self {
        Self::with_default_engines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vulnlens_core::types::{DiagnosticSeverity, Spanned, TextEdit};

    fn dep(name: &str, version: &str, line: u32) -> Dependency {
        Dependency::new(
            Spanned::new(name, Range::on_line(line, 4, 4 + name.len() as u32)),
            Spanned::new(version, Range::on_line(line, 20, 20 + version.len() as u32)),
        )
    }

    fn diag(range: Range, message: &str) -> Diagnostic {
        Diagnostic {
            range,
            severity: DiagnosticSeverity::Warning,
            source: "test".to_owned(),
            code: None,
            message: message.to_owned(),
        }
    }

    /// 이름이 "bad"인 의존성에서 실패하기 전에 진단을 하나 남기는 엔진
    struct FlakyEngine;

    impl Engine for FlakyEngine {
        fn name(&self) -> &str {
            "flaky"
        }

        fn analyze(
            &self,
            dependency: &Dependency,
            _record: &VulnerabilityRecord,
            out: &mut EngineOutput,
        ) -> Result<(), EngineError> {
            out.push_diagnostic(diag(dependency.version.range, "flaky"));
            if dependency.name.value == "bad" {
                return Err(EngineError::Engine {
                    engine: "flaky".to_owned(),
                    reason: "cannot handle".to_owned(),
                });
            }
            out.count(TotalCount {
                vulnerability_count: 1,
                ..Default::default()
            });
            Ok(())
        }
    }

    /// 항상 진단 하나와 빠른 수정 하나를 남기는 엔진
    struct AlwaysEngine;

    impl Engine for AlwaysEngine {
        fn name(&self) -> &str {
            "always"
        }

        fn analyze(
            &self,
            dependency: &Dependency,
            _record: &VulnerabilityRecord,
            out: &mut EngineOutput,
        ) -> Result<(), EngineError> {
            let d = diag(dependency.version.range, "always");
            out.register_action(
                dependency.version.range,
                CodeAction {
                    title: "fix".to_owned(),
                    edits: vec![TextEdit {
                        range: dependency.version.range,
                        new_text: "9.9.9".to_owned(),
                    }],
                    diagnostic: d.clone(),
                },
            );
            out.push_diagnostic(d);
            Ok(())
        }
    }

    #[test]
    fn engine_error_is_isolated_per_dependency() {
        let pipeline =
            DiagnosticsPipeline::new(vec![Box::new(FlakyEngine), Box::new(AlwaysEngine)]);
        let record = VulnerabilityRecord::default();
        let mut state = CycleState::default();

        pipeline.run(&dep("bad", "1.0.0", 0), &record, &mut state);
        pipeline.run(&dep("good", "1.0.0", 1), &record, &mut state);

        // bad: flaky 출력 폐기, always 유지 / good: 둘 다 유지
        let messages: Vec<&str> = state.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["always", "flaky", "always"]);
        assert_eq!(state.counts.vulnerability_count, 1);
        assert_eq!(state.code_actions.len(), 2);
    }

    #[test]
    fn code_action_lookup_matches_overlapping_ranges() {
        let mut index = CodeActionIndex::default();
        let anchor = Range::on_line(3, 10, 17);
        index.insert(
            anchor,
            CodeAction {
                title: "fix".to_owned(),
                edits: vec![],
                diagnostic: diag(anchor, "x"),
            },
        );

        assert_eq!(index.lookup(&anchor).len(), 1);
        assert_eq!(index.lookup(&Range::on_line(3, 12, 12)).len(), 1);
        assert!(index.lookup(&Range::on_line(4, 12, 12)).is_empty());
        assert!(index.lookup(&Range::on_line(3, 0, 5)).is_empty());
    }

    #[test]
    fn total_count_add_and_findings() {
        let mut total = TotalCount::default();
        total.add(TotalCount {
            vulnerability_count: 2,
            advisory_count: 1,
            exploit_count: 1,
        });
        total.add(TotalCount {
            vulnerability_count: 1,
            advisory_count: 0,
            exploit_count: 0,
        });
        assert_eq!(total.vulnerability_count, 3);
        assert_eq!(total.findings(), 4);
        assert_eq!(total.exploit_count, 1);
    }

    #[test]
    fn default_pipeline_has_security_engine() {
        let pipeline = DiagnosticsPipeline::default();
        assert_eq!(pipeline.engine_names(), vec!["security"]);
    }
}
