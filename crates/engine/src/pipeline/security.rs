//! 보안 권고 엔진
//!
//! 취약점 또는 보안 권고가 있는 의존성마다 버전 범위에 진단을 하나 붙이고,
//! 레코드에 권장 버전이 있으면 "Switch to recommended version" 빠른 수정을 등록합니다.
//! 심각도는 레코드의 `highest_severity`에서 결정됩니다.

use std::fmt::Write as _;

use vulnlens_core::types::{CodeAction, Dependency, Diagnostic, DiagnosticSeverity, TextEdit};

use crate::error::EngineError;
use crate::pipeline::{Engine, EngineOutput, TotalCount};
use crate::record::VulnerabilityRecord;

/// 진단 source 필드 값
pub const DIAGNOSTIC_SOURCE: &str = "vulnlens";

/// 보안 권고 엔진
pub struct SecurityEngine;

impl SecurityEngine {
    fn severity(record: &VulnerabilityRecord) -> DiagnosticSeverity {
        match record
            .highest_severity
            .as_deref()
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("critical" | "high") => DiagnosticSeverity::Error,
            Some("low") => DiagnosticSeverity::Information,
            _ => DiagnosticSeverity::Warning,
        }
    }

    fn message(dependency: &Dependency, record: &VulnerabilityRecord) -> String {
        let mut msg = format!("{}@{}", dependency.name.value, dependency.version.value);
        let vulns = record.vulnerability_count();
        let advisories = record.advisory_count();
        if vulns > 0 {
            let _ = write!(msg, "\nKnown security vulnerabilities: {vulns}");
        }
        if advisories > 0 {
            let _ = write!(msg, "\nSecurity advisories: {advisories}");
        }
        if record.exploitable_vulnerabilities_count > 0 {
            let _ = write!(
                msg,
                "\nExploitable vulnerabilities: {}",
                record.exploitable_vulnerabilities_count
            );
        }
        if let Some(severity) = &record.highest_severity {
            let _ = write!(msg, "\nHighest severity: {}", severity.to_ascii_uppercase());
        }
        if let Some(recommended) = Self::recommendation(dependency, record) {
            let _ = write!(msg, "\nRecommendation: {recommended}");
        }
        msg
    }

    /// 현재 버전과 다른 비어 있지 않은 권장 버전
    fn recommendation<'a>(
        dependency: &Dependency,
        record: &'a VulnerabilityRecord,
    ) -> Option<&'a str> {
        record
            .recommended_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != dependency.version.value)
    }
}

impl Engine for SecurityEngine {
    fn name(&self) -> &str {
        "security"
    }

    fn analyze(
        &self,
        dependency: &Dependency,
        record: &VulnerabilityRecord,
        out: &mut EngineOutput,
    ) -> Result<(), EngineError> {
        if record.package_unknown || !record.has_findings() {
            return Ok(());
        }

        let diagnostic = Diagnostic {
            range: dependency.version.range,
            severity: Self::severity(record),
            source: DIAGNOSTIC_SOURCE.to_owned(),
            code: record
                .vulnerability
                .iter()
                .chain(record.advisory.iter())
                .map(|a| a.id.clone())
                .find(|id| !id.is_empty()),
            message: Self::message(dependency, record),
        };

        out.count(TotalCount {
            vulnerability_count: record.vulnerability_count(),
            advisory_count: record.advisory_count(),
            exploit_count: record.exploitable_vulnerabilities_count,
        });

        if let Some(recommended) = Self::recommendation(dependency, record) {
            out.register_action(
                diagnostic.range,
                CodeAction {
                    title: format!("Switch to recommended version {recommended}"),
                    edits: vec![TextEdit {
                        range: dependency.version.range,
                        new_text: recommended.to_owned(),
                    }],
                    diagnostic: diagnostic.clone(),
                },
            );
        }

        out.push_diagnostic(diagnostic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CycleState;
    use crate::pipeline::DiagnosticsPipeline;
    use crate::record::Advisory;
    use vulnlens_core::types::{Range, Spanned};

    fn lodash() -> Dependency {
        Dependency::new(
            Spanned::new("lodash", Range::on_line(5, 5, 11)),
            Spanned::new("4.17.20", Range::on_line(5, 15, 22)),
        )
    }

    fn advisory(id: &str) -> Advisory {
        Advisory {
            id: id.to_owned(),
            ..Default::default()
        }
    }

    fn run(record: &VulnerabilityRecord) -> CycleState {
        let pipeline = DiagnosticsPipeline::with_default_engines();
        let mut state = CycleState::default();
        pipeline.run(&lodash(), record, &mut state);
        state
    }

    #[test]
    fn clean_record_produces_nothing() {
        let state = run(&VulnerabilityRecord {
            package: "lodash".to_owned(),
            version: "4.17.20".to_owned(),
            ..Default::default()
        });
        assert!(state.diagnostics.is_empty());
        assert_eq!(state.counts, TotalCount::default());
    }

    #[test]
    fn unknown_package_produces_nothing() {
        let state = run(&VulnerabilityRecord {
            package_unknown: true,
            vulnerability: vec![advisory("CVE-1")],
            ..Default::default()
        });
        assert!(state.diagnostics.is_empty());
    }

    #[test]
    fn vulnerable_record_anchors_at_version_range() {
        let state = run(&VulnerabilityRecord {
            package: "lodash".to_owned(),
            version: "4.17.20".to_owned(),
            vulnerability: vec![advisory("CVE-2021-23337"), advisory("CVE-2020-28500")],
            advisory: vec![advisory("SNYK-1")],
            exploitable_vulnerabilities_count: 1,
            highest_severity: Some("high".to_owned()),
            recommended_version: Some("4.17.21".to_owned()),
            ..Default::default()
        });

        assert_eq!(state.diagnostics.len(), 1);
        let d = &state.diagnostics[0];
        assert_eq!(d.range, Range::on_line(5, 15, 22));
        assert_eq!(d.severity, DiagnosticSeverity::Error);
        assert_eq!(d.source, "vulnlens");
        assert_eq!(d.code.as_deref(), Some("CVE-2021-23337"));
        assert!(d.message.starts_with("lodash@4.17.20"));
        assert!(d.message.contains("Known security vulnerabilities: 2"));
        assert!(d.message.contains("Security advisories: 1"));
        assert!(d.message.contains("Exploitable vulnerabilities: 1"));
        assert!(d.message.contains("Recommendation: 4.17.21"));

        assert_eq!(
            state.counts,
            TotalCount {
                vulnerability_count: 2,
                advisory_count: 1,
                exploit_count: 1,
            }
        );
    }

    #[test]
    fn quick_fix_replaces_version_text() {
        let state = run(&VulnerabilityRecord {
            vulnerability: vec![advisory("CVE-1")],
            recommended_version: Some("4.17.21".to_owned()),
            ..Default::default()
        });

        let actions = state.code_actions.lookup(&Range::on_line(5, 15, 22));
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].title, "Switch to recommended version 4.17.21");
        assert_eq!(actions[0].edits[0].new_text, "4.17.21");
        assert_eq!(actions[0].edits[0].range, Range::on_line(5, 15, 22));
        assert_eq!(actions[0].diagnostic, state.diagnostics[0]);
    }

    #[test]
    fn no_quick_fix_without_different_recommendation() {
        let same = run(&VulnerabilityRecord {
            advisory: vec![advisory("A-1")],
            recommended_version: Some("4.17.20".to_owned()),
            ..Default::default()
        });
        assert_eq!(same.diagnostics.len(), 1);
        assert!(same.code_actions.is_empty());

        let none = run(&VulnerabilityRecord {
            advisory: vec![advisory("A-1")],
            ..Default::default()
        });
        assert!(none.code_actions.is_empty());
    }

    #[test]
    fn severity_mapping() {
        let with = |s: Option<&str>| VulnerabilityRecord {
            highest_severity: s.map(str::to_owned),
            ..Default::default()
        };
        assert_eq!(
            SecurityEngine::severity(&with(Some("CRITICAL"))),
            DiagnosticSeverity::Error
        );
        assert_eq!(
            SecurityEngine::severity(&with(Some("medium"))),
            DiagnosticSeverity::Warning
        );
        assert_eq!(
            SecurityEngine::severity(&with(Some("low"))),
            DiagnosticSeverity::Information
        );
        assert_eq!(SecurityEngine::severity(&with(None)), DiagnosticSeverity::Warning);
    }
}
