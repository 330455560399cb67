//! 요약 알림 문구
//!
//! 사이클이 끝나면 `(의존성 수, 진단, 집계)`로 진행 알림 문구를 만듭니다.
//!
//! ```text
//! Scanned 3 dependencies, flagged 1 Known Security Vulnerability and 1 Security Advisory
//!     with 1 Exploitable Vulnerability along with quick fixes
//! ```

use vulnlens_core::types::Diagnostic;

use crate::pipeline::TotalCount;

const NOTHING_FOUND: &str = ", No potential security vulnerabilities found";

fn plural(count: u32, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// 요약 문구를 만듭니다.
pub fn build_summary(
    dependency_count: usize,
    diagnostics: &[Diagnostic],
    counts: &TotalCount,
) -> String {
    let mut message = if dependency_count == 1 {
        "Scanned 1 dependency".to_owned()
    } else {
        format!("Scanned {dependency_count} dependencies")
    };

    if diagnostics.is_empty() {
        message.push_str(NOTHING_FOUND);
        return message;
    }

    let mut flagged = Vec::with_capacity(2);
    if counts.vulnerability_count > 0 {
        flagged.push(plural(
            counts.vulnerability_count,
            "Known Security Vulnerability",
            "Known Security Vulnerabilities",
        ));
    }
    if counts.advisory_count > 0 {
        flagged.push(plural(
            counts.advisory_count,
            "Security Advisory",
            "Security Advisories",
        ));
    }
    // 진단은 있으나 집계할 항목이 없는 경우
    if flagged.is_empty() {
        message.push_str(NOTHING_FOUND);
        return message;
    }
    message.push_str(", flagged ");
    message.push_str(&flagged.join(" and "));

    if counts.exploit_count > 0 {
        message.push_str(" with ");
        message.push_str(&plural(
            counts.exploit_count,
            "Exploitable Vulnerability",
            "Exploitable Vulnerabilities",
        ));
    }

    if counts.findings() > 0 {
        message.push_str(" along with quick fixes");
    }

    message
}
