//! 버전 유효성 필터
//!
//! 조회할 만큼 형식이 올바른 의존성만 통과시킵니다.
//! npm, maven, pypi는 점으로 구분된 최대 네 개의 영숫자 세그먼트만 허용하고,
//! golang은 모듈 버전 해석을 aggregator에 맡기므로 구조 필터를 적용하지 않습니다.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use vulnlens_core::types::{Dependency, Ecosystem};

/// `1`, `1.2`, `1.2.3`, `1.2.3.Final` 형태
static PLAIN_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]+(\.[A-Za-z0-9]+){0,3}$").expect("valid regex")
});

/// 버전 문자열이 조회 가능한 형식인지 확인합니다.
pub fn is_valid_version(ecosystem: Ecosystem, version: &str) -> bool {
    if !ecosystem.uses_plain_versions() {
        return true;
    }
    PLAIN_VERSION_RE.is_match(version)
}

/// 유효하지 않은 버전을 가진 의존성을 조용히 제외합니다.
pub fn filter_valid(ecosystem: Ecosystem, dependencies: Vec<Dependency>) -> Vec<Dependency> {
    let before = dependencies.len();
    let valid: Vec<Dependency> = dependencies
        .into_iter()
        .filter(|dep| is_valid_version(ecosystem, &dep.version.value))
        .collect();
    if valid.len() != before {
        debug!(
            ecosystem = %ecosystem,
            excluded = before - valid.len(),
            "dependencies with unsupported versions excluded"
        );
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use vulnlens_core::types::{Range, Spanned};

    fn dep(name: &str, version: &str) -> Dependency {
        Dependency::new(
            Spanned::new(name, Range::on_line(0, 0, 1)),
            Spanned::new(version, Range::on_line(0, 2, 3)),
        )
    }

    #[test]
    fn accepts_up_to_four_segments() {
        for v in ["1", "1.2", "1.2.3", "1.2.3.4", "2.5.1.Final", "4.17.21"] {
            assert!(is_valid_version(Ecosystem::Npm, v), "{v} should be valid");
        }
    }

    #[test]
    fn rejects_ranges_and_malformed_versions() {
        for v in [
            "",
            "^1.2.3",
            "~1.2",
            ">=1.0",
            "1.2.3.4.5",
            "1..2",
            "1.2.",
            "1.0.0-beta.1",
            "*",
            "1.x || 2.x",
        ] {
            assert!(!is_valid_version(Ecosystem::Maven, v), "{v} should be rejected");
        }
    }

    #[test]
    fn single_alphanumeric_segment_is_accepted() {
        assert!(is_valid_version(Ecosystem::Npm, "latest"));
    }

    #[test]
    fn golang_has_no_structural_filter() {
        assert!(is_valid_version(
            Ecosystem::Golang,
            "v0.0.0-20210101000000-abcdefabcdef"
        ));
        assert!(is_valid_version(Ecosystem::Golang, "v2.0.0+incompatible"));
    }

    #[test]
    fn filter_valid_preserves_order() {
        let deps = vec![
            dep("a", "1.0.0"),
            dep("b", "^2.0.0"),
            dep("c", "3.1"),
            dep("d", "1.0.0-rc1"),
        ];
        let valid = filter_valid(Ecosystem::Pypi, deps);
        let names: Vec<&str> = valid.iter().map(|d| d.name.value.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }
}
