//! 파이프라인 trait — 모듈 확장 포인트 정의

use crate::error::ParseError;
use crate::types::{Dependency, Ecosystem};

/// 매니페스트 수집기 trait
///
/// 새로운 매니페스트 형식을 지원하려면 이 trait을 구현합니다.
/// 파싱 실패는 진단이 아닌 에러 알림으로 전달되므로,
/// 구현체는 부분 결과를 반환하지 말고 에러를 반환해야 합니다.
pub trait Collector: Send + Sync {
    /// 수집기가 담당하는 생태계
    fn ecosystem(&self) -> Ecosystem;

    /// 지원하는 매니페스트 파일명 (예: `package.json`)
    fn manifest_name(&self) -> &str;

    /// 주어진 파일명을 처리할 수 있는지 확인
    fn can_collect(&self, file_name: &str) -> bool {
        file_name == self.manifest_name()
    }

    /// 매니페스트 전체 텍스트에서 의존성 목록을 추출
    fn collect(&self, text: &str) -> Result<Vec<Dependency>, ParseError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Range, Spanned};

    struct FixedCollector;

    impl Collector for FixedCollector {
        fn ecosystem(&self) -> Ecosystem {
            Ecosystem::Npm
        }

        fn manifest_name(&self) -> &str {
            "package.json"
        }

        fn collect(&self, text: &str) -> Result<Vec<Dependency>, ParseError> {
            if text.is_empty() {
                return Err(ParseError::Failed {
                    line: 0,
                    reason: "empty manifest".to_owned(),
                });
            }
            Ok(vec![Dependency::new(
                Spanned::new("lodash", Range::on_line(0, 0, 6)),
                Spanned::new("4.17.20", Range::on_line(0, 7, 14)),
            )])
        }
    }

    #[test]
    fn default_can_collect_matches_manifest_name() {
        let c = FixedCollector;
        assert!(c.can_collect("package.json"));
        assert!(!c.can_collect("package-lock.json"));
    }

    #[test]
    fn collector_is_object_safe() {
        let boxed: Box<dyn Collector> = Box::new(FixedCollector);
        assert_eq!(boxed.ecosystem(), Ecosystem::Npm);
        assert_eq!(boxed.collect("x").unwrap().len(), 1);
        assert!(boxed.collect("").is_err());
    }
}
