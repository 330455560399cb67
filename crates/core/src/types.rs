//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 모든 모듈이 공유하는 데이터 구조를 정의합니다.
//! 수집기(collector)가 만든 의존성 레코드, 에디터로 전달되는 진단과
//! 빠른 수정(quick fix) 액션이 여기에 속합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 패키지 생태계 (패키지 관리자)
///
/// 생태계마다 버전 문법과 해석 규칙이 다르며, 캐시 네임스페이스와
/// 원격 API 요청의 `ecosystem` 필드를 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// JavaScript/TypeScript (package.json)
    Npm,
    /// Java (pom.xml)
    Maven,
    /// Python (requirements.txt)
    Pypi,
    /// Go (go.mod)
    Golang,
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Ecosystem {
    /// 원격 API와 캐시 네임스페이스에 사용하는 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Maven => "maven",
            Self::Pypi => "pypi",
            Self::Golang => "golang",
        }
    }

    /// 문자열에서 생태계를 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "npm" | "node" | "javascript" | "js" => Some(Self::Npm),
            "maven" | "java" => Some(Self::Maven),
            "pypi" | "pip" | "python" => Some(Self::Pypi),
            "golang" | "go" => Some(Self::Golang),
            _ => None,
        }
    }

    /// 구조적 버전 필터를 적용하는 생태계인지 반환합니다.
    ///
    /// golang은 모듈 버전 해석을 aggregator에 위임하므로 필터를 적용하지 않습니다.
    pub fn uses_plain_versions(&self) -> bool {
        !matches!(self, Self::Golang)
    }
}

/// 텍스트 위치 (0부터 시작하는 줄/문자 오프셋)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// 줄 번호
    pub line: u32,
    /// 줄 내 문자 오프셋
    pub character: u32,
}

impl Position {
    /// 새 위치를 생성합니다.
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// 텍스트 범위 (`start` 포함, `end` 미포함)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Range {
    /// 시작 위치
    pub start: Position,
    /// 끝 위치
    pub end: Position,
}

impl Range {
    /// 새 범위를 생성합니다.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// 한 줄 안의 범위를 생성합니다.
    pub fn on_line(line: u32, start_char: u32, end_char: u32) -> Self {
        Self {
            start: Position::new(line, start_char),
            end: Position::new(line, end_char),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.character, self.end.line, self.end.character
        )
    }
}

/// 원본 텍스트 위치를 함께 가진 값
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spanned {
    /// 값 (패키지 이름 또는 버전 문자열)
    pub value: String,
    /// 원본 텍스트 내 범위
    pub range: Range,
}

impl Spanned {
    /// 새 값을 생성합니다.
    pub fn new(value: impl Into<String>, range: Range) -> Self {
        Self {
            value: value.into(),
            range,
        }
    }
}

/// 매니페스트에 선언된 단일 의존성
///
/// 수집기가 생성하며, 하나의 분석 사이클 동안만 유지됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// 패키지 이름과 위치
    pub name: Spanned,
    /// 선언된 버전과 위치
    pub version: Spanned,
}

impl Dependency {
    /// 새 의존성을 생성합니다.
    pub fn new(name: Spanned, version: Spanned) -> Self {
        Self { name, version }
    }

    /// 캐시/조회 단위인 `(name, version)` 식별자를 반환합니다.
    pub fn identity(&self) -> DependencyIdentity {
        DependencyIdentity::new(&self.name.value, &self.version.value)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name.value, self.version.value)
    }
}

/// 의존성 식별자 — 캐시 키이자 원격 조회 단위
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyIdentity {
    /// 패키지 이름
    pub name: String,
    /// 버전
    pub version: String,
}

impl DependencyIdentity {
    /// 새 식별자를 생성합니다.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for DependencyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// 진단 심각도 (에디터 표시 수준)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Information => write!(f, "information"),
            Self::Hint => write!(f, "hint"),
        }
    }
}

/// 에디터에 표시되는 진단
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 진단이 고정되는 범위
    pub range: Range,
    /// 심각도
    pub severity: DiagnosticSeverity,
    /// 진단을 생성한 엔진 이름
    pub source: String,
    /// 진단 코드 (예: 패키지 식별자)
    pub code: Option<String>,
    /// 사용자에게 표시할 메시지
    pub message: String,
}

/// 단일 텍스트 치환
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    /// 치환 대상 범위
    pub range: Range,
    /// 새 텍스트
    pub new_text: String,
}

/// 빠른 수정 액션
///
/// 진단 범위를 키로 하여 `CodeActionIndex`에 등록됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeAction {
    /// 액션 제목
    pub title: String,
    /// 적용할 편집 목록
    pub edits: Vec<TextEdit>,
    /// 이 액션이 해결하는 진단
    pub diagnostic: Diagnostic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecosystem_display_matches_api_name() {
        assert_eq!(Ecosystem::Npm.to_string(), "npm");
        assert_eq!(Ecosystem::Maven.to_string(), "maven");
        assert_eq!(Ecosystem::Pypi.to_string(), "pypi");
        assert_eq!(Ecosystem::Golang.to_string(), "golang");
    }

    #[test]
    fn ecosystem_from_str_loose() {
        assert_eq!(Ecosystem::from_str_loose("GO"), Some(Ecosystem::Golang));
        assert_eq!(Ecosystem::from_str_loose("python"), Some(Ecosystem::Pypi));
        assert_eq!(Ecosystem::from_str_loose("cargo"), None);
    }

    #[test]
    fn ecosystem_serializes_lowercase() {
        let json = serde_json::to_string(&Ecosystem::Golang).unwrap();
        assert_eq!(json, "\"golang\"");
    }

    #[test]
    fn only_golang_skips_plain_version_filter() {
        assert!(Ecosystem::Npm.uses_plain_versions());
        assert!(Ecosystem::Maven.uses_plain_versions());
        assert!(Ecosystem::Pypi.uses_plain_versions());
        assert!(!Ecosystem::Golang.uses_plain_versions());
    }

    #[test]
    fn dependency_identity_ignores_positions() {
        let a = Dependency::new(
            Spanned::new("lodash", Range::on_line(1, 4, 10)),
            Spanned::new("4.17.20", Range::on_line(1, 14, 21)),
        );
        let b = Dependency::new(
            Spanned::new("lodash", Range::on_line(7, 4, 10)),
            Spanned::new("4.17.20", Range::on_line(7, 14, 21)),
        );
        assert_ne!(a, b);
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn range_display() {
        let range = Range::on_line(3, 2, 9);
        assert_eq!(range.to_string(), "3:2-3:9");
    }
}
