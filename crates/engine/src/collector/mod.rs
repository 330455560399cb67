//! 매니페스트 수집기 -- package.json, requirements.txt, go.mod
//!
//! [`Collector`] 구현체는 매니페스트 전체 텍스트에서 의존성 선언과
//! 그 원본 위치(이름 범위, 버전 범위)를 추출합니다.
//! [`CollectorRegistry`]는 파일명으로 수집기를 선택합니다.
//!
//! # 지원 형식
//!
//! - `package.json` (JSON) -- [`NpmCollector`]
//! - `requirements.txt` -- [`PypiCollector`]
//! - `go.mod` -- [`GolangCollector`]
//!
//! # 위치 규칙
//!
//! 줄과 문자 오프셋은 0부터 시작하며, 문자 오프셋은 에디터 프로토콜과 같이
//! UTF-16 코드 유닛 단위입니다. 에러 메시지의 줄 번호만 1부터 시작합니다.
//!
//! # 확장
//!
//! 새로운 형식을 지원하려면 `Collector` trait을 구현하고
//! `CollectorRegistry`에 등록합니다.

pub mod golang;
pub mod npm;
pub mod pypi;

use vulnlens_core::pipeline::Collector;
use vulnlens_core::types::{Position, Range};

pub use golang::GolangCollector;
pub use npm::NpmCollector;
pub use pypi::PypiCollector;

/// 파일명 -> 수집기 레지스트리
pub struct CollectorRegistry {
    collectors: Vec<Box<dyn Collector>>,
}

impl CollectorRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self {
            collectors: Vec::new(),
        }
    }

    /// 기본 수집기(npm, pypi, golang)로 레지스트리를 생성합니다.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(NpmCollector));
        registry.register(Box::new(PypiCollector));
        registry.register(Box::new(GolangCollector));
        registry
    }

    /// 수집기를 등록합니다. 먼저 등록된 수집기가 우선합니다.
    pub fn register(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    /// 파일명을 처리할 수 있는 수집기를 찾습니다.
    pub fn find(&self, file_name: &str) -> Option<&dyn Collector> {
        self.collectors
            .iter()
            .find(|c| c.can_collect(file_name))
            .map(Box::as_ref)
    }

    /// URI 또는 경로의 마지막 구성 요소로 수집기를 찾습니다.
    pub fn for_uri(&self, uri: &str) -> Option<&dyn Collector> {
        self.find(file_name_of(uri))
    }

    /// 지원하는 매니페스트 파일명 목록
    pub fn manifest_names(&self) -> Vec<&str> {
        self.collectors.iter().map(|c| c.manifest_name()).collect()
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// URI/경로에서 파일명 부분을 추출합니다 (쿼리와 프래그먼트 제외).
pub fn file_name_of(uri: &str) -> &str {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// 바이트 오프셋까지의 UTF-16 코드 유닛 수
pub(crate) fn utf16_len(s: &str) -> u32 {
    u32::try_from(s.encode_utf16().count()).unwrap_or(u32::MAX)
}

/// 한 줄 안의 바이트 구간을 범위로 변환합니다.
pub(crate) fn line_range(line_no: usize, line: &str, start: usize, end: usize) -> Range {
    let line_no = u32::try_from(line_no).unwrap_or(u32::MAX);
    Range::on_line(
        line_no,
        utf16_len(&line[..start]),
        utf16_len(&line[..end]),
    )
}

/// 전체 텍스트의 바이트 오프셋을 위치로 변환합니다.
pub(crate) fn position_at(text: &str, offset: usize) -> Position {
    let before = &text[..offset];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    Position::new(
        u32::try_from(line).unwrap_or(u32::MAX),
        utf16_len(&before[line_start..]),
    )
}
