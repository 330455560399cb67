//! requirements.txt 수집기
//!
//! [`PypiCollector`]는 `name==version` 형태로 고정된 요구사항만 의존성으로 추출합니다.
//!
//! - 빈 줄, 주석(`#`), 옵션 줄(`-r`, `--index-url` 등)은 무시
//! - extras(`name[extra]==1.0`)와 환경 마커(`; python_version < "3.8"`) 허용
//! - `>=` 등 고정되지 않은 요구사항은 건너뜀
//! - 요구사항으로 해석할 수 없는 줄은 [`ParseError::Failed`]

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use vulnlens_core::error::ParseError;
use vulnlens_core::pipeline::Collector;
use vulnlens_core::types::{Dependency, Ecosystem, Spanned};

use super::line_range;

/// requirements.txt 수집기
pub struct PypiCollector;

/// 요구사항 한 줄: 이름, 선택적 extras, 나머지
static REQUIREMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[[^\]]*\])?\s*(?P<rest>.*)$")
        .expect("valid regex")
});

/// `==version` 고정 지정자
static PINNED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^==\s*(?P<version>[^\s;,#\\]+)").expect("valid regex"));

impl Collector for PypiCollector {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Pypi
    }

    fn manifest_name(&self) -> &str {
        "requirements.txt"
    }

    fn collect(&self, text: &str) -> Result<Vec<Dependency>, ParseError> {
        let mut dependencies = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let content = line.split('#').next().unwrap_or_default();
            let leading = content.len() - content.trim_start().len();
            let requirement = content.trim();
            if requirement.is_empty() || requirement.starts_with('-') {
                continue;
            }

            let caps = REQUIREMENT_RE
                .captures(requirement)
                .ok_or_else(|| failed(line_no, "expected a requirement specifier"))?;
            let (Some(name), Some(rest)) = (caps.name("name"), caps.name("rest")) else {
                return Err(failed(line_no, "expected a requirement specifier"));
            };

            let rest_str = rest.as_str();
            if !rest_str.is_empty()
                && !rest_str.starts_with(['=', '<', '>', '!', '~', ';', ',', '@'])
            {
                return Err(failed(line_no, "unexpected text after package name"));
            }

            let Some(pinned) = PINNED_RE.captures(rest_str).and_then(|c| c.name("version"))
            else {
                debug!(package = name.as_str(), line = line_no + 1, "skipping unpinned requirement");
                continue;
            };

            let version_start = leading + rest.start() + pinned.start();
            let version_end = leading + rest.start() + pinned.end();
            dependencies.push(Dependency::new(
                Spanned::new(
                    name.as_str(),
                    line_range(line_no, line, leading + name.start(), leading + name.end()),
                ),
                Spanned::new(
                    pinned.as_str(),
                    line_range(line_no, line, version_start, version_end),
                ),
            ));
        }

        Ok(dependencies)
    }
}

fn failed(line_no: usize, reason: &str) -> ParseError {
    ParseError::Failed {
        line: u32::try_from(line_no + 1).unwrap_or(u32::MAX),
        reason: reason.to_owned(),
    }
}
