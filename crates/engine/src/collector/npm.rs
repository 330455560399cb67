//! package.json 수집기
//!
//! [`NpmCollector`]는 `dependencies`와 `devDependencies`의 선언을 추출합니다.
//! 문서 구조는 `serde_json`으로 검증하고, 각 선언의 원본 위치는
//! 해당 섹션 이후 텍스트에서 `"name": "version"` 패턴으로 찾습니다.
//!
//! ```json
//! {
//!   "name": "my-app",
//!   "dependencies": { "lodash": "^4.17.20" },
//!   "devDependencies": { "jest": "29.7.0" }
//! }
//! ```
//!
//! 버전 앞의 단일 `^`, `~`, `=` 연산자는 제거하고 버전 범위에서도 제외하므로,
//! 빠른 수정은 연산자를 유지한 채 버전 숫자만 바꿉니다.
//! 문자열이 아닌 값과 위치를 찾을 수 없는 선언은 건너뜁니다.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use vulnlens_core::error::ParseError;
use vulnlens_core::pipeline::Collector;
use vulnlens_core::types::{Dependency, Ecosystem, Range, Spanned};

use super::position_at;

/// package.json 수집기
pub struct NpmCollector;

/// package.json 구조 (파싱용)
#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
}

const SECTIONS: [&str; 2] = ["dependencies", "devDependencies"];

impl Collector for NpmCollector {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn manifest_name(&self) -> &str {
        "package.json"
    }

    fn collect(&self, text: &str) -> Result<Vec<Dependency>, ParseError> {
        let manifest: PackageJson =
            serde_json::from_str(text).map_err(|e| ParseError::Failed {
                line: u32::try_from(e.line()).unwrap_or(u32::MAX),
                reason: e.to_string(),
            })?;

        let mut used = HashSet::new();
        let mut dependencies = Vec::new();

        for (section, entries) in SECTIONS
            .iter()
            .zip([&manifest.dependencies, &manifest.dev_dependencies])
        {
            let Some(section_start) = section_offset(text, section) else {
                continue;
            };
            for (name, value) in entries {
                let Some(raw_version) = value.as_str() else {
                    debug!(package = %name, "skipping non-string dependency value");
                    continue;
                };
                match locate(text, section_start, name, raw_version, &mut used) {
                    Some(dep) => dependencies.push(dep),
                    None => debug!(package = %name, "dependency position not found, skipping"),
                }
            }
        }

        dependencies.sort_by_key(|d| d.name.range.start);
        Ok(dependencies)
    }
}

/// 섹션 키(`"dependencies": {`)가 끝나는 바이트 오프셋
fn section_offset(text: &str, section: &str) -> Option<usize> {
    let pattern = format!(r#""{}"\s*:\s*\{{"#, regex::escape(section));
    let re = Regex::new(&pattern).ok()?;
    re.find(text).map(|m| m.end())
}

/// `"name": "version"` 선언의 위치를 찾습니다.
///
/// 이미 사용된 위치는 건너뛰므로 같은 선언이 두 섹션에 있어도 각각 다른 위치를 얻습니다.
fn locate(
    text: &str,
    from: usize,
    name: &str,
    raw_version: &str,
    used: &mut HashSet<usize>,
) -> Option<Dependency> {
    let pattern = format!(
        r#""({})"\s*:\s*"({})""#,
        regex::escape(name),
        regex::escape(raw_version)
    );
    let re = Regex::new(&pattern).ok()?;

    let caps = re
        .captures_iter(&text[from..])
        .find(|c| c.get(1).is_some_and(|m| !used.contains(&(from + m.start()))))?;
    let name_match = caps.get(1)?;
    let version_match = caps.get(2)?;
    used.insert(from + name_match.start());

    let name_start = from + name_match.start();
    let name_end = from + name_match.end();
    let mut version_start = from + version_match.start();
    let version_end = from + version_match.end();

    let version = match strip_operator(raw_version) {
        Some(stripped) => {
            version_start += raw_version.len() - stripped.len();
            stripped
        }
        None => raw_version,
    };

    Some(Dependency::new(
        Spanned::new(
            name,
            Range::new(position_at(text, name_start), position_at(text, name_end)),
        ),
        Spanned::new(
            version,
            Range::new(
                position_at(text, version_start),
                position_at(text, version_end),
            ),
        ),
    ))
}

/// 단일 `^`, `~`, `=` 접두 연산자를 제거합니다.
fn strip_operator(version: &str) -> Option<&str> {
    version
        .strip_prefix('^')
        .or_else(|| version.strip_prefix('~'))
        .or_else(|| version.strip_prefix('='))
}
