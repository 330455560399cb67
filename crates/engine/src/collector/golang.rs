//! go.mod 수집기
//!
//! [`GolangCollector`]는 `require` 지시어의 모듈 경로와 버전을 추출합니다.
//!
//! ```text
//! module example.com/app
//!
//! go 1.21
//!
//! require github.com/pkg/errors v0.9.1
//!
//! require (
//!     github.com/gin-gonic/gin v1.9.1
//!     golang.org/x/text v0.3.7 // indirect
//! )
//! ```
//!
//! `replace`, `exclude`, `retract` 블록은 건너뜁니다.
//! 닫히지 않은 블록과 모듈/버전 쌍이 아닌 `require` 항목은 파싱 에러입니다.

use vulnlens_core::error::ParseError;
use vulnlens_core::pipeline::Collector;
use vulnlens_core::types::{Dependency, Ecosystem, Spanned};

use super::line_range;

/// go.mod 수집기
pub struct GolangCollector;

enum BlockState {
    Outside,
    Require { opened_at: usize },
    Other { opened_at: usize },
}

impl Collector for GolangCollector {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Golang
    }

    fn manifest_name(&self) -> &str {
        "go.mod"
    }

    fn collect(&self, text: &str) -> Result<Vec<Dependency>, ParseError> {
        let mut dependencies = Vec::new();
        let mut state = BlockState::Outside;

        for (line_no, line) in text.lines().enumerate() {
            let content = line.split("//").next().unwrap_or_default();
            let tokens = tokenize(content);
            let Some(&(_, first)) = tokens.first() else {
                continue;
            };

            match state {
                BlockState::Require { .. } | BlockState::Other { .. } if first == ")" => {
                    state = BlockState::Outside;
                }
                BlockState::Require { .. } => {
                    dependencies.push(requirement(line_no, line, &tokens)?);
                }
                BlockState::Other { .. } => {}
                BlockState::Outside => match (first, tokens.get(1)) {
                    ("require", Some(&(_, "("))) => {
                        state = BlockState::Require { opened_at: line_no };
                    }
                    ("require", Some(_)) => {
                        dependencies.push(requirement(line_no, line, &tokens[1..])?);
                    }
                    ("require", None) => {
                        return Err(failed(line_no, "require directive without module"));
                    }
                    (_, Some(&(_, "("))) => {
                        state = BlockState::Other { opened_at: line_no };
                    }
                    (")", _) => {
                        return Err(failed(line_no, "unexpected ')'"));
                    }
                    _ => {}
                },
            }
        }

        match state {
            BlockState::Require { opened_at } | BlockState::Other { opened_at } => {
                Err(failed(opened_at, "unterminated block"))
            }
            BlockState::Outside => Ok(dependencies),
        }
    }
}

/// 공백으로 구분된 토큰과 바이트 시작 위치
fn tokenize(content: &str) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in content.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                tokens.push((s, &content[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push((s, &content[s..]));
    }
    tokens
}

/// `module version` 항목 하나를 의존성으로 변환합니다.
fn requirement(
    line_no: usize,
    line: &str,
    tokens: &[(usize, &str)],
) -> Result<Dependency, ParseError> {
    let [(name_start, name), (version_start, version)] = tokens else {
        return Err(failed(line_no, "expected module path and version"));
    };
    let (name_start, name) = unquote(*name_start, name);
    let (version_start, version) = unquote(*version_start, version);

    Ok(Dependency::new(
        Spanned::new(
            name,
            line_range(line_no, line, name_start, name_start + name.len()),
        ),
        Spanned::new(
            version,
            line_range(line_no, line, version_start, version_start + version.len()),
        ),
    ))
}

/// 따옴표로 감싼 모듈 경로를 벗깁니다.
fn unquote(start: usize, token: &str) -> (usize, &str) {
    match token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
    {
        Some(inner) => (start + 1, inner),
        None => (start, token),
    }
}

fn failed(line_no: usize, reason: &str) -> ParseError {
    ParseError::Failed {
        line: u32::try_from(line_no + 1).unwrap_or(u32::MAX),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vulnlens_core::types::Range;

    const SAMPLE: &str = "\
module example.com/app

go 1.21

require github.com/pkg/errors v0.9.1

require (
\tgithub.com/gin-gonic/gin v1.9.1
\tgolang.org/x/text v0.3.7 // indirect
)

replace (
\tgolang.org/x/net => golang.org/x/net v0.1.0
)
";

    #[test]
    fn collects_single_line_and_block_requires() {
        let deps = GolangCollector.collect(SAMPLE).unwrap();
        let ids: Vec<String> = deps.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "github.com/pkg/errors@v0.9.1",
                "github.com/gin-gonic/gin@v1.9.1",
                "golang.org/x/text@v0.3.7",
            ]
        );
    }

    #[test]
    fn records_ranges() {
        let deps = GolangCollector.collect(SAMPLE).unwrap();
        assert_eq!(deps[0].name.range, Range::on_line(4, 8, 29));
        assert_eq!(deps[0].version.range, Range::on_line(4, 30, 36));
        assert_eq!(deps[1].name.range, Range::on_line(7, 1, 25));
        assert_eq!(deps[1].version.range, Range::on_line(7, 26, 32));
    }

    #[test]
    fn unterminated_block_fails_at_opening_line() {
        let text = "module x\n\nrequire (\n\tgithub.com/a/b v1.0.0\n";
        match GolangCollector.collect(text).unwrap_err() {
            ParseError::Failed { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("unterminated"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_require_entry_fails() {
        let text = "require (\n\tgithub.com/a/b\n)\n";
        assert!(GolangCollector.collect(text).is_err());
    }

    #[test]
    fn quoted_module_path_is_unquoted() {
        let deps = GolangCollector
            .collect("require \"github.com/a/b\" v1.0.0\n")
            .unwrap();
        assert_eq!(deps[0].name.value, "github.com/a/b");
        assert_eq!(deps[0].name.range, Range::on_line(0, 9, 23));
    }

    #[test]
    fn empty_manifest_has_no_dependencies() {
        assert!(GolangCollector.collect("module x\n").unwrap().is_empty());
    }
}
