//! 취약점 조회 집계기
//!
//! [`Aggregator`]는 유효한 의존성 목록을 최소한의 조회 키 집합과
//! 조회 키 -> 원래 선언 목록의 역매핑([`QueryPlan`])으로 바꿉니다.
//! 사이클마다 생태계에 따라 한 번 선택됩니다.
//!
//! - [`NoopAggregator`]: 식별자를 그대로 조회 키로 사용
//! - [`GolangAggregator`]: 모듈 버전을 정규화하여 같은 버전으로 해석되는
//!   선언을 하나의 조회로 합치고, 결과를 모든 원래 선언에 다시 펼침
//!
//! 같은 식별자의 중복 선언은 모두 역매핑에 남으므로 선언마다 진단이 붙습니다.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use vulnlens_core::types::{Dependency, DependencyIdentity, Ecosystem};

/// 조회 계획
#[derive(Debug, Clone, Default)]
pub struct QueryPlan {
    /// 중복 없는 조회 키 (첫 등장 순서)
    pub queries: Vec<DependencyIdentity>,
    /// 조회 키 -> 원래 선언 목록
    pub declarations: HashMap<DependencyIdentity, Vec<Dependency>>,
}

impl QueryPlan {
    /// 선언 하나를 조회 키에 연결합니다.
    pub fn push(&mut self, key: DependencyIdentity, dependency: Dependency) {
        match self.declarations.get_mut(&key) {
            Some(decls) => decls.push(dependency),
            None => {
                self.queries.push(key.clone());
                self.declarations.insert(key, vec![dependency]);
            }
        }
    }

    /// 조회 키에 연결된 선언 목록
    pub fn declarations_for(&self, key: &DependencyIdentity) -> &[Dependency] {
        self.declarations
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 전체 선언 수
    pub fn declaration_count(&self) -> usize {
        self.declarations.values().map(Vec::len).sum()
    }
}

/// 생태계별 집계 전략
pub trait Aggregator: Send + Sync {
    /// 집계기 이름
    fn name(&self) -> &'static str;

    /// 선언 하나의 조회 키를 계산합니다.
    fn query_key(&self, dependency: &Dependency) -> DependencyIdentity;

    /// 선언 목록에서 조회 계획을 만듭니다.
    fn plan(&self, dependencies: Vec<Dependency>) -> QueryPlan {
        let mut plan = QueryPlan::default();
        for dep in dependencies {
            let key = self.query_key(&dep);
            plan.push(key, dep);
        }
        plan
    }
}

/// 식별자를 그대로 사용하는 집계기
pub struct NoopAggregator;

impl Aggregator for NoopAggregator {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn query_key(&self, dependency: &Dependency) -> DependencyIdentity {
        dependency.identity()
    }
}

/// Go 모듈 버전 정규화 집계기
pub struct GolangAggregator;

/// `vX.Y.Z-[pre.]0.yyyymmddhhmmss-revision` 형태의 pseudo-version
static PSEUDO_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>v\d+\.\d+\.\d+-(?:[0-9A-Za-z.-]*\.)?)(?P<ts>\d{14})-(?P<rev>[0-9A-Fa-f]{12,40})$")
        .expect("valid regex")
});

/// pseudo-version의 커밋 해시 길이
const REVISION_LEN: usize = 12;

impl GolangAggregator {
    /// Go 모듈 버전을 조회 키 형태로 정규화합니다.
    ///
    /// - `v` 접두어 보장
    /// - `+incompatible` 접미어 제거
    /// - pseudo-version 커밋 해시를 소문자 12자리로 통일
    pub fn canonical_version(raw: &str) -> String {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_suffix("+incompatible").unwrap_or(trimmed);
        let version = if trimmed.starts_with('v') {
            trimmed.to_owned()
        } else {
            format!("v{trimmed}")
        };

        match PSEUDO_VERSION_RE.captures(&version) {
            Some(caps) => {
                let rev = caps["rev"].to_ascii_lowercase();
                format!(
                    "{}{}-{}",
                    &caps["prefix"],
                    &caps["ts"],
                    &rev[..REVISION_LEN]
                )
            }
            None => version,
        }
    }
}

impl Aggregator for GolangAggregator {
    fn name(&self) -> &'static str {
        "golang"
    }

    fn query_key(&self, dependency: &Dependency) -> DependencyIdentity {
        DependencyIdentity::new(
            dependency.name.value.trim(),
            Self::canonical_version(&dependency.version.value),
        )
    }
}

static NOOP: NoopAggregator = NoopAggregator;
static GOLANG: GolangAggregator = GolangAggregator;

/// 생태계에 맞는 집계기를 반환합니다.
pub fn aggregator_for(ecosystem: Ecosystem) -> &'static dyn Aggregator {
    match ecosystem {
        Ecosystem::Golang => &GOLANG,
        Ecosystem::Npm | Ecosystem::Maven | Ecosystem::Pypi => &NOOP,
    }
}
