//! 원격 API 응답 레코드
//!
//! [`VulnerabilityRecord`]는 패키지/버전 하나에 대한 원격 서비스의 응답입니다.
//! 오케스트레이션 계층에서는 불투명한 값으로 취급되며 (캐시 키 계산 제외),
//! 해석은 진단 엔진이 담당합니다.
//!
//! 알려지지 않은 필드는 무시하고, 누락된 필드는 기본값을 사용합니다.

use serde::{Deserialize, Serialize};

use vulnlens_core::types::DependencyIdentity;

/// 개별 취약점 또는 보안 권고
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Advisory {
    /// 식별자 (CVE, GHSA, 내부 ID 등)
    pub id: String,
    /// 제목
    pub title: Option<String>,
    /// 심각도 문자열 (critical, high, medium, low)
    pub severity: Option<String>,
    /// 상세 정보 URL
    pub url: Option<String>,
    /// 수정된 버전 목록
    pub fixed_in: Vec<String>,
}

/// 패키지/버전 하나에 대한 취약점 레코드
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnerabilityRecord {
    /// 패키지 이름
    pub package: String,
    /// 조회한 버전
    pub version: String,
    /// 서비스가 패키지를 알지 못함
    pub package_unknown: bool,
    /// 권장 버전
    #[serde(alias = "recommended_versions")]
    pub recommended_version: Option<String>,
    /// 알려진 보안 취약점
    pub vulnerability: Vec<Advisory>,
    /// 보안 권고
    pub advisory: Vec<Advisory>,
    /// 악용 가능한 취약점 수
    pub exploitable_vulnerabilities_count: u32,
    /// 가장 높은 심각도
    pub highest_severity: Option<String>,
}

impl VulnerabilityRecord {
    /// 캐시/조회 키인 `(package, version)` 식별자
    pub fn identity(&self) -> DependencyIdentity {
        DependencyIdentity::new(&self.package, &self.version)
    }

    /// 알려진 보안 취약점 수
    pub fn vulnerability_count(&self) -> u32 {
        u32::try_from(self.vulnerability.len()).unwrap_or(u32::MAX)
    }

    /// 보안 권고 수
    pub fn advisory_count(&self) -> u32 {
        u32::try_from(self.advisory.len()).unwrap_or(u32::MAX)
    }

    /// 취약점 또는 권고가 하나라도 있는지
    pub fn has_findings(&self) -> bool {
        !self.vulnerability.is_empty() || !self.advisory.is_empty()
    }
}
