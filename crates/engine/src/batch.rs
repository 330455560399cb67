//! 배치 요청 분할
//!
//! 캐시 미적중 키를 입력 순서를 유지한 채 최대 `batch_size` 크기의
//! [`RequestBatch`]로 나눕니다.

use serde::Serialize;

use vulnlens_core::types::{DependencyIdentity, Ecosystem};

/// 원격 조회 한 번에 보내는 패키지 묶음
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBatch {
    /// 생태계
    pub ecosystem: Ecosystem,
    /// 조회 대상 (입력 순서 유지)
    pub items: Vec<DependencyIdentity>,
}

/// 요청 본문의 패키지 항목
#[derive(Debug, Serialize)]
pub struct PackageVersion<'a> {
    pub package: &'a str,
    pub version: &'a str,
}

/// `POST /component-analyses` 요청 본문
#[derive(Debug, Serialize)]
pub struct BatchRequestBody<'a> {
    pub ecosystem: Ecosystem,
    pub package_versions: Vec<PackageVersion<'a>>,
}

impl RequestBatch {
    /// 배치에 포함된 패키지 수
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 비어 있는지
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 요청 본문을 만듭니다.
    pub fn to_request_body(&self) -> BatchRequestBody<'_> {
        BatchRequestBody {
            ecosystem: self.ecosystem,
            package_versions: self
                .items
                .iter()
                .map(|item| PackageVersion {
                    package: &item.name,
                    version: &item.version,
                })
                .collect(),
        }
    }
}

/// 원격 API가 요청 1회에 허용하는 최대 패키지 수
pub const MAX_BATCH_ENTRIES: usize = 10;

/// 키 목록을 최대 `batch_size` 크기의 배치로 나눕니다.
///
/// `batch_size`는 1..=[`MAX_BATCH_ENTRIES`] 범위로 제한됩니다.
pub fn slice_batches(
    ecosystem: Ecosystem,
    items: &[DependencyIdentity],
    batch_size: usize,
) -> Vec<RequestBatch> {
    items
        .chunks(batch_size.clamp(1, MAX_BATCH_ENTRIES))
        .map(|chunk| RequestBatch {
            ecosystem,
            items: chunk.to_vec(),
        })
        .collect()
}
