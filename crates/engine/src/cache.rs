//! 취약점 레코드 캐시
//!
//! [`CacheStore`]는 용량과 유효 기간으로 제한되는 단일 네임스페이스 저장소이고,
//! [`AdvisoryCache`]는 생태계마다 하나의 `CacheStore`를 두어 사이클과 파일 사이에서
//! 공유됩니다. 메모리 전용이며 프로세스 재시작 시 사라집니다.
//!
//! # 규칙
//!
//! - `get(keys)`는 `keys`와 같은 길이, 같은 순서의 결과를 반환합니다.
//! - 유효 기간이 지난 엔트리는 읽을 때 없는 것으로 취급합니다.
//! - 읽기는 엔트리를 제거하지 않습니다.
//! - `add`는 덮어쓰기를 허용하며, 덮어쓴 엔트리는 가장 최근 삽입으로 간주합니다.
//! - 용량을 넘으면 가장 먼저 삽입된 엔트리부터 제거합니다.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use vulnlens_core::metrics as m;
use vulnlens_core::types::{DependencyIdentity, Ecosystem};

use crate::record::VulnerabilityRecord;

/// 캐시 조회 결과 (키 + 적중 시 값)
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup<K, V> {
    /// 조회한 키
    pub key: K,
    /// 적중 시 값
    pub value: Option<V>,
}

impl<K, V> CacheLookup<K, V> {
    /// 적중 여부
    pub fn is_hit(&self) -> bool {
        self.value.is_some()
    }
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    seq: u64,
}

/// 용량/유효 기간 제한 저장소
pub struct CacheStore<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// 삽입 순서 -> 키
    order: BTreeMap<u64, K>,
    next_seq: u64,
    max_items: usize,
    max_age: Duration,
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// 새 저장소를 생성합니다. `max_items`가 0이면 1로 취급합니다.
    pub fn new(max_items: usize, max_age: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            max_items: max_items.max(1),
            max_age,
        }
    }

    /// 키 목록을 조회합니다.
    pub fn get(&self, keys: &[K]) -> Vec<CacheLookup<K, V>> {
        let now = Instant::now();
        keys.iter()
            .map(|key| CacheLookup {
                key: key.clone(),
                value: self
                    .entries
                    .get(key)
                    .filter(|entry| now.duration_since(entry.inserted_at) <= self.max_age)
                    .map(|entry| entry.value.clone()),
            })
            .collect()
    }

    /// 레코드를 삽입(또는 덮어쓰기)하고 제거된 엔트리 수를 반환합니다.
    pub fn add(&mut self, records: impl IntoIterator<Item = (K, V)>) -> usize {
        let now = Instant::now();
        for (key, value) in records {
            let seq = self.next_seq;
            self.next_seq += 1;
            if let Some(old) = self.entries.insert(
                key.clone(),
                CacheEntry {
                    value,
                    inserted_at: now,
                    seq,
                },
            ) {
                self.order.remove(&old.seq);
            }
            self.order.insert(seq, key);
        }

        let mut evicted = 0;
        while self.entries.len() > self.max_items {
            let Some((_, key)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&key);
            evicted += 1;
        }
        evicted
    }

    /// 저장된 엔트리 수 (만료 여부 무관)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 최대 엔트리 수
    pub fn capacity(&self) -> usize {
        self.max_items
    }
}

/// 공유 레코드 타입
pub type SharedRecord = Arc<VulnerabilityRecord>;

/// 생태계별 네임스페이스를 가진 취약점 캐시
///
/// 동기 구간에서만 잠금을 잡으며, await 지점을 넘어 잠금을 유지하지 않습니다.
pub struct AdvisoryCache {
    stores: Mutex<HashMap<Ecosystem, CacheStore<DependencyIdentity, SharedRecord>>>,
    max_items: usize,
    max_age: Duration,
}

impl AdvisoryCache {
    /// 네임스페이스당 `max_items`, `max_age` 한도를 가진 캐시를 생성합니다.
    pub fn new(max_items: usize, max_age: Duration) -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
            max_items,
            max_age,
        }
    }

    /// 생태계 네임스페이스에서 키 목록을 조회합니다.
    pub fn get(
        &self,
        ecosystem: Ecosystem,
        keys: &[DependencyIdentity],
    ) -> Vec<CacheLookup<DependencyIdentity, SharedRecord>> {
        let lookups = {
            let stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
            match stores.get(&ecosystem) {
                Some(store) => store.get(keys),
                None => keys
                    .iter()
                    .map(|key| CacheLookup {
                        key: key.clone(),
                        value: None,
                    })
                    .collect(),
            }
        };

        let hits = lookups.iter().filter(|l| l.is_hit()).count();
        let misses = lookups.len() - hits;
        counter!(m::CACHE_HITS_TOTAL, m::LABEL_ECOSYSTEM => ecosystem.as_str())
            .increment(hits as u64);
        counter!(m::CACHE_MISSES_TOTAL, m::LABEL_ECOSYSTEM => ecosystem.as_str())
            .increment(misses as u64);
        debug!(ecosystem = %ecosystem, hits, misses, "cache lookup");

        lookups
    }

    /// 생태계 네임스페이스에 레코드를 기록합니다 (덮어쓰기).
    pub fn add(
        &self,
        ecosystem: Ecosystem,
        records: impl IntoIterator<Item = (DependencyIdentity, SharedRecord)>,
    ) {
        let evicted = {
            let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
            stores
                .entry(ecosystem)
                .or_insert_with(|| CacheStore::new(self.max_items, self.max_age))
                .add(records)
        };

        if evicted > 0 {
            counter!(m::CACHE_EVICTIONS_TOTAL).increment(evicted as u64);
            debug!(ecosystem = %ecosystem, evicted, "cache entries evicted");
        }
    }

    /// 생태계 네임스페이스의 엔트리 수
    pub fn len(&self, ecosystem: Ecosystem) -> usize {
        let stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        stores.get(&ecosystem).map_or(0, |store| store.len())
    }
}
