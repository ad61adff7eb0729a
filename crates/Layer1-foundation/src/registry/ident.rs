//! Identifier 핸들
//!
//! 자주 쓰는 registry 조회를 위한 사전 해석 키:
//! - Well-known 키 상수 (`argv`, `path`, ...)
//! - `Identifier` - 특정 registry 인스턴스에 묶인 slot 인덱스
//! - `IdentifierTable` - 이름 -> slot 인터닝

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// Well-known Keys
// ============================================================================

/// 명령줄 인자
pub const KEY_ARGV: &str = "argv";
/// 모듈 검색 경로
pub const KEY_PATH: &str = "path";
/// 경고 옵션
pub const KEY_WARNOPTIONS: &str = "warnoptions";
/// 기능 플래그 (`-X`) 옵션
pub const KEY_XOPTIONS: &str = "xoptions";
/// 코드 transformer 목록
pub const KEY_TRANSFORMERS: &str = "transformers";

/// 초기화 시 모든 registry가 slot 순서대로 인터닝하는 키
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownKey {
    Argv,
    Path,
    WarnOptions,
    XOptions,
    Transformers,
}

impl WellKnownKey {
    /// Slot 순서의 전체 목록
    pub const ALL: [WellKnownKey; 5] = [
        WellKnownKey::Argv,
        WellKnownKey::Path,
        WellKnownKey::WarnOptions,
        WellKnownKey::XOptions,
        WellKnownKey::Transformers,
    ];

    /// 키 이름
    pub fn name(self) -> &'static str {
        match self {
            Self::Argv => KEY_ARGV,
            Self::Path => KEY_PATH,
            Self::WarnOptions => KEY_WARNOPTIONS,
            Self::XOptions => KEY_XOPTIONS,
            Self::Transformers => KEY_TRANSFORMERS,
        }
    }

    /// 이 키에 예약된 slot (`ALL`의 인터닝 순서와 동일)
    pub(crate) fn slot(self) -> u32 {
        self as u32
    }

    /// 이름으로 찾기
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for WellKnownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// RegistryId
// ============================================================================

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Registry 인스턴스 식별자 (다른 registry의 identifier 사용 방지)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(u64);

impl RegistryId {
    pub(crate) fn next() -> Self {
        Self(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry-{}", self.0)
    }
}

// ============================================================================
// Identifier
// ============================================================================

/// 사전 해석된 registry 키
///
/// `StateRegistry::intern`으로 만들고 조회마다 재사용한다.
/// Clone은 slot 인덱스 복사와 이름 refcount 증가뿐, 해싱 없음.
#[derive(Clone)]
pub struct Identifier {
    registry: RegistryId,
    slot: u32,
    name: Arc<str>,
}

impl Identifier {
    pub(crate) fn new(registry: RegistryId, slot: u32, name: Arc<str>) -> Self {
        Self {
            registry,
            slot,
            name,
        }
    }

    /// 키 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 이 identifier를 만든 registry
    pub fn registry_id(&self) -> RegistryId {
        self.registry
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot as usize
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.registry == other.registry && self.slot == other.slot
    }
}

impl Eq for Identifier {}

impl std::hash::Hash for Identifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.registry.hash(state);
        self.slot.hash(state);
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({}#{} {:?})", self.registry, self.slot, self.name)
    }
}

// ============================================================================
// IdentifierTable
// ============================================================================

/// 이름 -> slot 인터닝 테이블
///
/// Slot은 빈틈없이 발급되고 재사용되지 않으므로 identifier는 registry
/// 수명 동안 유효하다.
#[derive(Debug, Default)]
pub(crate) struct IdentifierTable {
    lookup: HashMap<Arc<str>, u32>,
    names: Vec<Arc<str>>,
}

impl IdentifierTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<(u32, Arc<str>)> {
        let slot = *self.lookup.get(name)?;
        Some((slot, Arc::clone(&self.names[slot as usize])))
    }

    /// 이름 인터닝 (slot, 이름, 신규 여부)
    pub fn intern(&mut self, name: &str) -> (u32, Arc<str>, bool) {
        if let Some((slot, name)) = self.get(name) {
            return (slot, name, false);
        }

        let slot = self.names.len() as u32;
        let name: Arc<str> = Arc::from(name);
        self.names.push(Arc::clone(&name));
        self.lookup.insert(Arc::clone(&name), slot);
        (slot, name, true)
    }

    pub fn name(&self, slot: usize) -> Option<&Arc<str>> {
        self.names.get(slot)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn clear(&mut self) {
        self.lookup.clear();
        self.names.clear();
    }
}
