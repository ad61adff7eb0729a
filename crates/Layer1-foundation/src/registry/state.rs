//! State Registry - 인터프리터 전역 키-값 런타임 상태
//!
//! 키마다 원자적으로 교체되는 값 핸들을 담은 slot 하나를 가진다.
//! 읽기는 다른 키의 쓰기를 막지 않으며, 이전 값 또는 새 값 중 하나만
//! 보인다 (부분 쓰기는 보이지 않음).

use super::ident::{Identifier, IdentifierTable, RegistryId, WellKnownKey};
use super::value::RuntimeValue;
use crate::{Error, Result};
use arc_swap::ArcSwapOption;
use parking_lot::{RwLock, RwLockReadGuard};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

type Slot = Arc<ArcSwapOption<RuntimeValue>>;

// ============================================================================
// RegistryState - lifecycle
// ============================================================================

/// Registry 생명주기
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// 생성됨, 인터프리터 시작 전
    Uninitialized,
    /// 읽기/쓰기 가능
    Running,
    /// 종료됨, 모든 값 해제
    Finalized,
}

impl std::fmt::Display for RegistryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Running => write!(f, "running"),
            Self::Finalized => write!(f, "finalized"),
        }
    }
}

// ============================================================================
// StateRegistry
// ============================================================================

/// 인터프리터 전역 런타임 값 저장소
///
/// 인터프리터당 하나, 명시적으로 전달한다. 문자열 키는 처음 쓸 때
/// identifier slot으로 인터닝된다. 자주 쓰는 호출자는 [`Identifier`]를 한 번
/// 해석한 뒤 `*_by_identifier` 메서드를 사용한다.
pub struct StateRegistry {
    id: RegistryId,

    /// 생명주기. 모든 연산 동안 읽기 잠금을 유지해 종료가 쓰기와 겹치지 않음
    state: RwLock<RegistryState>,

    /// 이름 -> slot
    idents: RwLock<IdentifierTable>,

    /// 값 slot (identifier slot 인덱스)
    slots: RwLock<Vec<Slot>>,

    /// `next_serial` 카운터. 값 삭제나 교체와 무관하게 증가만 한다
    serial: AtomicU64,
}

impl StateRegistry {
    /// 초기화 전 상태의 registry 생성
    pub fn new() -> Self {
        Self {
            id: RegistryId::next(),
            state: RwLock::new(RegistryState::Uninitialized),
            idents: RwLock::new(IdentifierTable::new()),
            slots: RwLock::new(Vec::new()),
            serial: AtomicU64::new(1),
        }
    }

    /// Registry 인스턴스 ID
    pub fn id(&self) -> RegistryId {
        self.id
    }

    /// 현재 생명주기 상태
    pub fn state(&self) -> RegistryState {
        *self.state.read()
    }

    /// 읽기/쓰기 가능 여부
    pub fn is_running(&self) -> bool {
        self.state() == RegistryState::Running
    }

    // ========================================================================
    // 생명주기
    // ========================================================================

    /// 읽기/쓰기 시작, well-known 키 사전 인터닝
    pub fn initialize(&self) -> Result<()> {
        let mut state = self.state.write();
        if *state != RegistryState::Uninitialized {
            return Err(Error::invalid_state(format!(
                "{} cannot be initialized: already {}",
                self.id, *state
            )));
        }

        for key in WellKnownKey::ALL {
            let (slot, _) = self.intern_slot(key.name());
            debug_assert_eq!(slot, key.slot());
        }

        *state = RegistryState::Running;
        info!("[{}] Initialized", self.id);
        Ok(())
    }

    /// 모든 값 해제 후 이후 접근 거부
    pub fn finalize(&self) -> Result<()> {
        let mut state = self.state.write();
        if *state != RegistryState::Running {
            return Err(Error::invalid_state(format!(
                "{} cannot be finalized: {}",
                self.id, *state
            )));
        }

        let dropped = {
            let mut slots = self.slots.write();
            let dropped = slots.iter().filter(|s| s.swap(None).is_some()).count();
            slots.clear();
            dropped
        };
        self.idents.write().clear();

        *state = RegistryState::Finalized;
        info!("[{}] Finalized, dropped {} values", self.id, dropped);
        Ok(())
    }

    fn running(&self) -> Result<RwLockReadGuard<'_, RegistryState>> {
        let state = self.state.read();
        match *state {
            RegistryState::Running => Ok(state),
            other => Err(Error::invalid_state(format!(
                "{} is {}",
                self.id, other
            ))),
        }
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    /// 키 이름을 재사용 가능한 identifier로 해석
    pub fn intern(&self, name: &str) -> Result<Identifier> {
        let _running = self.running()?;
        if name.is_empty() {
            return Err(Error::invalid_argument("registry key must not be empty"));
        }

        let (slot, name) = self.intern_slot(name);
        Ok(Identifier::new(self.id, slot, name))
    }

    /// Well-known 키의 사전 인터닝된 identifier
    pub fn well_known(&self, key: WellKnownKey) -> Result<Identifier> {
        let _running = self.running()?;
        let idents = self.idents.read();
        let name = idents.name(key.slot() as usize).ok_or_else(|| {
            Error::invalid_state(format!("{} is missing well-known key '{}'", self.id, key))
        })?;
        Ok(Identifier::new(self.id, key.slot(), Arc::clone(name)))
    }

    fn intern_slot(&self, name: &str) -> (u32, Arc<str>) {
        if let Some(found) = self.idents.read().get(name) {
            return found;
        }

        let mut idents = self.idents.write();
        let (slot, name, created) = idents.intern(name);
        if created {
            let mut slots = self.slots.write();
            slots.push(Arc::new(ArcSwapOption::empty()));
            trace!("[{}] Interned '{}' -> slot {}", self.id, name, slot);
        }
        (slot, name)
    }

    fn slot_for(&self, ident: &Identifier) -> Result<Slot> {
        if ident.registry_id() != self.id {
            return Err(Error::invalid_argument(format!(
                "identifier '{}' belongs to {}, not {}",
                ident.name(),
                ident.registry_id(),
                self.id
            )));
        }

        let slots = self.slots.read();
        slots.get(ident.slot()).cloned().ok_or_else(|| {
            Error::invalid_argument(format!("identifier '{}' has no slot", ident.name()))
        })
    }

    fn slot_named(&self, key: &str) -> Option<Slot> {
        let (slot, _) = self.idents.read().get(key)?;
        self.slots.read().get(slot as usize).cloned()
    }

    // ========================================================================
    // Get / Set
    // ========================================================================

    /// `key`의 현재 값
    pub fn get(&self, key: &str) -> Result<RuntimeValue> {
        let _running = self.running()?;
        self.slot_named(key)
            .and_then(|slot| slot.load_full())
            .map(|value| (*value).clone())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    /// 사전 해석된 키의 현재 값
    pub fn get_by_identifier(&self, ident: &Identifier) -> Result<RuntimeValue> {
        let _running = self.running()?;
        self.slot_for(ident)?
            .load_full()
            .map(|value| (*value).clone())
            .ok_or_else(|| Error::NotFound(ident.name().to_string()))
    }

    /// `key`의 값 설정 (기존 값은 교체)
    pub fn set(&self, key: &str, value: RuntimeValue) -> Result<()> {
        let _running = self.running()?;
        if key.is_empty() {
            return Err(Error::invalid_argument("registry key must not be empty"));
        }

        let (slot, name) = self.intern_slot(key);
        let slot = Arc::clone(&self.slots.read()[slot as usize]);
        debug!("[{}] Set '{}' ({})", self.id, name, value.type_name());
        slot.store(Some(Arc::new(value)));
        Ok(())
    }

    /// 사전 해석된 키의 값 설정 (기존 값은 교체)
    pub fn set_by_identifier(&self, ident: &Identifier, value: RuntimeValue) -> Result<()> {
        let _running = self.running()?;
        let slot = self.slot_for(ident)?;
        debug!("[{}] Set '{}' ({})", self.id, ident.name(), value.type_name());
        slot.store(Some(Arc::new(value)));
        Ok(())
    }

    /// 키가 아직 `expected`를 가지고 있을 때만 값 교체
    ///
    /// 비교는 동일 할당 기준이며 `None`은 "값 없음"을 뜻한다.
    /// 다른 쓰기가 먼저 일어났으면 쓰지 않고 `false`를 반환한다.
    pub fn compare_and_set_by_identifier(
        &self,
        ident: &Identifier,
        expected: Option<&RuntimeValue>,
        value: RuntimeValue,
    ) -> Result<bool> {
        let _running = self.running()?;
        let slot = self.slot_for(ident)?;

        let current = slot.load_full();
        let unchanged = match (&current, expected) {
            (Some(current), Some(expected)) => current.ptr_eq(expected),
            (None, None) => true,
            _ => false,
        };
        if !unchanged {
            return Ok(false);
        }

        let type_name = value.type_name();
        let previous = slot.compare_and_swap(&current, Some(Arc::new(value)));
        let swapped = match (&*previous, &current) {
            (Some(previous), Some(current)) => Arc::ptr_eq(previous, current),
            (None, None) => true,
            _ => false,
        };
        if swapped {
            debug!("[{}] Swapped '{}' ({})", self.id, ident.name(), type_name);
        }
        Ok(swapped)
    }

    /// `key`의 값 제거 (값이 없었으면 `false`)
    pub fn remove(&self, key: &str) -> Result<bool> {
        let _running = self.running()?;
        let removed = self
            .slot_named(key)
            .map(|slot| slot.swap(None).is_some())
            .unwrap_or(false);
        if removed {
            debug!("[{}] Removed '{}'", self.id, key);
        }
        Ok(removed)
    }

    /// `key`에 값이 있는지
    pub fn contains(&self, key: &str) -> Result<bool> {
        let _running = self.running()?;
        Ok(self
            .slot_named(key)
            .map(|slot| slot.load().is_some())
            .unwrap_or(false))
    }

    // ========================================================================
    // 타입 지정 조회
    // ========================================================================

    /// `key`의 현재 값을 `T`로 변환해서 조회
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        let value = self.get(key)?;
        downcast_value(key, &value)
    }

    /// 사전 해석된 키의 현재 값을 `T`로 변환해서 조회
    pub fn get_by_identifier_as<T: Any + Send + Sync>(&self, ident: &Identifier) -> Result<Arc<T>> {
        let value = self.get_by_identifier(ident)?;
        downcast_value(ident.name(), &value)
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 값이 있는 키 목록 (인터닝 순서)
    pub fn keys(&self) -> Result<Vec<String>> {
        let _running = self.running()?;
        let idents = self.idents.read();
        let slots = self.slots.read();

        Ok(slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.load().is_some())
            .filter_map(|(idx, _)| idents.name(idx).map(|n| n.to_string()))
            .collect())
    }

    /// 값이 있는 키 개수
    pub fn len(&self) -> Result<usize> {
        let _running = self.running()?;
        Ok(self
            .slots
            .read()
            .iter()
            .filter(|slot| slot.load().is_some())
            .count())
    }

    /// 값이 있는 키가 없는지
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    // ========================================================================
    // 일련번호
    // ========================================================================

    /// Registry 범위의 일련번호 발급 (1부터, 재사용 없음)
    ///
    /// 키 값과 분리되어 있어 값을 지우거나 교체해도 되돌아가지 않는다.
    pub fn next_serial(&self) -> Result<u64> {
        let _running = self.running()?;
        Ok(self.serial.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateRegistry")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("keys", &self.idents.read().len())
            .finish()
    }
}

fn downcast_value<T: Any + Send + Sync>(key: &str, value: &RuntimeValue) -> Result<Arc<T>> {
    value.downcast::<T>().ok_or_else(|| {
        Error::invalid_argument(format!(
            "'{}' holds {}, not {}",
            key,
            value.type_name(),
            std::any::type_name::<T>()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ident::{KEY_ARGV, KEY_PATH};

    fn running() -> StateRegistry {
        let registry = StateRegistry::new();
        registry.initialize().unwrap();
        registry
    }

    #[test]
    fn test_set_get_round_trip() {
        let registry = running();
        let argv = RuntimeValue::new(vec!["prog".to_string()]);

        registry.set(KEY_ARGV, argv.clone()).unwrap();
        assert!(registry.get(KEY_ARGV).unwrap().ptr_eq(&argv));

        // last write wins
        let replaced = RuntimeValue::new(vec!["prog".to_string(), "-v".to_string()]);
        registry.set(KEY_ARGV, replaced.clone()).unwrap();
        assert!(registry.get(KEY_ARGV).unwrap().ptr_eq(&replaced));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let registry = running();

        // interned but never set
        assert!(matches!(registry.get(KEY_PATH), Err(Error::NotFound(k)) if k == "path"));
        // never interned
        assert!(matches!(registry.get("flags"), Err(Error::NotFound(_))));
        assert!(!registry.contains("flags").unwrap());
    }

    #[test]
    fn test_identifier_fast_path() {
        let registry = running();
        let path = registry.well_known(WellKnownKey::Path).unwrap();
        assert_eq!(path.name(), KEY_PATH);

        registry
            .set_by_identifier(&path, RuntimeValue::new(vec!["/usr/lib".to_string()]))
            .unwrap();

        // visible through both access paths
        let by_name = registry.get_as::<Vec<String>>(KEY_PATH).unwrap();
        let by_ident = registry.get_by_identifier_as::<Vec<String>>(&path).unwrap();
        assert!(Arc::ptr_eq(&by_name, &by_ident));
        assert_eq!(by_name[0], "/usr/lib");
    }

    #[test]
    fn test_intern_reuses_slot() {
        let registry = running();
        let a = registry.intern("debug_flags").unwrap();
        let b = registry.intern("debug_flags").unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.intern("argv").unwrap(), registry.well_known(WellKnownKey::Argv).unwrap());

        registry.set("debug_flags", RuntimeValue::new(3u8)).unwrap();
        assert_eq!(*registry.get_by_identifier_as::<u8>(&a).unwrap(), 3);
    }

    #[test]
    fn test_identifier_from_other_registry_rejected() {
        let first = running();
        let second = running();
        let ident = first.well_known(WellKnownKey::Argv).unwrap();

        let err = second.get_by_identifier(&ident).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_typed_get_mismatch() {
        let registry = running();
        registry.set(KEY_ARGV, RuntimeValue::new(7i64)).unwrap();

        let err = registry.get_as::<Vec<String>>(KEY_ARGV).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_compare_and_set() {
        let registry = running();
        let ident = registry.well_known(WellKnownKey::Transformers).unwrap();

        // empty slot: only an expectation of "nothing" succeeds
        let first = RuntimeValue::new(1u32);
        assert!(!registry
            .compare_and_set_by_identifier(&ident, Some(&first), RuntimeValue::new(0u32))
            .unwrap());
        assert!(registry
            .compare_and_set_by_identifier(&ident, None, first.clone())
            .unwrap());

        // stale expectation loses
        let second = RuntimeValue::new(2u32);
        assert!(registry
            .compare_and_set_by_identifier(&ident, Some(&first), second.clone())
            .unwrap());
        assert!(!registry
            .compare_and_set_by_identifier(&ident, Some(&first), RuntimeValue::new(3u32))
            .unwrap());
        assert!(registry.get_by_identifier(&ident).unwrap().ptr_eq(&second));
    }

    #[test]
    fn test_remove_and_keys() {
        let registry = running();
        registry.set("xoptions", RuntimeValue::new(1u8)).unwrap();
        registry.set("custom", RuntimeValue::new(2u8)).unwrap();

        assert_eq!(registry.keys().unwrap(), vec!["xoptions", "custom"]);
        assert_eq!(registry.len().unwrap(), 2);

        assert!(registry.remove("custom").unwrap());
        assert!(!registry.remove("custom").unwrap());
        assert!(!registry.remove("never").unwrap());
        assert_eq!(registry.keys().unwrap(), vec!["xoptions"]);
    }

    #[test]
    fn test_empty_key_rejected() {
        let registry = running();
        assert!(matches!(
            registry.set("", RuntimeValue::new(())),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(registry.intern(""), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_serial_survives_value_removal() {
        let registry = running();
        let first = registry.next_serial().unwrap();

        registry.set("counter", RuntimeValue::new(first)).unwrap();
        registry.remove("counter").unwrap();

        let second = registry.next_serial().unwrap();
        assert!(second > first);
        assert_ne!(running().next_serial().unwrap(), 0);

        registry.finalize().unwrap();
        assert!(matches!(registry.next_serial(), Err(Error::InvalidState(_))));
        assert!(matches!(StateRegistry::new().next_serial(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_lifecycle() {
        let registry = StateRegistry::new();
        assert_eq!(registry.state(), RegistryState::Uninitialized);

        // not started yet
        assert!(matches!(
            registry.set(KEY_ARGV, RuntimeValue::new(())),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(registry.get(KEY_ARGV), Err(Error::InvalidState(_))));

        registry.initialize().unwrap();
        assert!(registry.is_running());
        assert!(matches!(registry.initialize(), Err(Error::InvalidState(_))));

        let ident = registry.well_known(WellKnownKey::Argv).unwrap();
        registry.set(KEY_ARGV, RuntimeValue::new(())).unwrap();
        registry.finalize().unwrap();
        assert_eq!(registry.state(), RegistryState::Finalized);

        // torn down
        assert!(matches!(
            registry.set(KEY_ARGV, RuntimeValue::new(())),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            registry.get_by_identifier(&ident),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(registry.finalize(), Err(Error::InvalidState(_))));
        assert!(matches!(registry.initialize(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_finalize_drops_values() {
        let registry = running();
        let shared = Arc::new(vec![1u8, 2, 3]);
        registry
            .set("bytes", RuntimeValue::from_arc(Arc::clone(&shared)))
            .unwrap();
        assert_eq!(Arc::strong_count(&shared), 2);

        registry.finalize().unwrap();
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[test]
    fn test_concurrent_readers_see_whole_values() {
        let registry = Arc::new(running());
        let ident = registry.well_known(WellKnownKey::Argv).unwrap();
        registry
            .set_by_identifier(&ident, RuntimeValue::new(vec![0u32; 16]))
            .unwrap();

        let writer = {
            let registry = Arc::clone(&registry);
            let ident = ident.clone();
            std::thread::spawn(move || {
                for i in 1..200u32 {
                    registry
                        .set_by_identifier(&ident, RuntimeValue::new(vec![i; 16]))
                        .unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let ident = ident.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let value = registry.get_by_identifier_as::<Vec<u32>>(&ident).unwrap();
                        assert!(value.iter().all(|v| *v == value[0]));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(registry.get_as::<Vec<u32>>(KEY_ARGV).unwrap()[0], 199);
    }
}
