//! Transformer Entry - 등록된 transformer 하나

use super::traits::{AstHook, CodeHook};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use sysstate_foundation::RuntimeValue;

// ============================================================================
// EntryId
// ============================================================================

/// 등록 핸들 (registry 안에서 유일, 재사용 없음)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    /// 숫자 ID로 생성
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// 숫자 ID
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transformer-{}", self.0)
    }
}

// ============================================================================
// EntrySelector
// ============================================================================

/// `unregister`가 해제할 entry 지정
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySelector {
    Id(EntryId),
    /// 이 이름의 첫 entry
    Name(String),
}

impl EntrySelector {
    pub(crate) fn matches<A, C>(&self, entry: &TransformerEntry<A, C>) -> bool {
        match self {
            Self::Id(id) => entry.id == *id,
            Self::Name(name) => &*entry.name == name,
        }
    }
}

impl From<EntryId> for EntrySelector {
    fn from(id: EntryId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for EntrySelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for EntrySelector {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl std::fmt::Display for EntrySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Name(name) => write!(f, "'{}'", name),
        }
    }
}

// ============================================================================
// TransformerRegistration - 등록 요청
// ============================================================================

/// 등록 요청
///
/// `transformer`는 등록하는 확장의 자체 객체. Pipeline은 조회용 공유 참조만
/// 보관하고 호출하지 않는다.
pub struct TransformerRegistration<A, C> {
    pub transformer: RuntimeValue,
    pub name: String,
    pub ast_hook: Option<AstHook<A>>,
    pub code_hook: Option<CodeHook<C>>,
}

impl<A, C> TransformerRegistration<A, C> {
    /// Hook 없는 등록 요청 생성
    pub fn new(transformer: RuntimeValue, name: impl Into<String>) -> Self {
        Self {
            transformer,
            name: name.into(),
            ast_hook: None,
            code_hook: None,
        }
    }

    /// AST hook 설정
    pub fn with_ast_hook(mut self, hook: AstHook<A>) -> Self {
        self.ast_hook = Some(hook);
        self
    }

    /// Code hook 설정
    pub fn with_code_hook(mut self, hook: CodeHook<C>) -> Self {
        self.code_hook = Some(hook);
        self
    }

    /// Hook이 하나라도 있는지
    pub fn has_any_hook(&self) -> bool {
        self.ast_hook.is_some() || self.code_hook.is_some()
    }
}

// ============================================================================
// TransformerEntry
// ============================================================================

/// 등록된 transformer
///
/// Hook은 명시적 Option이다. 없는 hook은 해당 단계에서 건너뛰고, 둘 다
/// 없는 entry는 아무 일도 하지 않는다.
pub struct TransformerEntry<A, C> {
    pub(crate) id: EntryId,
    pub(crate) name: Arc<str>,
    pub(crate) transformer: RuntimeValue,
    pub(crate) ast_hook: Option<AstHook<A>>,
    pub(crate) code_hook: Option<CodeHook<C>>,
    pub(crate) registered_at: DateTime<Utc>,
}

impl<A, C> TransformerEntry<A, C> {
    pub(crate) fn from_registration(id: EntryId, registration: TransformerRegistration<A, C>) -> Self {
        Self {
            id,
            name: Arc::from(registration.name),
            transformer: registration.transformer,
            ast_hook: registration.ast_hook,
            code_hook: registration.code_hook,
            registered_at: Utc::now(),
        }
    }

    /// Entry ID
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// 등록 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 등록한 확장의 객체
    pub fn transformer(&self) -> &RuntimeValue {
        &self.transformer
    }

    /// AST hook
    pub fn ast_hook(&self) -> Option<&AstHook<A>> {
        self.ast_hook.as_ref()
    }

    /// Code hook
    pub fn code_hook(&self) -> Option<&CodeHook<C>> {
        self.code_hook.as_ref()
    }

    /// AST hook 보유 여부
    pub fn has_ast_hook(&self) -> bool {
        self.ast_hook.is_some()
    }

    /// Code hook 보유 여부
    pub fn has_code_hook(&self) -> bool {
        self.code_hook.is_some()
    }

    /// Hook이 하나도 없는지
    pub fn is_noop(&self) -> bool {
        self.ast_hook.is_none() && self.code_hook.is_none()
    }

    /// 등록 시각
    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }
}

impl<A, C> Clone for TransformerEntry<A, C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            transformer: self.transformer.clone(),
            ast_hook: self.ast_hook.clone(),
            code_hook: self.code_hook.clone(),
            registered_at: self.registered_at,
        }
    }
}

impl<A, C> std::fmt::Debug for TransformerEntry<A, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformerEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("transformer", &self.transformer)
            .field("ast_hook", &self.has_ast_hook())
            .field("code_hook", &self.has_code_hook())
            .finish()
    }
}
