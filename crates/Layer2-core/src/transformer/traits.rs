//! Transformer Traits - hook 기능과 pipeline 이벤트

use super::entry::EntryId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Hook - 단일 변환 기능
// ============================================================================

/// 같은 종류의 표현으로 변환
///
/// 두 호출 지점이 같은 기능을 쓴다: AST 단계는 `Hook<Ast>`, code 단계는
/// `Hook<Code>`. 입력을 그대로 반환해도 유효한 변환이다.
pub trait Hook<T>: Send + Sync {
    /// 입력 변환
    fn transform(&self, input: T) -> anyhow::Result<T>;
}

impl<T, F> Hook<T> for F
where
    F: Fn(T) -> anyhow::Result<T> + Send + Sync,
{
    fn transform(&self, input: T) -> anyhow::Result<T> {
        self(input)
    }
}

/// AST 단계 hook
pub type AstHook<A> = Arc<dyn Hook<A>>;

/// Code 단계 hook
pub type CodeHook<C> = Arc<dyn Hook<C>>;

// ============================================================================
// PipelineEvent - pipeline 변경 알림
// ============================================================================

/// Pipeline 변경 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PipelineEvent {
    /// Entry 추가됨
    #[serde(rename_all = "camelCase")]
    Registered {
        id: EntryId,
        name: String,
        has_ast_hook: bool,
        has_code_hook: bool,
    },

    /// Entry 해제됨
    Unregistered { id: EntryId, name: String },

    /// 전체 해제됨
    Cleared { removed: usize },
}

impl PipelineEvent {
    /// 이벤트 대상 transformer 이름
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Registered { name, .. } => Some(name),
            Self::Unregistered { name, .. } => Some(name),
            Self::Cleared { .. } => None,
        }
    }

    /// 이벤트 대상 entry ID
    pub fn id(&self) -> Option<EntryId> {
        match self {
            Self::Registered { id, .. } | Self::Unregistered { id, .. } => Some(*id),
            Self::Cleared { .. } => None,
        }
    }
}

// ============================================================================
// PipelineEventHandler
// ============================================================================

/// Pipeline 이벤트 리스너
///
/// 변경이 게시된 뒤 변경한 스레드에서 동기적으로 호출된다. 핸들러는
/// pipeline을 읽어도 되지만 블로킹하면 안 된다.
pub trait PipelineEventHandler: Send + Sync {
    /// 핸들러 이름
    fn name(&self) -> &str;

    /// 이벤트 처리
    fn handle(&self, event: &PipelineEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_hook() {
        let hook: AstHook<Vec<&'static str>> = Arc::new(|mut ast: Vec<&'static str>| -> anyhow::Result<_> {
            ast.push("A");
            Ok(ast)
        });

        assert_eq!(hook.transform(vec![]).unwrap(), vec!["A"]);
    }

    #[test]
    fn test_event_accessors_and_wire_shape() {
        let event = PipelineEvent::Registered {
            id: EntryId::new(3),
            name: "fold".into(),
            has_ast_hook: true,
            has_code_hook: false,
        };
        assert_eq!(event.name(), Some("fold"));
        assert_eq!(event.id(), Some(EntryId::new(3)));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "registered");
        assert_eq!(json["hasAstHook"], true);

        assert_eq!(PipelineEvent::Cleared { removed: 2 }.name(), None);
    }
}
