//! Pipeline Snapshot - 특정 시점의 불변 pipeline 뷰
//!
//! 두 컴파일 단계 모두 snapshot 기준으로 실행되므로, 컴파일 도중의 등록은
//! 해당 unit이 거치는 hook을 바꾸지 않는다.

use super::entry::{EntryId, TransformerEntry};
use super::traits::Hook;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use sysstate_foundation::{Error, Result, Stage};
use tracing::{trace, warn};

// ============================================================================
// TransformerList - value stored under the `transformers` key
// ============================================================================

/// 불변 entry 목록 (변경 시 통째로 교체)
///
/// Entry ID는 registry의 일련번호에서 발급되므로 목록에 카운터를 두지 않는다.
pub(crate) struct TransformerList<A, C> {
    pub(crate) entries: Vec<TransformerEntry<A, C>>,
}

impl<A, C> TransformerList<A, C> {
    pub(crate) fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<A, C> Clone for TransformerList<A, C> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

// ============================================================================
// PipelineSnapshot
// ============================================================================

/// 등록된 transformer의 읽기 전용 순서 뷰
pub struct PipelineSnapshot<A, C> {
    list: Arc<TransformerList<A, C>>,
    taken_at: DateTime<Utc>,
}

impl<A, C> PipelineSnapshot<A, C> {
    pub(crate) fn new(list: Arc<TransformerList<A, C>>) -> Self {
        Self {
            list,
            taken_at: Utc::now(),
        }
    }

    /// 등록 순서대로의 entry 목록
    pub fn entries(&self) -> &[TransformerEntry<A, C>] {
        &self.list.entries
    }

    /// Entry 순회 (등록 순서)
    pub fn iter(&self) -> impl Iterator<Item = &TransformerEntry<A, C>> {
        self.list.entries.iter()
    }

    /// Entry 개수
    pub fn len(&self) -> usize {
        self.list.entries.len()
    }

    /// 비어있는지
    pub fn is_empty(&self) -> bool {
        self.list.entries.is_empty()
    }

    /// 이름 목록 (등록 순서)
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|e| e.name()).collect()
    }

    /// ID로 entry 조회
    pub fn get(&self, id: EntryId) -> Option<&TransformerEntry<A, C>> {
        self.iter().find(|e| e.id() == id)
    }

    /// 이름으로 첫 번째 entry 조회
    pub fn find(&self, name: &str) -> Option<&TransformerEntry<A, C>> {
        self.iter().find(|e| e.name() == name)
    }

    /// Snapshot 생성 시각
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// 도구용 정보 (개수와 entry별 메타데이터)
    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            taken_at: self.taken_at,
            count: self.len(),
            transformers: self.iter().map(TransformerInfo::from).collect(),
        }
    }

    // ========================================================================
    // 단계 실행
    // ========================================================================

    /// 등록 순서대로 모든 AST hook 실행
    ///
    /// 첫 실패에서 중단하며, 부분 변환된 AST는 버린다.
    pub fn run_ast_stage(&self, ast: A) -> Result<A> {
        run_stage(self.entries(), Stage::Ast, ast, |e| e.ast_hook.as_deref())
    }

    /// 등록 순서대로 모든 code hook 실행
    pub fn run_code_stage(&self, code: C) -> Result<C> {
        run_stage(self.entries(), Stage::Code, code, |e| e.code_hook.as_deref())
    }

    /// 이 snapshot 하나로 AST 단계, 코드 생성, code 단계 실행
    pub fn compile_unit<F>(&self, ast: A, codegen: F) -> Result<C>
    where
        F: FnOnce(A) -> anyhow::Result<C>,
    {
        let ast = self.run_ast_stage(ast)?;
        let code = codegen(ast).map_err(Error::Codegen)?;
        self.run_code_stage(code)
    }
}

impl<A, C> Clone for PipelineSnapshot<A, C> {
    fn clone(&self) -> Self {
        Self {
            list: Arc::clone(&self.list),
            taken_at: self.taken_at,
        }
    }
}

impl<A, C> std::fmt::Debug for PipelineSnapshot<A, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineSnapshot")
            .field("taken_at", &self.taken_at)
            .field("entries", &self.list.entries)
            .finish()
    }
}

fn run_stage<A, C, T, F>(
    entries: &[TransformerEntry<A, C>],
    stage: Stage,
    input: T,
    select: F,
) -> Result<T>
where
    F: Fn(&TransformerEntry<A, C>) -> Option<&dyn Hook<T>>,
{
    let mut current = input;

    for entry in entries {
        let Some(hook) = select(entry) else {
            continue;
        };

        let start = Instant::now();
        current = invoke(hook, current).map_err(|err| {
            warn!("Transformer '{}' failed in {} stage: {:#}", entry.name(), stage, err);
            Error::transformer_failure(entry.name(), stage, err)
        })?;
        trace!(
            "Transformer '{}' {} hook took {}us",
            entry.name(),
            stage,
            start.elapsed().as_micros()
        );
    }

    Ok(current)
}

/// Hook 호출 (panic은 일반 hook 에러로 변환)
fn invoke<T>(hook: &dyn Hook<T>, input: T) -> anyhow::Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(|| hook.transform(input))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            Err(anyhow::anyhow!("hook panicked: {}", message))
        }
    }
}

// ============================================================================
// SnapshotInfo - 직렬화 가능한 메타데이터
// ============================================================================

/// 활성 transformer 목록을 보여주는 도구용 snapshot 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotInfo {
    pub taken_at: DateTime<Utc>,
    pub count: usize,
    pub transformers: Vec<TransformerInfo>,
}

impl SnapshotInfo {
    /// JSON 문자열로 변환
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Entry별 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformerInfo {
    pub id: EntryId,
    pub name: String,
    pub has_ast_hook: bool,
    pub has_code_hook: bool,
    pub registered_at: DateTime<Utc>,
}

impl<A, C> From<&TransformerEntry<A, C>> for TransformerInfo {
    fn from(entry: &TransformerEntry<A, C>) -> Self {
        Self {
            id: entry.id(),
            name: entry.name().to_string(),
            has_ast_hook: entry.has_ast_hook(),
            has_code_hook: entry.has_code_hook(),
            registered_at: entry.registered_at(),
        }
    }
}
