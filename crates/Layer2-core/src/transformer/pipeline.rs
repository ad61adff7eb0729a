//! Transformer Pipeline - 컴파일 시점 transformer의 순서 있는 등록
//!
//! 목록은 [`StateRegistry`]의 well-known `transformers` 키 아래 불변
//! [`TransformerList`]로 저장된다. 모든 변경은 새 목록을 만들어 그 키에
//! compare-and-swap으로 게시하므로, 하나의 registry 위의 여러 pipeline
//! 핸들이 선형화 가능하게 유지되고 읽기는 항상 완전한 목록을 본다.
//!
//! Entry ID는 registry 일련번호(`StateRegistry::next_serial`)에서 발급한다.
//! 목록 값을 지워도 ID가 다시 1부터 시작하지 않는다.

use super::entry::{EntryId, EntrySelector, TransformerEntry, TransformerRegistration};
use super::snapshot::{PipelineSnapshot, TransformerList};
use super::traits::{AstHook, CodeHook, PipelineEvent, PipelineEventHandler};
use parking_lot::{Mutex, RwLock};
use std::marker::PhantomData;
use std::sync::Arc;
use sysstate_foundation::{
    Error, Identifier, PipelineConfig, Result, RuntimeValue, StateRegistry, WellKnownKey,
};
use tracing::{debug, info, trace, warn};

/// 순서 있는 thread-safe transformer pipeline
///
/// `A`는 AST hook에 전달되는 AST 표현, `C`는 code hook에 전달되는 컴파일된
/// 코드 표현.
///
/// ## 사용 예시
///
/// ```ignore
/// let pipeline = TransformerPipeline::<Ast, Code>::new(registry, PipelineConfig::default())?;
/// pipeline.register(RuntimeValue::new(my_ext), "fold", Some(fold_hook), None)?;
///
/// let snapshot = pipeline.snapshot()?;
/// let ast = snapshot.run_ast_stage(ast)?;
/// ```
pub struct TransformerPipeline<A, C> {
    registry: Arc<StateRegistry>,

    /// 사전 해석된 `transformers` 키
    key: Identifier,

    config: PipelineConfig,

    /// 이 핸들을 통한 쓰기 직렬화
    write_lock: Mutex<()>,

    handlers: RwLock<Vec<Arc<dyn PipelineEventHandler>>>,

    _types: PhantomData<fn(A, C) -> (A, C)>,
}

impl<A: 'static, C: 'static> TransformerPipeline<A, C> {
    /// 실행 중인 registry에 연결
    ///
    /// `transformers` 키가 비어 있으면 빈 목록을 넣고, 있으면 기존 목록을
    /// 그대로 사용한다.
    pub fn new(registry: Arc<StateRegistry>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let key = registry.well_known(WellKnownKey::Transformers)?;

        let pipeline = Self {
            registry,
            key,
            config,
            write_lock: Mutex::new(()),
            handlers: RwLock::new(Vec::new()),
            _types: PhantomData,
        };

        let (current, list) = pipeline.load()?;
        if current.is_none() {
            let seeded = pipeline.registry.compare_and_set_by_identifier(
                &pipeline.key,
                None,
                RuntimeValue::new(TransformerList::<A, C>::empty()),
            )?;
            if seeded {
                debug!("[{}] Seeded empty transformer list", pipeline.registry.id());
            }
        } else {
            debug!(
                "[{}] Attached to existing transformer list ({} entries)",
                pipeline.registry.id(),
                list.entries.len()
            );
        }

        Ok(pipeline)
    }

    /// 연결된 registry
    pub fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }

    /// 등록 정책
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ========================================================================
    // 등록 / 해제
    // ========================================================================

    /// Transformer 등록 (실행 순서 = 등록 순서)
    pub fn register(
        &self,
        transformer: RuntimeValue,
        name: impl Into<String>,
        ast_hook: Option<AstHook<A>>,
        code_hook: Option<CodeHook<C>>,
    ) -> Result<EntryId> {
        self.register_entry(TransformerRegistration {
            transformer,
            name: name.into(),
            ast_hook,
            code_hook,
        })
    }

    /// 준비된 registration으로 등록
    pub fn register_entry(&self, registration: TransformerRegistration<A, C>) -> Result<EntryId> {
        if registration.name.is_empty() {
            return Err(Error::invalid_argument("transformer name must not be empty"));
        }
        if self.config.require_hook && !registration.has_any_hook() {
            return Err(Error::invalid_argument(format!(
                "transformer '{}' provides neither an AST hook nor a code hook",
                registration.name
            )));
        }

        let id = EntryId::new(self.registry.next_serial()?);
        let template = TransformerEntry::from_registration(id, registration);
        let name = template.name().to_string();

        let duplicate = self.update(|list| {
            if let Some(max) = self.config.max_transformers {
                if list.entries.len() >= max {
                    return Err(Error::invalid_argument(format!(
                        "cannot register '{}': pipeline is full ({} transformers)",
                        name, max
                    )));
                }
            }

            let duplicate = list.entries.iter().any(|e| e.name() == name);
            if duplicate && self.config.unique_names {
                return Err(Error::invalid_argument(format!(
                    "transformer '{}' is already registered",
                    name
                )));
            }

            let mut next = list.clone();
            next.entries.push(template.clone());

            Ok((Some(next), duplicate))
        })?;

        if duplicate {
            warn!(
                "[{}] Transformer '{}' registered more than once",
                self.registry.id(),
                name
            );
        }
        info!(
            "[{}] Registered transformer '{}' as {} (ast: {}, code: {})",
            self.registry.id(),
            name,
            id,
            template.has_ast_hook(),
            template.has_code_hook()
        );

        self.emit(PipelineEvent::Registered {
            id,
            name,
            has_ast_hook: template.has_ast_hook(),
            has_code_hook: template.has_code_hook(),
        });

        Ok(id)
    }

    /// `selector`와 일치하는 첫 entry 해제
    ///
    /// 일치하는 항목이 없으면 목록을 건드리지 않고 `false`를 반환한다.
    pub fn unregister(&self, selector: impl Into<EntrySelector>) -> Result<bool> {
        let selector = selector.into();

        let removed = self.update(|list| {
            let Some(index) = list.entries.iter().position(|e| selector.matches(e)) else {
                return Ok((None, None));
            };

            let mut next = list.clone();
            let entry = next.entries.remove(index);
            Ok((Some(next), Some((entry.id(), entry.name().to_string()))))
        })?;

        match removed {
            Some((id, name)) => {
                info!(
                    "[{}] Unregistered transformer '{}' ({})",
                    self.registry.id(),
                    name,
                    id
                );
                self.emit(PipelineEvent::Unregistered { id, name });
                Ok(true)
            }
            None => {
                debug!(
                    "[{}] No transformer matched {}",
                    self.registry.id(),
                    selector
                );
                Ok(false)
            }
        }
    }

    /// 전체 해제 (해제된 개수 반환)
    pub fn clear(&self) -> Result<usize> {
        let removed = self.update(|list| {
            if list.entries.is_empty() {
                return Ok((None, 0));
            }

            Ok((Some(TransformerList::empty()), list.entries.len()))
        })?;

        if removed > 0 {
            info!(
                "[{}] Cleared {} transformers",
                self.registry.id(),
                removed
            );
            self.emit(PipelineEvent::Cleared { removed });
        }
        Ok(removed)
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 특정 시점의 일관된 pipeline 뷰
    pub fn snapshot(&self) -> Result<PipelineSnapshot<A, C>> {
        let (_, list) = self.load()?;
        Ok(PipelineSnapshot::new(list))
    }

    /// 등록된 transformer 수
    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.1.entries.len())
    }

    /// 비어있는지
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// `name`으로 등록된 entry가 있는지
    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.load()?.1.entries.iter().any(|e| e.name() == name))
    }

    // ========================================================================
    // 단계 실행
    // ========================================================================

    /// 현재 snapshot으로 AST 단계 실행
    pub fn run_ast_stage(&self, ast: A) -> Result<A> {
        self.snapshot()?.run_ast_stage(ast)
    }

    /// 현재 snapshot으로 code 단계 실행
    pub fn run_code_stage(&self, code: C) -> Result<C> {
        self.snapshot()?.run_code_stage(code)
    }

    /// Unit 하나 컴파일 (두 단계가 같은 snapshot 사용)
    pub fn compile_unit<F>(&self, ast: A, codegen: F) -> Result<C>
    where
        F: FnOnce(A) -> anyhow::Result<C>,
    {
        let snapshot = self.snapshot()?;
        trace!(
            "[{}] Compiling unit through {} transformers",
            self.registry.id(),
            snapshot.len()
        );
        snapshot.compile_unit(ast, codegen)
    }

    // ========================================================================
    // 이벤트
    // ========================================================================

    /// 이벤트 핸들러 추가
    pub fn add_handler(&self, handler: Arc<dyn PipelineEventHandler>) {
        debug!(
            "[{}] Added pipeline handler '{}'",
            self.registry.id(),
            handler.name()
        );
        self.handlers.write().push(handler);
    }

    fn emit(&self, event: PipelineEvent) {
        let handlers = self.handlers.read().clone();
        for handler in handlers {
            trace!("Dispatching {:?} to '{}'", event, handler.name());
            handler.handle(&event);
        }
    }

    // ========================================================================
    // 목록 저장소
    // ========================================================================

    /// 현재 목록과 그 목록을 담은 registry 값
    ///
    /// 값이 없으면 빈 목록으로 읽는다.
    fn load(&self) -> Result<(Option<RuntimeValue>, Arc<TransformerList<A, C>>)> {
        match self.registry.get_by_identifier(&self.key) {
            Ok(value) => {
                let list = value.downcast::<TransformerList<A, C>>().ok_or_else(|| {
                    Error::invalid_state(format!(
                        "'{}' holds {}, not a transformer list for this pipeline",
                        self.key.name(),
                        value.type_name()
                    ))
                })?;
                Ok((Some(value), list))
            }
            Err(Error::NotFound(_)) => Ok((None, Arc::new(TransformerList::empty()))),
            Err(e) => Err(e),
        }
    }

    /// Copy-on-write 갱신
    ///
    /// `apply`는 교체할 목록(`None`이면 변경 없음)과 결과를 반환한다.
    /// 다른 핸들이 먼저 게시하면 여러 번 실행될 수 있다.
    fn update<R>(
        &self,
        mut apply: impl FnMut(&TransformerList<A, C>) -> Result<(Option<TransformerList<A, C>>, R)>,
    ) -> Result<R> {
        let _writer = self.write_lock.lock();

        loop {
            let (current, list) = self.load()?;
            let (next, result) = apply(&list)?;
            let Some(next) = next else {
                return Ok(result);
            };

            if self.registry.compare_and_set_by_identifier(
                &self.key,
                current.as_ref(),
                RuntimeValue::new(next),
            )? {
                return Ok(result);
            }
            trace!(
                "[{}] Transformer list changed concurrently, retrying",
                self.registry.id()
            );
        }
    }
}

impl<A, C> std::fmt::Debug for TransformerPipeline<A, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformerPipeline")
            .field("registry", &self.registry.id())
            .field("config", &self.config)
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}
