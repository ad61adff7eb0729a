//! Interpreter - registry 하나와 그 transformer pipeline의 소유자
//!
//! 인터프리터마다 자체 [`StateRegistry`]를 가지며, 같은 프로세스의
//! 인터프리터끼리 공유하는 상태는 없다.

use crate::transformer::{PipelineSnapshot, TransformerPipeline};
use std::sync::Arc;
use sysstate_foundation::{RegistryId, Result, RuntimeConfig, StateRegistry};
use tracing::{info, warn};

/// 인터프리터 인스턴스 하나의 전역 상태
pub struct Interpreter<A, C> {
    config: RuntimeConfig,
    registry: Arc<StateRegistry>,
    pipeline: TransformerPipeline<A, C>,
}

impl<A: 'static, C: 'static> Interpreter<A, C> {
    /// Registry 생성/초기화 후 빈 pipeline 연결
    ///
    /// 빌더로 만든 설정도 여기서 검증한다.
    pub fn start(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(StateRegistry::new());
        registry.initialize()?;

        let pipeline = TransformerPipeline::new(Arc::clone(&registry), config.pipeline.clone())?;
        info!("[{}] Interpreter started", registry.id());

        Ok(Self {
            config,
            registry,
            pipeline,
        })
    }

    /// Registry ID (인터프리터 식별용)
    pub fn id(&self) -> RegistryId {
        self.registry.id()
    }

    /// 시작 시 사용한 설정
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// 인터프리터 전역 registry
    pub fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }

    /// Transformer pipeline
    pub fn pipeline(&self) -> &TransformerPipeline<A, C> {
        &self.pipeline
    }

    /// 실행 중인지
    pub fn is_running(&self) -> bool {
        self.registry.is_running()
    }

    /// 컴파일용 snapshot
    pub fn snapshot(&self) -> Result<PipelineSnapshot<A, C>> {
        self.pipeline.snapshot()
    }

    /// 현재 pipeline으로 unit 하나 컴파일
    pub fn compile_unit<F>(&self, ast: A, codegen: F) -> Result<C>
    where
        F: FnOnce(A) -> anyhow::Result<C>,
    {
        self.pipeline.compile_unit(ast, codegen)
    }

    /// Pipeline 비우고 registry 종료
    ///
    /// 이미 종료된 경우 `InvalidState`.
    pub fn shutdown(&self) -> Result<()> {
        let removed = self.pipeline.clear()?;
        self.registry.finalize()?;
        info!(
            "[{}] Interpreter shut down ({} transformers released)",
            self.registry.id(),
            removed
        );
        Ok(())
    }
}

impl<A, C> Drop for Interpreter<A, C> {
    fn drop(&mut self) {
        if self.registry.is_running() {
            if let Err(e) = self.registry.finalize() {
                warn!("[{}] Finalize on drop failed: {}", self.registry.id(), e);
            }
        }
    }
}

impl<A, C> std::fmt::Debug for Interpreter<A, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("registry", &self.registry.id())
            .field("state", &self.registry.state())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysstate_foundation::{Error, RegistryState, RuntimeValue};

    type Interp = Interpreter<Vec<String>, Vec<u8>>;

    #[test]
    fn test_start_and_shutdown() {
        let interp = Interp::start(RuntimeConfig::default()).unwrap();
        assert!(interp.is_running());
        assert!(interp.pipeline().is_empty().unwrap());

        interp
            .pipeline()
            .register(RuntimeValue::new(()), "a", None, None)
            .unwrap();
        interp.shutdown().unwrap();

        assert_eq!(interp.registry().state(), RegistryState::Finalized);
        assert!(matches!(interp.shutdown().unwrap_err(), Error::InvalidState(_)));
    }

    #[test]
    fn test_config_reaches_pipeline() {
        let interp = Interp::start(RuntimeConfig::new().require_hook(true)).unwrap();
        assert!(interp.config().pipeline.require_hook);

        let err = interp
            .pipeline()
            .register(RuntimeValue::new(()), "inert", None, None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_start_rejects_invalid_builder_config() {
        let err = Interp::start(RuntimeConfig::new().max_transformers(0)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_default_config_matches_new() {
        let interp = Interp::start(RuntimeConfig::default()).unwrap();
        assert_eq!(interp.config(), &RuntimeConfig::new());
        assert_eq!(interp.config().version, 1);
    }

    #[test]
    fn test_drop_finalizes_registry() {
        let interp = Interp::start(RuntimeConfig::default()).unwrap();
        let registry = Arc::clone(interp.registry());
        drop(interp);

        assert_eq!(registry.state(), RegistryState::Finalized);
    }

    #[test]
    fn test_interpreters_are_independent() {
        let first = Interp::start(RuntimeConfig::default()).unwrap();
        let second = Interp::start(RuntimeConfig::default()).unwrap();
        assert_ne!(first.id(), second.id());

        first
            .pipeline()
            .register(RuntimeValue::new(()), "only-first", None, None)
            .unwrap();

        assert_eq!(first.pipeline().len().unwrap(), 1);
        assert!(second.pipeline().is_empty().unwrap());
    }
}
