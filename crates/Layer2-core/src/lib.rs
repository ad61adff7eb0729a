//! sysstate-core: Core Runtime for SysState
//!
//! Layer2 - foundation registry 위의 컴파일 시점 확장 계약
//!
//! # 주요 모듈
//!
//! - `transformer`: 순서 있는 transformer pipeline, AST 단계/code 단계 hook
//! - `interpreter`: 인터프리터별 registry와 pipeline 소유자
//!
//! # 사용 예시
//!
//! ```ignore
//! use sysstate_core::{Interpreter, RuntimeConfig, RuntimeValue};
//!
//! let interp = Interpreter::<Ast, Code>::start(RuntimeConfig::load_dir(".")?)?;
//!
//! // 확장이 자신을 등록
//! interp.pipeline().register(
//!     RuntimeValue::new(my_extension),
//!     "constant-folder",
//!     Some(Arc::new(|ast: Ast| -> anyhow::Result<Ast> { Ok(fold(ast)) })),
//!     None,
//! )?;
//!
//! // 컴파일러는 snapshot 하나로 두 단계를 실행
//! let code = interp.compile_unit(ast, |ast| codegen(ast))?;
//!
//! interp.shutdown()?;
//! ```

pub mod interpreter;
pub mod transformer;

// Re-exports: Interpreter
pub use interpreter::Interpreter;

// Re-exports: Transformer
pub use transformer::{
    AstHook, CodeHook, EntryId, EntrySelector, Hook, PipelineEvent, PipelineEventHandler,
    PipelineSnapshot, SnapshotInfo, TransformerEntry, TransformerInfo, TransformerPipeline,
    TransformerRegistration,
};

// Re-exports: Foundation
pub use sysstate_foundation::{
    Error, Identifier, PipelineConfig, RegistryState, Result, RuntimeConfig, RuntimeValue, Stage,
    StateRegistry, WellKnownKey,
};
