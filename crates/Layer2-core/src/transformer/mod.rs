//! # Transformer Pipeline
//!
//! 외부에서 등록한 transformer의 순서 있는 목록. 각 transformer는 코드 생성
//! 전 AST, 생성 후 컴파일된 코드를 선택적으로 변환한다.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  StateRegistry                                               │
//! │    "transformers" -> TransformerList (immutable, CAS-swapped)│
//! │                        │                                     │
//! │  TransformerPipeline ──┤ register / unregister / clear       │
//! │                        │                                     │
//! │  PipelineSnapshot  <───┘ snapshot()                          │
//! │    run_ast_stage:  ast  -> A.ast_hook -> B.ast_hook -> ...   │
//! │    codegen                                                   │
//! │    run_code_stage: code -> A.code_hook -> ...                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 사용 예시
//!
//! ```ignore
//! use sysstate_core::transformer::TransformerPipeline;
//!
//! let pipeline = TransformerPipeline::<Ast, Code>::new(registry, config.pipeline)?;
//! pipeline.register(RuntimeValue::new(ext), "tagger", Some(tag_hook), None)?;
//!
//! let code = pipeline.compile_unit(ast, |ast| compiler.generate(ast))?;
//! ```

mod entry;
mod pipeline;
mod snapshot;
mod traits;

pub use entry::{EntryId, EntrySelector, TransformerEntry, TransformerRegistration};
pub use pipeline::TransformerPipeline;
pub use snapshot::{PipelineSnapshot, SnapshotInfo, TransformerInfo};
pub use traits::{AstHook, CodeHook, Hook, PipelineEvent, PipelineEventHandler};
