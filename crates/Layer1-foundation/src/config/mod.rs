//! Config - 런타임 설정
//!
//! - `runtime.rs` - RuntimeConfig / PipelineConfig

mod runtime;

pub use runtime::{PipelineConfig, RuntimeConfig, SYSSTATE_CONFIG_FILE};
