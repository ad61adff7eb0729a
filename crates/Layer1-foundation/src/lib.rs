//! # sysstate-foundation
//!
//! SysState 기반 레이어:
//! - Error: 공통 에러 타입 (NotFound / InvalidState / InvalidArgument / TransformerFailure)
//! - Config: RuntimeConfig, pipeline 등록 정책
//! - Registry: StateRegistry, Identifier 핸들, RuntimeValue
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  StateRegistry                                          │
//! │  ├── IdentifierTable   name -> slot                     │
//! │  └── slots             ArcSwapOption<RuntimeValue>      │
//! │        0 argv   1 path   2 warnoptions                  │
//! │        3 xoptions        4 transformers   5.. custom    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod registry;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result, Stage};

// ============================================================================
// Config
// ============================================================================
pub use config::{PipelineConfig, RuntimeConfig, SYSSTATE_CONFIG_FILE};

// ============================================================================
// Registry
// ============================================================================
pub use registry::{
    Identifier,
    RegistryId,
    RegistryState,
    RuntimeValue,
    StateRegistry,
    WellKnownKey,
    // Key names
    KEY_ARGV,
    KEY_PATH,
    KEY_TRANSFORMERS,
    KEY_WARNOPTIONS,
    KEY_XOPTIONS,
};
