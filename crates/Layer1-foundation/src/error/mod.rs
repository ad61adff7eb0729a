//! SysState 에러 타입
//!
//! Registry와 transformer pipeline의 모든 실패는 [`Error`]로 보고되며,
//! 관련된 키 또는 transformer 이름을 포함한다.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;

/// Transformer hook이 실행되는 컴파일 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// 코드 생성 전 AST 변환
    Ast,
    /// 코드 생성 후 code object 변환
    Code,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ast => write!(f, "ast"),
            Self::Code => write!(f, "code"),
        }
    }
}

/// SysState 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Registry
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ========================================================================
    // Transformer pipeline
    // ========================================================================
    #[error("Transformer '{name}' failed during {stage} stage: {source}")]
    TransformerFailure {
        name: String,
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("Code generation failed: {0}")]
    Codegen(#[source] anyhow::Error),

    // ========================================================================
    // Config
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // External
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// 복구 가능한 에러인지 (키 없음만 해당)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// 실패한 transformer 이름 (hook 실패인 경우)
    pub fn transformer_name(&self) -> Option<&str> {
        match self {
            Error::TransformerFailure { name, .. } => Some(name),
            _ => None,
        }
    }

    /// 실패한 hook의 단계 (hook 실패인 경우)
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::TransformerFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Hook 실패 에러 생성
    pub fn transformer_failure(
        name: impl Into<String>,
        stage: Stage,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Error::TransformerFailure {
            name: name.into(),
            stage,
            source: source.into(),
        }
    }

    /// 잘못된 상태 에러 생성
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Error::InvalidState(message.into())
    }

    /// 잘못된 인자 에러 생성
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}
