//! Runtime Config - 인터프리터 전역 설정
//!
//! `sysstate.json`에서 로드하는 transformer pipeline 정책

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 설정 파일명
pub const SYSSTATE_CONFIG_FILE: &str = "sysstate.json";

// ============================================================================
// Runtime Config
// ============================================================================

/// 인터프리터 전역 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// Transformer pipeline 정책
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// 기본 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // 로드
    // ========================================================================

    /// JSON 문자열에서 파싱 (검증 포함)
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RuntimeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 파일에서 로드 (파일이 없으면 기본값)
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 디렉토리의 `sysstate.json` 로드
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::load_from(dir.as_ref().join(SYSSTATE_CONFIG_FILE))
    }

    /// 설정 값 검증
    ///
    /// 빌더로 만든 설정도 인터프리터 시작 시 여기를 거친다.
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()
    }

    // ========================================================================
    // 병합
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: RuntimeConfig) {
        self.pipeline.merge(other.pipeline);
    }

    // ========================================================================
    // 빌더
    // ========================================================================

    /// Hook 없는 등록 거부 여부
    pub fn require_hook(mut self, enabled: bool) -> Self {
        self.pipeline.require_hook = enabled;
        self
    }

    /// 이름 중복 거부 여부
    pub fn unique_names(mut self, enabled: bool) -> Self {
        self.pipeline.unique_names = enabled;
        self
    }

    /// 최대 transformer 수 (0은 `validate`에서 거부)
    pub fn max_transformers(mut self, max: usize) -> Self {
        self.pipeline.max_transformers = Some(max);
        self
    }
}

// ============================================================================
// Pipeline Config
// ============================================================================

/// Transformer pipeline 등록 정책
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// AST hook과 code hook이 모두 없는 등록 거부
    #[serde(default)]
    pub require_hook: bool,

    /// 이미 등록된 이름의 재등록 거부
    #[serde(default)]
    pub unique_names: bool,

    /// 등록 가능한 transformer 상한
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_transformers: Option<usize>,
}

impl PipelineConfig {
    /// 정책 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.max_transformers == Some(0) {
            return Err(Error::Config(
                "pipeline.maxTransformers must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn merge(&mut self, other: PipelineConfig) {
        self.require_hook = other.require_hook;
        self.unique_names = other.unique_names;
        if other.max_transformers.is_some() {
            self.max_transformers = other.max_transformers;
        }
    }
}

fn default_version() -> u32 {
    1
}
