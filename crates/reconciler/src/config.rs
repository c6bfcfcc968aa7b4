//! 조정 엔진 설정
//!
//! [`ReconcilerConfig`]는 core의 [`NetsyncConfig`]에서
//! 엔진, 디스커버리, 인벤토리 섹션을 모아 조정 엔진 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use netsync_core::config::NetsyncConfig;
//! use netsync_reconciler::config::ReconcilerConfig;
//!
//! let core_config = NetsyncConfig::default();
//! let config = ReconcilerConfig::from_core(&core_config);
//! ```

use netsync_core::config::{InventoryConfig, NetsyncConfig};
use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// 설정 상한값 상수
const MAX_CONCURRENCY: usize = 256;
const MAX_TARGETS: usize = 65_536;
const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_POOL_SIZE: usize = 256;
const MAX_RETRIES: u32 = 10;
const MAX_RETRY_BACKOFF_MS: u64 = 30_000;

/// 조정 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// 동시에 처리할 최대 대상 수
    pub max_concurrency: usize,
    /// 요청 하나가 확장할 수 있는 최대 대상 수
    pub max_targets: usize,
    /// 디스커버리 데이터셋 경로
    pub dataset_path: String,
    /// 인벤토리 백엔드 설정 (토큰은 Debug 출력에서 가려짐)
    pub inventory: InventoryConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::from_core(&NetsyncConfig::default())
    }
}

impl ReconcilerConfig {
    /// core의 `NetsyncConfig`에서 엔진 설정을 생성합니다.
    pub fn from_core(core: &NetsyncConfig) -> Self {
        Self {
            max_concurrency: core.engine.max_concurrency,
            max_targets: core.discovery.max_targets,
            dataset_path: core.discovery.dataset_path.clone(),
            inventory: core.inventory.clone(),
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), InventoryError> {
        if self.max_concurrency == 0 || self.max_concurrency > MAX_CONCURRENCY {
            return Err(InventoryError::Config {
                field: "max_concurrency".to_owned(),
                reason: format!("must be 1-{MAX_CONCURRENCY}"),
            });
        }

        if self.max_targets == 0 || self.max_targets > MAX_TARGETS {
            return Err(InventoryError::Config {
                field: "max_targets".to_owned(),
                reason: format!("must be 1-{MAX_TARGETS}"),
            });
        }

        if self.inventory.timeout_secs == 0 || self.inventory.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(InventoryError::Config {
                field: "timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
            });
        }

        if self.inventory.pool_size == 0 || self.inventory.pool_size > MAX_POOL_SIZE {
            return Err(InventoryError::Config {
                field: "pool_size".to_owned(),
                reason: format!("must be 1-{MAX_POOL_SIZE}"),
            });
        }

        if self.inventory.max_retries > MAX_RETRIES {
            return Err(InventoryError::Config {
                field: "max_retries".to_owned(),
                reason: format!("must be 0-{MAX_RETRIES}"),
            });
        }

        if self.inventory.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
            return Err(InventoryError::Config {
                field: "retry_backoff_ms".to_owned(),
                reason: format!("must be 0-{MAX_RETRY_BACKOFF_MS}"),
            });
        }

        Ok(())
    }
}

/// 엔진 설정 빌더
#[derive(Default)]
pub struct ReconcilerConfigBuilder {
    config: ReconcilerConfig,
}

impl ReconcilerConfigBuilder {
    /// 기본값에서 시작하는 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// core 설정값에서 시작하는 빌더를 생성합니다.
    pub fn from_core(core: &NetsyncConfig) -> Self {
        Self {
            config: ReconcilerConfig::from_core(core),
        }
    }

    /// 동시 처리 대상 수
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.config.max_concurrency = max;
        self
    }

    /// 대상 수 상한
    pub fn max_targets(mut self, max: usize) -> Self {
        self.config.max_targets = max;
        self
    }

    /// 데이터셋 경로
    pub fn dataset_path(mut self, path: impl Into<String>) -> Self {
        self.config.dataset_path = path.into();
        self
    }

    /// 인벤토리 REST API 주소
    pub fn inventory_url(mut self, url: impl Into<String>) -> Self {
        self.config.inventory.url = url.into();
        self
    }

    /// 인벤토리 API 토큰
    pub fn inventory_token(mut self, token: impl Into<String>) -> Self {
        self.config.inventory.token = token.into();
        self
    }

    /// 인벤토리 호출 타임아웃 (초)
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.inventory.timeout_secs = secs;
        self
    }

    /// 연결 풀 크기
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.inventory.pool_size = size;
        self
    }

    /// 읽기 호출 재시도 횟수
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.inventory.max_retries = retries;
        self
    }

    /// 재시도 백오프 기본 간격 (밀리초)
    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.inventory.retry_backoff_ms = ms;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<ReconcilerConfig, InventoryError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
