//! 설정 관리 — netsync.toml 파싱 및 런타임 설정
//!
//! [`NetsyncConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`NETSYNC_INVENTORY_URL=https://netbox.local` 형식)
//! 3. 설정 파일 (`netsync.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 인벤토리 모드 선택
//!
//! `[inventory]`의 `url`과 `token`이 모두 설정되어 있으면 Live 모드,
//! 하나라도 비어 있으면 Degraded 모드(변경 사항을 로그로만 기록)로 동작합니다.
//! 자격 증명이 없는 것은 에러가 아닙니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), netsync_core::error::NetsyncError> {
//! use netsync_core::config::NetsyncConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = NetsyncConfig::load("netsync.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = NetsyncConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, NetsyncError};

/// 대상 수 상한의 최대 허용값
const MAX_TARGETS_LIMIT: usize = 65_536;

/// 동시 작업자 수 최대 허용값
const MAX_CONCURRENCY_LIMIT: usize = 256;

/// 인벤토리 호출 타임아웃 최대값 (초)
const MAX_TIMEOUT_SECS: u64 = 300;

/// netsync 통합 설정
///
/// `netsync.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetsyncConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// HTTP API 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 인벤토리 백엔드 설정
    #[serde(default)]
    pub inventory: InventoryConfig,
    /// 디스커버리 데이터셋 설정
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// 조정 엔진 설정
    #[serde(default)]
    pub engine: EngineConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl NetsyncConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, NetsyncError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 기본값에 환경변수 오버라이드만 적용한 설정을 생성합니다.
    ///
    /// 설정 파일 없이 실행할 때 사용합니다.
    pub fn from_env() -> Result<Self, NetsyncError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, NetsyncError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NetsyncError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                NetsyncError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, NetsyncError> {
        toml::from_str(toml_str).map_err(|e| {
            NetsyncError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `NETSYNC_{SECTION}_{FIELD}`
    /// 예: `NETSYNC_INVENTORY_TOKEN=0123abcd`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "NETSYNC_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "NETSYNC_GENERAL_LOG_FORMAT");

        // Server
        override_string(&mut self.server.listen_addr, "NETSYNC_SERVER_LISTEN_ADDR");
        override_u16(&mut self.server.port, "NETSYNC_SERVER_PORT");

        // Inventory
        override_string(&mut self.inventory.url, "NETSYNC_INVENTORY_URL");
        override_string(&mut self.inventory.token, "NETSYNC_INVENTORY_TOKEN");
        override_u64(
            &mut self.inventory.timeout_secs,
            "NETSYNC_INVENTORY_TIMEOUT_SECS",
        );
        override_usize(&mut self.inventory.pool_size, "NETSYNC_INVENTORY_POOL_SIZE");
        override_u32(
            &mut self.inventory.max_retries,
            "NETSYNC_INVENTORY_MAX_RETRIES",
        );
        override_u64(
            &mut self.inventory.retry_backoff_ms,
            "NETSYNC_INVENTORY_RETRY_BACKOFF_MS",
        );
        override_opt_u64(
            &mut self.inventory.device_type_id,
            "NETSYNC_INVENTORY_DEVICE_TYPE_ID",
        );
        override_opt_u64(&mut self.inventory.role_id, "NETSYNC_INVENTORY_ROLE_ID");
        override_opt_u64(&mut self.inventory.site_id, "NETSYNC_INVENTORY_SITE_ID");

        // Discovery
        override_string(
            &mut self.discovery.dataset_path,
            "NETSYNC_DISCOVERY_DATASET_PATH",
        );
        override_usize(
            &mut self.discovery.max_targets,
            "NETSYNC_DISCOVERY_MAX_TARGETS",
        );

        // Engine
        override_usize(
            &mut self.engine.max_concurrency,
            "NETSYNC_ENGINE_MAX_CONCURRENCY",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "NETSYNC_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "NETSYNC_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "NETSYNC_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), NetsyncError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.server.listen_addr.is_empty() {
            return Err(invalid("server.listen_addr", "must not be empty"));
        }

        // 인벤토리 URL은 설정된 경우에만 검증 (비어 있으면 Degraded 모드)
        if !self.inventory.url.is_empty()
            && !(self.inventory.url.starts_with("http://")
                || self.inventory.url.starts_with("https://"))
        {
            return Err(invalid(
                "inventory.url",
                "must start with http:// or https://",
            ));
        }

        if self.inventory.timeout_secs == 0 || self.inventory.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(invalid(
                "inventory.timeout_secs",
                format!("must be 1-{MAX_TIMEOUT_SECS}"),
            ));
        }

        if self.inventory.pool_size == 0 || self.inventory.pool_size > MAX_CONCURRENCY_LIMIT {
            return Err(invalid(
                "inventory.pool_size",
                format!("must be 1-{MAX_CONCURRENCY_LIMIT}"),
            ));
        }

        if self.inventory.max_retries > 10 {
            return Err(invalid("inventory.max_retries", "must be 0-10"));
        }

        if self.discovery.max_targets == 0 || self.discovery.max_targets > MAX_TARGETS_LIMIT {
            return Err(invalid(
                "discovery.max_targets",
                format!("must be 1-{MAX_TARGETS_LIMIT}"),
            ));
        }

        if self.engine.max_concurrency == 0 || self.engine.max_concurrency > MAX_CONCURRENCY_LIMIT
        {
            return Err(invalid(
                "engine.max_concurrency",
                format!("must be 1-{MAX_CONCURRENCY_LIMIT}"),
            ));
        }

        if self.metrics.enabled && self.metrics.endpoint != "/metrics" {
            return Err(invalid(
                "metrics.endpoint",
                "only '/metrics' is supported",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> NetsyncError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// HTTP API 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_owned(),
            port: 8000,
        }
    }
}

/// 인벤토리 백엔드 설정
///
/// `token`은 `Debug` 출력에서 가려집니다.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// REST API 기본 주소 (예: `https://netbox.example.net`)
    pub url: String,
    /// 정적 API 토큰
    pub token: String,
    /// 호출당 타임아웃 (초)
    pub timeout_secs: u64,
    /// 아웃바운드 연결 풀 크기 (동시 호출 상한)
    pub pool_size: usize,
    /// 읽기 호출의 최대 재시도 횟수
    pub max_retries: u32,
    /// 재시도 백오프 기본 간격 (밀리초)
    pub retry_backoff_ms: u64,
    /// 장치 생성 시 포함할 device type ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type_id: Option<u64>,
    /// 장치 생성 시 포함할 role ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<u64>,
    /// 장치 생성 시 포함할 site ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<u64>,
}

impl InventoryConfig {
    /// Live 모드에 필요한 자격 증명이 모두 있는지 확인합니다.
    pub fn has_credentials(&self) -> bool {
        !self.url.trim().is_empty() && !self.token.trim().is_empty()
    }

    /// 토큰을 가린 사본을 반환합니다.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.token.is_empty() {
            copy.token = "***REDACTED***".to_owned();
        }
        copy
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            timeout_secs: 10,
            pool_size: 16,
            max_retries: 2,
            retry_backoff_ms: 200,
            device_type_id: None,
            role_id: None,
            site_id: None,
        }
    }
}

impl fmt::Debug for InventoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryConfig")
            .field("url", &self.url)
            .field(
                "token",
                &if self.token.is_empty() { "" } else { "***REDACTED***" },
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("pool_size", &self.pool_size)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("device_type_id", &self.device_type_id)
            .field("role_id", &self.role_id)
            .field("site_id", &self.site_id)
            .finish()
    }
}

/// 디스커버리 데이터셋 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// 정적 디스커버리 데이터셋(JSON) 경로
    pub dataset_path: String,
    /// 요청 하나가 확장할 수 있는 최대 대상 수
    pub max_targets: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            dataset_path: "/etc/netsync/discovery.json".to_owned(),
            max_targets: 4096,
        }
    }
}

/// 조정 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 동시에 처리할 최대 대상 수
    pub max_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_concurrency: 8 }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u32(target: &mut u32, env_key: &str) {
    override_parsed(target, env_key, "u32");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_opt_u64(target: &mut Option<u64>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        if val.trim().is_empty() {
            *target = None;
            return;
        }
        match val.parse::<u64>() {
            Ok(parsed) => *target = Some(parsed),
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
