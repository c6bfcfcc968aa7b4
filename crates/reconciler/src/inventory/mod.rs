//! 인벤토리 클라이언트 — 외부 인벤토리 시스템과의 최소 접점
//!
//! 엔진은 [`InventoryClient`] trait만 알며, 모드에 따라 분기하지 않습니다.
//!
//! # 구현체
//!
//! - [`LiveInventory`]: NetBox 호환 REST API 호출 (`reqwest`)
//! - [`DegradedInventory`]: 네트워크 I/O 없이 변경 의도를 감사 로그로만 기록
//! - [`MemoryInventory`]: 결정적 테스트용 인메모리 상태, 장애/지연 주입 지원
//!
//! 실행 시 구현체는 [`InventoryBackend::from_config`]로 한 번 선택됩니다.
//!
//! # 감사 기록
//!
//! Live/Degraded 모드 모두 변경 호출 직전에 `netsync::audit` 타깃으로
//! 구조화된 tracing 레코드를 남깁니다.

mod degraded;
mod live;
mod memory;

pub use degraded::DegradedInventory;
pub use live::LiveInventory;
pub use memory::{InjectedFailure, MemoryInventory};

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use metrics::{counter, histogram};
use netsync_core::config::InventoryConfig;
use netsync_core::metrics as m;
use netsync_core::types::{InventoryDeviceRef, InventoryInterfaceRef, InventoryMode};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::InventoryError;

/// 호출 종류 이름 (로그/메트릭 레이블)
pub mod operation {
    pub const FIND_DEVICE: &str = "find_device";
    pub const CREATE_DEVICE: &str = "create_device";
    pub const FIND_INTERFACES: &str = "find_interfaces";
    pub const ENSURE_INTERFACE: &str = "ensure_interface";
    pub const FIND_ADDRESSES: &str = "find_addresses";
    pub const ENSURE_ADDRESS: &str = "ensure_address_assignment";
}

/// 인벤토리 시스템 접근 trait
///
/// 모든 메서드는 `InventoryError`로 실패할 수 있으며, 엔진은 이를 대상 단위로
/// 격리합니다. `ensure_*` 메서드는 멱등적이어야 합니다. 이미 존재하면 변경 없이 성공합니다.
///
/// trait은 `Send + Sync + 'static`이므로 `Arc`로 감싸 여러 작업자가 공유할 수 있습니다.
pub trait InventoryClient: Send + Sync + 'static {
    /// 이 클라이언트의 동작 모드
    fn mode(&self) -> InventoryMode;

    /// 이름으로 장치를 조회합니다.
    ///
    /// 같은 이름의 장치가 여러 개면 `ConflictingState`를 반환합니다.
    fn find_device(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<InventoryDeviceRef>, InventoryError>> + Send;

    /// 장치를 생성합니다.
    ///
    /// `description`은 디스커버리 레코드의 장치 설명이며 주석으로 남습니다.
    fn create_device(
        &self,
        name: &str,
        primary_address: &str,
        description: Option<&str>,
    ) -> impl Future<Output = Result<InventoryDeviceRef, InventoryError>> + Send;

    /// 장치에 등록된 인터페이스 목록
    fn find_interfaces(
        &self,
        device: &InventoryDeviceRef,
    ) -> impl Future<Output = Result<Vec<InventoryInterfaceRef>, InventoryError>> + Send;

    /// 인터페이스가 존재하도록 보장합니다.
    fn ensure_interface(
        &self,
        device: &InventoryDeviceRef,
        name: &str,
    ) -> impl Future<Output = Result<InventoryInterfaceRef, InventoryError>> + Send;

    /// 인터페이스에 할당된 주소 집합 (CIDR 정규형)
    fn find_addresses(
        &self,
        device: &InventoryDeviceRef,
        interface: &InventoryInterfaceRef,
    ) -> impl Future<Output = Result<BTreeSet<String>, InventoryError>> + Send;

    /// 주소가 인터페이스에 할당되도록 보장합니다.
    fn ensure_address_assignment(
        &self,
        device: &InventoryDeviceRef,
        interface: &InventoryInterfaceRef,
        address: &str,
    ) -> impl Future<Output = Result<(), InventoryError>> + Send;
}

/// 실행 시 선택되는 인벤토리 백엔드
///
/// 엔진의 타입 파라미터로 사용되어, 데몬과 CLI가 설정에 따라
/// 같은 엔진 타입으로 Live/Degraded 중 하나를 구동합니다.
pub enum InventoryBackend {
    /// REST API 연동
    Live(LiveInventory),
    /// 로그 전용 모드
    Degraded(DegradedInventory),
}

impl InventoryBackend {
    /// 설정에 따라 백엔드를 선택합니다.
    ///
    /// URL과 토큰이 모두 있으면 Live, 하나라도 없으면 Degraded이며
    /// 이 경우 경고를 한 번 남깁니다.
    pub fn from_config(config: &InventoryConfig) -> Result<Self, InventoryError> {
        if config.has_credentials() {
            let live = LiveInventory::new(config)?;
            info!(url = %config.url, pool_size = config.pool_size, "inventory backend: live");
            Ok(Self::Live(live))
        } else {
            warn!(
                url_set = !config.url.trim().is_empty(),
                token_set = !config.token.trim().is_empty(),
                "inventory url or token not configured, running in degraded (log-only) mode"
            );
            Ok(Self::Degraded(DegradedInventory::new()))
        }
    }
}

impl InventoryClient for InventoryBackend {
    fn mode(&self) -> InventoryMode {
        match self {
            Self::Live(c) => c.mode(),
            Self::Degraded(c) => c.mode(),
        }
    }

    async fn find_device(&self, name: &str) -> Result<Option<InventoryDeviceRef>, InventoryError> {
        match self {
            Self::Live(c) => c.find_device(name).await,
            Self::Degraded(c) => c.find_device(name).await,
        }
    }

    async fn create_device(
        &self,
        name: &str,
        primary_address: &str,
        description: Option<&str>,
    ) -> Result<InventoryDeviceRef, InventoryError> {
        match self {
            Self::Live(c) => c.create_device(name, primary_address, description).await,
            Self::Degraded(c) => c.create_device(name, primary_address, description).await,
        }
    }

    async fn find_interfaces(
        &self,
        device: &InventoryDeviceRef,
    ) -> Result<Vec<InventoryInterfaceRef>, InventoryError> {
        match self {
            Self::Live(c) => c.find_interfaces(device).await,
            Self::Degraded(c) => c.find_interfaces(device).await,
        }
    }

    async fn ensure_interface(
        &self,
        device: &InventoryDeviceRef,
        name: &str,
    ) -> Result<InventoryInterfaceRef, InventoryError> {
        match self {
            Self::Live(c) => c.ensure_interface(device, name).await,
            Self::Degraded(c) => c.ensure_interface(device, name).await,
        }
    }

    async fn find_addresses(
        &self,
        device: &InventoryDeviceRef,
        interface: &InventoryInterfaceRef,
    ) -> Result<BTreeSet<String>, InventoryError> {
        match self {
            Self::Live(c) => c.find_addresses(device, interface).await,
            Self::Degraded(c) => c.find_addresses(device, interface).await,
        }
    }

    async fn ensure_address_assignment(
        &self,
        device: &InventoryDeviceRef,
        interface: &InventoryInterfaceRef,
        address: &str,
    ) -> Result<(), InventoryError> {
        match self {
            Self::Live(c) => c.ensure_address_assignment(device, interface, address).await,
            Self::Degraded(c) => {
                c.ensure_address_assignment(device, interface, address)
                    .await
            }
        }
    }
}

/// 변경 의도를 감사 로그로 기록합니다.
pub(crate) fn audit_mutation(mode: InventoryMode, operation: &'static str, payload: &Value) {
    info!(
        target: "netsync::audit",
        mode = mode.as_str(),
        operation,
        payload = %payload,
        "inventory mutation"
    );
    counter!(
        m::INVENTORY_MUTATIONS_TOTAL,
        m::LABEL_OPERATION => operation,
        m::LABEL_MODE => mode.as_str()
    )
    .increment(1);
}

/// 백엔드 호출 결과를 메트릭으로 기록합니다.
pub(crate) fn record_request(operation: &'static str, success: bool, elapsed: Duration) {
    let result = if success { "success" } else { "failure" };
    counter!(
        m::INVENTORY_REQUESTS_TOTAL,
        m::LABEL_OPERATION => operation,
        m::LABEL_RESULT => result
    )
    .increment(1);
    histogram!(m::INVENTORY_REQUEST_DURATION_SECONDS, m::LABEL_OPERATION => operation)
        .record(elapsed.as_secs_f64());
}
