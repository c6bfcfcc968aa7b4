//! 인메모리 인벤토리 -- 결정적 테스트용 구현
//!
//! 실제 백엔드처럼 상태를 유지하며, 다음 기능을 제공합니다.
//! - 장치 이름(및 호출 종류) 단위 장애 주입
//! - 호출마다 지연 주입 (동시성 경합 재현)
//! - 호출 종류별 카운터

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use netsync_core::types::{
    InterfaceFact, InventoryDeviceRef, InventoryInterfaceRef, InventoryMode, canonical_cidr,
};

use super::{InventoryClient, operation as op};
use crate::error::InventoryError;

/// 주입할 장애 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// 타임아웃
    Timeout,
    /// 연결 불가
    Unavailable,
    /// HTTP 상태 코드와 함께 거부
    Rejected(u16),
}

impl InjectedFailure {
    fn to_error(self, operation: &str, device: &str) -> InventoryError {
        match self {
            Self::Timeout => InventoryError::BackendTimeout {
                operation: operation.to_owned(),
                timeout_ms: 0,
            },
            Self::Unavailable => {
                InventoryError::BackendUnavailable(format!("{operation} for '{device}' (injected)"))
            }
            Self::Rejected(status) => InventoryError::BackendRejected {
                operation: operation.to_owned(),
                status,
                body: "injected".to_owned(),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct FailureRule {
    device: String,
    operation: Option<&'static str>,
    failure: InjectedFailure,
}

#[derive(Debug, Default)]
struct StoredDevice {
    id: u64,
    primary_address: Option<String>,
    interfaces: BTreeMap<String, StoredInterface>,
}

#[derive(Debug, Default)]
struct StoredInterface {
    id: u64,
    addresses: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    devices: BTreeMap<String, StoredDevice>,
    calls: HashMap<&'static str, usize>,
}

impl State {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// 인메모리 인벤토리
#[derive(Debug, Default)]
pub struct MemoryInventory {
    state: Mutex<State>,
    failures: Vec<FailureRule>,
    latency: Option<Duration>,
}

impl MemoryInventory {
    /// 빈 인벤토리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 장치를 미리 등록합니다.
    pub fn with_device(self, name: &str, interfaces: Vec<InterfaceFact>) -> Self {
        {
            let mut state = self.lock();
            let id = state.allocate_id();
            let mut device = StoredDevice {
                id,
                ..StoredDevice::default()
            };
            for iface in interfaces {
                let iface_id = state.allocate_id();
                device.interfaces.insert(
                    iface.name,
                    StoredInterface {
                        id: iface_id,
                        addresses: iface
                            .addresses
                            .iter()
                            .map(|a| canonical_cidr(a).unwrap_or_else(|| a.clone()))
                            .collect(),
                    },
                );
            }
            state.devices.insert(name.to_owned(), device);
        }
        self
    }

    /// 장치에 관한 모든 호출이 실패하도록 설정합니다.
    pub fn with_device_failure(mut self, device: &str, failure: InjectedFailure) -> Self {
        self.failures.push(FailureRule {
            device: device.to_owned(),
            operation: None,
            failure,
        });
        self
    }

    /// 장치에 관한 특정 호출만 실패하도록 설정합니다.
    ///
    /// `operation`은 [`super::operation`]의 상수를 사용합니다.
    pub fn with_operation_failure(
        mut self,
        device: &str,
        operation: &'static str,
        failure: InjectedFailure,
    ) -> Self {
        self.failures.push(FailureRule {
            device: device.to_owned(),
            operation: Some(operation),
            failure,
        });
        self
    }

    /// 모든 호출에 지연을 추가합니다.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// 호출 종류별 호출 수
    pub fn calls(&self, operation: &str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }

    /// 전체 호출 수
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// 등록된 장치 이름 (정렬됨)
    pub fn device_names(&self) -> Vec<String> {
        self.lock().devices.keys().cloned().collect()
    }

    /// 장치의 인터페이스 이름 (정렬됨)
    pub fn interfaces_of(&self, device: &str) -> Vec<String> {
        self.lock()
            .devices
            .get(device)
            .map(|d| d.interfaces.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// 인터페이스에 할당된 주소 (정렬됨)
    pub fn addresses_of(&self, device: &str, interface: &str) -> Vec<String> {
        self.lock()
            .devices
            .get(device)
            .and_then(|d| d.interfaces.get(interface))
            .map(|i| i.addresses.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 호출을 기록하고 지연/장애를 적용합니다.
    async fn enter(&self, operation: &'static str, device: &str) -> Result<(), InventoryError> {
        *self.lock().calls.entry(operation).or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let rule = self.failures.iter().find(|rule| {
            rule.device == device && rule.operation.is_none_or(|o| o == operation)
        });
        match rule {
            Some(rule) => Err(rule.failure.to_error(operation, device)),
            None => Ok(()),
        }
    }
}

impl InventoryClient for MemoryInventory {
    fn mode(&self) -> InventoryMode {
        InventoryMode::Memory
    }

    async fn find_device(&self, name: &str) -> Result<Option<InventoryDeviceRef>, InventoryError> {
        self.enter(op::FIND_DEVICE, name).await?;
        Ok(self.lock().devices.get(name).map(|d| InventoryDeviceRef {
            id: d.id,
            name: name.to_owned(),
            primary_address: d.primary_address.clone(),
        }))
    }

    async fn create_device(
        &self,
        name: &str,
        primary_address: &str,
        _description: Option<&str>,
    ) -> Result<InventoryDeviceRef, InventoryError> {
        self.enter(op::CREATE_DEVICE, name).await?;
        let mut state = self.lock();
        if state.devices.contains_key(name) {
            return Err(InventoryError::ConflictingState(format!(
                "device '{name}' already exists"
            )));
        }
        let id = state.allocate_id();
        state.devices.insert(
            name.to_owned(),
            StoredDevice {
                id,
                primary_address: Some(primary_address.to_owned()),
                interfaces: BTreeMap::new(),
            },
        );
        Ok(InventoryDeviceRef {
            id,
            name: name.to_owned(),
            primary_address: Some(primary_address.to_owned()),
        })
    }

    async fn find_interfaces(
        &self,
        device: &InventoryDeviceRef,
    ) -> Result<Vec<InventoryInterfaceRef>, InventoryError> {
        self.enter(op::FIND_INTERFACES, &device.name).await?;
        let state = self.lock();
        let stored = state.devices.get(&device.name).ok_or_else(|| {
            InventoryError::ConflictingState(format!("device '{}' vanished", device.name))
        })?;
        Ok(stored
            .interfaces
            .iter()
            .map(|(name, iface)| InventoryInterfaceRef {
                id: iface.id,
                name: name.clone(),
            })
            .collect())
    }

    async fn ensure_interface(
        &self,
        device: &InventoryDeviceRef,
        name: &str,
    ) -> Result<InventoryInterfaceRef, InventoryError> {
        self.enter(op::ENSURE_INTERFACE, &device.name).await?;
        let mut state = self.lock();
        if let Some(existing) = state
            .devices
            .get(&device.name)
            .and_then(|d| d.interfaces.get(name))
        {
            return Ok(InventoryInterfaceRef {
                id: existing.id,
                name: name.to_owned(),
            });
        }

        let id = state.allocate_id();
        let stored = state.devices.get_mut(&device.name).ok_or_else(|| {
            InventoryError::ConflictingState(format!("device '{}' vanished", device.name))
        })?;
        stored.interfaces.insert(
            name.to_owned(),
            StoredInterface {
                id,
                addresses: BTreeSet::new(),
            },
        );
        Ok(InventoryInterfaceRef {
            id,
            name: name.to_owned(),
        })
    }

    async fn find_addresses(
        &self,
        device: &InventoryDeviceRef,
        interface: &InventoryInterfaceRef,
    ) -> Result<BTreeSet<String>, InventoryError> {
        self.enter(op::FIND_ADDRESSES, &device.name).await?;
        Ok(self
            .lock()
            .devices
            .get(&device.name)
            .and_then(|d| d.interfaces.get(&interface.name))
            .map(|i| i.addresses.clone())
            .unwrap_or_default())
    }

    async fn ensure_address_assignment(
        &self,
        device: &InventoryDeviceRef,
        interface: &InventoryInterfaceRef,
        address: &str,
    ) -> Result<(), InventoryError> {
        self.enter(op::ENSURE_ADDRESS, &device.name).await?;
        let canonical = canonical_cidr(address).unwrap_or_else(|| address.to_owned());
        let mut state = self.lock();
        let stored = state
            .devices
            .get_mut(&device.name)
            .and_then(|d| d.interfaces.get_mut(&interface.name))
            .ok_or_else(|| {
                InventoryError::ConflictingState(format!(
                    "interface '{}' on '{}' vanished",
                    interface.name, device.name
                ))
            })?;
        stored.addresses.insert(canonical);
        Ok(())
    }
}
