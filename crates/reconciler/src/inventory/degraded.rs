//! Degraded 인벤토리 -- 네트워크 I/O 없는 로그 전용 모드
//!
//! 모든 조회는 "없음"을 반환하고, 모든 변경은 감사 로그만 남긴 채
//! 합성 참조(id 0)를 반환합니다.

use std::collections::BTreeSet;

use netsync_core::types::{
    InventoryDeviceRef, InventoryInterfaceRef, InventoryMode, canonical_cidr,
};
use serde_json::json;

use super::{InventoryClient, audit_mutation, operation as op};
use crate::error::InventoryError;

/// 합성 참조에 사용하는 ID
pub const SYNTHETIC_ID: u64 = 0;

/// 로그 전용 인벤토리
#[derive(Debug, Clone, Default)]
pub struct DegradedInventory;

impl DegradedInventory {
    /// 새 Degraded 클라이언트를 생성합니다.
    pub fn new() -> Self {
        Self
    }
}

impl InventoryClient for DegradedInventory {
    fn mode(&self) -> InventoryMode {
        InventoryMode::Degraded
    }

    async fn find_device(&self, _name: &str) -> Result<Option<InventoryDeviceRef>, InventoryError> {
        Ok(None)
    }

    async fn create_device(
        &self,
        name: &str,
        primary_address: &str,
        description: Option<&str>,
    ) -> Result<InventoryDeviceRef, InventoryError> {
        audit_mutation(
            InventoryMode::Degraded,
            op::CREATE_DEVICE,
            &json!({
                "name": name,
                "primary_address": primary_address,
                "description": description,
            }),
        );
        Ok(InventoryDeviceRef {
            id: SYNTHETIC_ID,
            name: name.to_owned(),
            primary_address: Some(primary_address.to_owned()),
        })
    }

    async fn find_interfaces(
        &self,
        _device: &InventoryDeviceRef,
    ) -> Result<Vec<InventoryInterfaceRef>, InventoryError> {
        Ok(Vec::new())
    }

    async fn ensure_interface(
        &self,
        device: &InventoryDeviceRef,
        name: &str,
    ) -> Result<InventoryInterfaceRef, InventoryError> {
        audit_mutation(
            InventoryMode::Degraded,
            op::ENSURE_INTERFACE,
            &json!({ "device": device.name, "name": name }),
        );
        Ok(InventoryInterfaceRef {
            id: SYNTHETIC_ID,
            name: name.to_owned(),
        })
    }

    async fn find_addresses(
        &self,
        _device: &InventoryDeviceRef,
        _interface: &InventoryInterfaceRef,
    ) -> Result<BTreeSet<String>, InventoryError> {
        Ok(BTreeSet::new())
    }

    async fn ensure_address_assignment(
        &self,
        device: &InventoryDeviceRef,
        interface: &InventoryInterfaceRef,
        address: &str,
    ) -> Result<(), InventoryError> {
        audit_mutation(
            InventoryMode::Degraded,
            op::ENSURE_ADDRESS,
            &json!({
                "device": device.name,
                "interface": interface.name,
                "address": canonical_cidr(address).unwrap_or_else(|| address.to_owned()),
            }),
        );
        Ok(())
    }
}
