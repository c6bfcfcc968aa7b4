//! Live 인벤토리 -- NetBox 호환 REST API 클라이언트
//!
//! 사용 엔드포인트:
//! - `GET/POST /api/dcim/devices/`
//! - `GET/POST /api/dcim/interfaces/`
//! - `GET/POST /api/ipam/ip-addresses/`
//!
//! 모든 호출은 `tokio::time::timeout`으로 제한되고, 동시 호출 수는
//! `pool_size` 크기의 세마포어로 제한됩니다. 읽기 호출만 일시적 장애에 대해
//! 선형 백오프로 재시도하며, 쓰기 호출은 재시도하지 않습니다.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use netsync_core::config::InventoryConfig;
use netsync_core::metrics as m;
use netsync_core::types::{
    InventoryDeviceRef, InventoryInterfaceRef, InventoryMode, canonical_cidr,
};
use reqwest::{Client, RequestBuilder, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::{InventoryClient, audit_mutation, operation as op, record_request};
use crate::error::InventoryError;

const DEVICES_PATH: &str = "/api/dcim/devices/";
const INTERFACES_PATH: &str = "/api/dcim/interfaces/";
const IP_ADDRESSES_PATH: &str = "/api/ipam/ip-addresses/";

/// 에러 메시지에 포함할 응답 본문 최대 길이
const MAX_ERROR_BODY_LEN: usize = 512;

/// 목록 응답 (`{count, next, previous, results}`)
#[derive(Debug, Deserialize)]
struct Page<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct DeviceRecord {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    primary_ip: Option<NestedAddress>,
}

#[derive(Debug, Deserialize)]
struct NestedAddress {
    address: String,
}

#[derive(Debug, Deserialize)]
struct InterfaceRecord {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AddressRecord {
    address: String,
}

/// 장치 생성 시 포함할 선택적 참조
#[derive(Debug, Clone, Default)]
struct DeviceDefaults {
    device_type_id: Option<u64>,
    role_id: Option<u64>,
    site_id: Option<u64>,
}

/// NetBox 호환 REST 인벤토리 클라이언트
pub struct LiveInventory {
    client: Client,
    base_url: String,
    token: String,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    permits: Arc<Semaphore>,
    defaults: DeviceDefaults,
}

impl LiveInventory {
    /// 설정으로 클라이언트를 생성합니다.
    pub fn new(config: &InventoryConfig) -> Result<Self, InventoryError> {
        let base_url = config.url.trim().trim_end_matches('/').to_owned();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(InventoryError::Config {
                field: "url".to_owned(),
                reason: "must start with http:// or https://".to_owned(),
            });
        }
        if config.token.trim().is_empty() {
            return Err(InventoryError::Config {
                field: "token".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if config.pool_size == 0 {
            return Err(InventoryError::Config {
                field: "pool_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .connect_timeout(timeout)
            .pool_max_idle_per_host(config.pool_size)
            .build()
            .map_err(|e| InventoryError::Config {
                field: "url".to_owned(),
                reason: format!("failed to build http client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            token: config.token.trim().to_owned(),
            timeout,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            permits: Arc::new(Semaphore::new(config.pool_size)),
            defaults: DeviceDefaults {
                device_type_id: config.device_type_id,
                role_id: config.role_id,
                site_id: config.site_id,
            },
        })
    }

    /// 호출당 타임아웃을 변경합니다.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 재시도 백오프 기본 간격을 변경합니다.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// 읽기 호출 (일시적 장애 시 재시도)
    async fn get<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, InventoryError> {
        let url = self.url(path);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff * attempt;
                warn!(
                    operation,
                    attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "retrying inventory read"
                );
                counter!(m::INVENTORY_RETRIES_TOTAL, m::LABEL_OPERATION => operation).increment(1);
                tokio::time::sleep(backoff).await;
            }

            let request = self.client.get(&url).query(query);
            match self.execute(operation, request).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            InventoryError::BackendUnavailable(format!("{operation}: retries exhausted"))
        }))
    }

    /// 쓰기 호출 (재시도 없음)
    async fn post<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        body: &Value,
    ) -> Result<T, InventoryError> {
        audit_mutation(InventoryMode::Live, operation, body);
        let request = self.client.post(self.url(path)).json(body);
        self.execute(operation, request).await
    }

    /// 단일 호출을 실행합니다 (풀 허가 획득, 타임아웃, 메트릭).
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, InventoryError> {
        let _permit = self.permits.acquire().await.map_err(|_| {
            InventoryError::BackendUnavailable("inventory connection pool closed".to_owned())
        })?;

        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.roundtrip(operation, request))
            .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(InventoryError::BackendTimeout {
                operation: operation.to_owned(),
                timeout_ms: self.timeout_ms(),
            }),
        };
        record_request(operation, result.is_ok(), started.elapsed());

        if let Err(ref e) = result {
            debug!(operation, error = %e, kind = e.kind(), "inventory call failed");
        }
        result
    }

    async fn roundtrip<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, InventoryError> {
        let response = request
            .header(header::AUTHORIZATION, format!("Token {}", self.token))
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InventoryError::BackendTimeout {
                        operation: operation.to_owned(),
                        timeout_ms: self.timeout_ms(),
                    }
                } else {
                    InventoryError::BackendUnavailable(format!("{operation}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY_LEN {
                let mut cut = MAX_ERROR_BODY_LEN;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            if status == StatusCode::CONFLICT {
                return Err(InventoryError::ConflictingState(format!("{operation}: {body}")));
            }
            return Err(InventoryError::BackendRejected {
                operation: operation.to_owned(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| InventoryError::InvalidResponse(format!("{operation}: {e}")))
    }

    async fn lookup_interface(
        &self,
        device: &InventoryDeviceRef,
        name: &str,
    ) -> Result<Option<InventoryInterfaceRef>, InventoryError> {
        let page: Page<InterfaceRecord> = self
            .get(
                op::ENSURE_INTERFACE,
                INTERFACES_PATH,
                &[("device_id", device.id.to_string()), ("name", name.to_owned())],
            )
            .await?;
        Ok(page
            .results
            .into_iter()
            .find(|i| i.name == name)
            .map(|i| InventoryInterfaceRef {
                id: i.id,
                name: i.name,
            }))
    }
}

impl InventoryClient for LiveInventory {
    fn mode(&self) -> InventoryMode {
        InventoryMode::Live
    }

    async fn find_device(&self, name: &str) -> Result<Option<InventoryDeviceRef>, InventoryError> {
        let page: Page<DeviceRecord> = self
            .get(op::FIND_DEVICE, DEVICES_PATH, &[("name", name.to_owned())])
            .await?;

        let mut matches = page.results.into_iter();
        let Some(first) = matches.next() else {
            return Ok(None);
        };
        if matches.next().is_some() {
            return Err(InventoryError::ConflictingState(format!(
                "more than one device named '{name}'"
            )));
        }

        Ok(Some(InventoryDeviceRef {
            id: first.id,
            name: first.name.unwrap_or_else(|| name.to_owned()),
            primary_address: first.primary_ip.map(|ip| ip.address),
        }))
    }

    async fn create_device(
        &self,
        name: &str,
        primary_address: &str,
        description: Option<&str>,
    ) -> Result<InventoryDeviceRef, InventoryError> {
        let comments = match description {
            Some(desc) => format!("Discovered by netsync at {primary_address}. {desc}"),
            None => format!("Discovered by netsync at {primary_address}."),
        };
        let mut body = json!({
            "name": name,
            "status": "active",
            "comments": comments,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(id) = self.defaults.device_type_id {
                obj.insert("device_type".to_owned(), json!(id));
            }
            if let Some(id) = self.defaults.role_id {
                obj.insert("role".to_owned(), json!(id));
            }
            if let Some(id) = self.defaults.site_id {
                obj.insert("site".to_owned(), json!(id));
            }
        }

        let created: DeviceRecord = self.post(op::CREATE_DEVICE, DEVICES_PATH, &body).await?;
        Ok(InventoryDeviceRef {
            id: created.id,
            name: created.name.unwrap_or_else(|| name.to_owned()),
            primary_address: Some(primary_address.to_owned()),
        })
    }

    async fn find_interfaces(
        &self,
        device: &InventoryDeviceRef,
    ) -> Result<Vec<InventoryInterfaceRef>, InventoryError> {
        let page: Page<InterfaceRecord> = self
            .get(
                op::FIND_INTERFACES,
                INTERFACES_PATH,
                &[("device_id", device.id.to_string()), ("limit", "0".to_owned())],
            )
            .await?;
        Ok(page
            .results
            .into_iter()
            .map(|i| InventoryInterfaceRef {
                id: i.id,
                name: i.name,
            })
            .collect())
    }

    async fn ensure_interface(
        &self,
        device: &InventoryDeviceRef,
        name: &str,
    ) -> Result<InventoryInterfaceRef, InventoryError> {
        if let Some(existing) = self.lookup_interface(device, name).await? {
            return Ok(existing);
        }

        let body = json!({
            "device": device.id,
            "name": name,
            "type": "other",
        });
        let created: InterfaceRecord = self.post(op::ENSURE_INTERFACE, INTERFACES_PATH, &body).await?;
        Ok(InventoryInterfaceRef {
            id: created.id,
            name: created.name,
        })
    }

    async fn find_addresses(
        &self,
        device: &InventoryDeviceRef,
        interface: &InventoryInterfaceRef,
    ) -> Result<BTreeSet<String>, InventoryError> {
        let page: Page<AddressRecord> = self
            .get(
                op::FIND_ADDRESSES,
                IP_ADDRESSES_PATH,
                &[
                    ("device_id", device.id.to_string()),
                    ("interface_id", interface.id.to_string()),
                    ("limit", "0".to_owned()),
                ],
            )
            .await?;
        Ok(page
            .results
            .into_iter()
            .map(|a| canonical_cidr(&a.address).unwrap_or(a.address))
            .collect())
    }

    async fn ensure_address_assignment(
        &self,
        device: &InventoryDeviceRef,
        interface: &InventoryInterfaceRef,
        address: &str,
    ) -> Result<(), InventoryError> {
        let canonical = canonical_cidr(address).unwrap_or_else(|| address.to_owned());
        let current = self.find_addresses(device, interface).await?;
        if current.contains(&canonical) {
            return Ok(());
        }

        let body = json!({
            "address": canonical,
            "status": "active",
            "assigned_object_type": "dcim.interface",
            "assigned_object_id": interface.id,
            "description": format!("Auto-discovered on {} {}", device.name, interface.name),
        });
        let _: Value = self.post(op::ENSURE_ADDRESS, IP_ADDRESSES_PATH, &body).await?;
        Ok(())
    }
}
