//! 디스커버리 소스 — 정적 데이터셋 기반 사실 테이블
//!
//! 실제 프로토콜 폴링을 대신하는 읽기 전용 테이블입니다.
//! 시작 시 JSON 데이터셋에서 한 번 구성되며 이후 변경되지 않으므로,
//! 동시 조회에 동기화가 필요 없습니다.
//!
//! # 데이터셋 형식
//!
//! ```json
//! {
//!   "192.168.1.1": {
//!     "hostname": "core-sw1",
//!     "description": "Cisco IOS 15.2",
//!     "interfaces": [{ "name": "Gi0/1", "addresses": ["192.168.1.1/24"] }]
//!   }
//! }
//! ```
//!
//! SNMP 스타일 키(`sysName`, `sysDescr`, `ifDescr`, `ifIndex`,
//! `ipAddress` + `ipNetmask`)도 받아들입니다.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ipnetwork::{IpNetwork, Ipv4Network};
use netsync_core::error::DatasetError;
use netsync_core::types::{DiscoveryRecord, InterfaceFact, canonical_cidr};
use serde::Deserialize;
use tracing::{debug, info};

/// 데이터셋 파일 최대 크기 (16 MiB)
pub const MAX_DATASET_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// 데이터셋 최대 엔트리 수
pub const MAX_DATASET_ENTRIES: usize = 65_536;

/// 데이터셋 원본 엔트리
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default, alias = "sysName")]
    hostname: Option<String>,
    #[serde(default, alias = "sysDescr")]
    description: Option<String>,
    #[serde(default)]
    interfaces: Vec<RawInterface>,
}

/// 데이터셋 원본 인터페이스
#[derive(Debug, Deserialize)]
struct RawInterface {
    #[serde(default, alias = "ifDescr")]
    name: Option<String>,
    #[serde(default, rename = "ifIndex")]
    if_index: Option<u64>,
    #[serde(default)]
    addresses: Vec<String>,
    #[serde(default, rename = "ipAddress")]
    ip_address: Option<String>,
    #[serde(default, rename = "ipNetmask")]
    ip_netmask: Option<String>,
}

/// 디스커버리 사실 테이블
#[derive(Debug, Default)]
pub struct DiscoverySource {
    records: HashMap<IpAddr, Arc<DiscoveryRecord>>,
    lookups: AtomicU64,
}

impl DiscoverySource {
    /// 빈 테이블을 생성합니다. 모든 조회는 "발견되지 않음"을 반환합니다.
    pub fn empty() -> Self {
        Self::default()
    }

    /// 이미 구성된 레코드로 테이블을 생성합니다.
    ///
    /// 레코드는 검증 없이 그대로 사용되므로 테스트 및 내부 용도로만 사용합니다.
    pub fn from_records(records: impl IntoIterator<Item = (IpAddr, DiscoveryRecord)>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|(addr, record)| (addr, Arc::new(record)))
                .collect(),
            lookups: AtomicU64::new(0),
        }
    }

    /// 파일에서 데이터셋을 로드합니다.
    ///
    /// 파일 크기가 [`MAX_DATASET_FILE_SIZE`]를 넘으면 읽기 전에 거부합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| DatasetError::Load {
                path: shown.clone(),
                reason: e.to_string(),
            })?;

        if metadata.len() > MAX_DATASET_FILE_SIZE {
            return Err(DatasetError::Load {
                path: shown,
                reason: format!(
                    "file size {} exceeds limit of {} bytes",
                    metadata.len(),
                    MAX_DATASET_FILE_SIZE
                ),
            });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DatasetError::Load {
                path: shown.clone(),
                reason: e.to_string(),
            })?;

        let source = Self::from_json(&content)?;
        info!(path = %shown, entries = source.len(), "discovery dataset loaded");
        Ok(source)
    }

    /// JSON 문자열에서 데이터셋을 구성합니다.
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        if json.len() as u64 > MAX_DATASET_FILE_SIZE {
            return Err(DatasetError::Parse(format!(
                "input size {} exceeds limit of {} bytes",
                json.len(),
                MAX_DATASET_FILE_SIZE
            )));
        }

        let raw: HashMap<String, RawRecord> =
            serde_json::from_str(json).map_err(|e| DatasetError::Parse(e.to_string()))?;

        if raw.len() > MAX_DATASET_ENTRIES {
            return Err(DatasetError::Parse(format!(
                "dataset has {} entries, limit is {}",
                raw.len(),
                MAX_DATASET_ENTRIES
            )));
        }

        let mut records = HashMap::with_capacity(raw.len());
        // (장치 이름, 호스트 주소) -> 인터페이스 이름
        let mut owners: HashMap<(String, IpAddr), String> = HashMap::new();
        for (key, entry) in raw {
            let addr: IpAddr = key.trim().parse().map_err(|_| DatasetError::InvalidEntry {
                address: key.clone(),
                reason: "key is not an IP address".to_owned(),
            })?;
            let record = normalize_record(addr, entry)?;
            claim_addresses(&mut owners, addr, &record)?;
            if records.insert(addr, Arc::new(record)).is_some() {
                return Err(DatasetError::InvalidEntry {
                    address: key,
                    reason: "duplicate address key".to_owned(),
                });
            }
        }

        Ok(Self {
            records,
            lookups: AtomicU64::new(0),
        })
    }

    /// 대상 주소의 디스커버리 레코드를 조회합니다.
    ///
    /// 레코드가 없으면 `None` (정상적인 "발견되지 않음" 결과).
    pub fn lookup(&self, addr: &IpAddr) -> Option<Arc<DiscoveryRecord>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(netsync_core::metrics::DISCOVERY_LOOKUPS_TOTAL).increment(1);
        let hit = self.records.get(addr).cloned();
        debug!(target_addr = %addr, found = hit.is_some(), "discovery lookup");
        hit
    }

    /// 지금까지 처리한 조회 수
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// 로드된 레코드 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 레코드가 하나도 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 모든 레코드를 순회합니다 (조회 카운터는 증가하지 않음).
    pub fn records(&self) -> impl Iterator<Item = (&IpAddr, &DiscoveryRecord)> {
        self.records.iter().map(|(addr, record)| (addr, record.as_ref()))
    }
}

fn normalize_record(addr: IpAddr, raw: RawRecord) -> Result<DiscoveryRecord, DatasetError> {
    let invalid = |reason: String| DatasetError::InvalidEntry {
        address: addr.to_string(),
        reason,
    };

    let hostname = raw
        .hostname
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("device-{addr}"));

    let description = raw
        .description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty());

    let mut names = HashSet::new();
    let mut assigned = HashSet::new();
    let mut interfaces = Vec::with_capacity(raw.interfaces.len());

    for iface in raw.interfaces {
        let name = match (iface.name.as_deref().map(str::trim), iface.if_index) {
            (Some(name), _) if !name.is_empty() => name.to_owned(),
            (_, Some(index)) => format!("if{index}"),
            _ => return Err(invalid("interface without a name".to_owned())),
        };

        if !names.insert(name.clone()) {
            return Err(invalid(format!("duplicate interface '{name}'")));
        }

        let mut addresses = Vec::new();
        let legacy = match (iface.ip_address, iface.ip_netmask) {
            (Some(ip), Some(mask)) => Some(with_netmask(&ip, &mask).ok_or_else(|| {
                invalid(format!("invalid address '{ip}' / '{mask}' on '{name}'"))
            })?),
            (Some(ip), None) => Some(ip),
            _ => None,
        };

        for raw_addr in iface.addresses.into_iter().chain(legacy) {
            let canonical = canonical_cidr(&raw_addr)
                .ok_or_else(|| invalid(format!("invalid address '{raw_addr}' on '{name}'")))?;
            if !assigned.insert(host_of(&canonical)) {
                return Err(invalid(format!(
                    "address '{canonical}' is assigned to more than one interface"
                )));
            }
            addresses.push(canonical);
        }

        interfaces.push(InterfaceFact { name, addresses });
    }

    Ok(DiscoveryRecord {
        hostname,
        description,
        interfaces,
    })
}

/// 같은 장치 이름을 가진 레코드들 사이에서 주소가 두 인터페이스에 걸치지 않도록 합니다.
///
/// 같은 이름의 레코드는 한 번의 조정에서 같은 장치로 합쳐지므로, 레코드 경계를
/// 넘어서도 주소 하나는 인터페이스 하나에만 속해야 합니다.
fn claim_addresses(
    owners: &mut HashMap<(String, IpAddr), String>,
    addr: IpAddr,
    record: &DiscoveryRecord,
) -> Result<(), DatasetError> {
    for iface in &record.interfaces {
        for assigned in &iface.addresses {
            let key = (record.hostname.clone(), host_of(assigned));
            match owners.get(&key) {
                Some(owner) if owner != &iface.name => {
                    return Err(DatasetError::InvalidEntry {
                        address: addr.to_string(),
                        reason: format!(
                            "address '{assigned}' is assigned to both '{owner}' and '{}' on device '{}'",
                            iface.name, record.hostname
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    owners.insert(key, iface.name.clone());
                }
            }
        }
    }
    Ok(())
}

/// `ip` + 점 표기 넷마스크를 CIDR로 변환합니다.
fn with_netmask(ip: &str, mask: &str) -> Option<String> {
    let ip: Ipv4Addr = ip.trim().parse().ok()?;
    let mask: Ipv4Addr = mask.trim().parse().ok()?;
    let net = Ipv4Network::with_netmask(ip, mask).ok()?;
    Some(net.to_string())
}

/// 중복 판정용 호스트 주소 (프리픽스 무시)
fn host_of(canonical: &str) -> IpAddr {
    canonical
        .parse::<IpNetwork>()
        .map(|net| net.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "192.168.1.1": {
            "hostname": "  core-sw1 ",
            "description": "Cisco IOS 15.2",
            "interfaces": [
                { "name": "Gi0/1", "addresses": ["192.168.1.1/24"] },
                { "name": "Gi0/2", "addresses": ["10.0.0.1"] }
            ]
        },
        "192.168.1.2": { "hostname": "", "interfaces": [] }
    }"#;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn loads_and_normalizes() {
        let source = DiscoverySource::from_json(SAMPLE).unwrap();
        assert_eq!(source.len(), 2);

        let rec = source.lookup(&ip("192.168.1.1")).unwrap();
        assert_eq!(rec.hostname, "core-sw1");
        assert_eq!(rec.description.as_deref(), Some("Cisco IOS 15.2"));
        assert_eq!(rec.interfaces[1].addresses, vec!["10.0.0.1/32"]);
    }

    #[test]
    fn empty_hostname_falls_back() {
        let source = DiscoverySource::from_json(SAMPLE).unwrap();
        let rec = source.lookup(&ip("192.168.1.2")).unwrap();
        assert_eq!(rec.hostname, "device-192.168.1.2");
    }

    #[test]
    fn absence_is_none_and_counted() {
        let source = DiscoverySource::from_json(SAMPLE).unwrap();
        assert!(source.lookup(&ip("192.168.1.99")).is_none());
        assert!(source.lookup(&ip("192.168.1.1")).is_some());
        assert_eq!(source.lookup_count(), 2);
    }

    #[test]
    fn snmp_style_keys_are_accepted() {
        let json = r#"{
            "10.9.0.1": {
                "sysName": "edge-rtr",
                "sysDescr": "JunOS",
                "interfaces": [
                    { "ifIndex": 3, "ipAddress": "10.9.0.1", "ipNetmask": "255.255.255.0" },
                    { "ifDescr": "ge-0/0/1", "ifIndex": 4 }
                ]
            }
        }"#;
        let source = DiscoverySource::from_json(json).unwrap();
        let rec = source.lookup(&ip("10.9.0.1")).unwrap();
        assert_eq!(rec.hostname, "edge-rtr");
        assert_eq!(rec.interfaces[0].name, "if3");
        assert_eq!(rec.interfaces[0].addresses, vec!["10.9.0.1/24"]);
        assert_eq!(rec.interfaces[1].name, "ge-0/0/1");
    }

    #[test]
    fn rejects_non_ip_key() {
        let err = DiscoverySource::from_json(r#"{"router": {"hostname": "r"}}"#).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidEntry { .. }));
    }

    #[test]
    fn rejects_duplicate_interface_names() {
        let json = r#"{"10.0.0.1": {"hostname": "a", "interfaces": [
            {"name": "eth0"}, {"name": "eth0"}
        ]}}"#;
        let err = DiscoverySource::from_json(json).unwrap_err();
        assert!(err.to_string().contains("duplicate interface"));
    }

    #[test]
    fn rejects_address_on_two_interfaces() {
        let json = r#"{"10.0.0.1": {"hostname": "a", "interfaces": [
            {"name": "eth0", "addresses": ["10.0.0.1/24"]},
            {"name": "eth1", "addresses": ["10.0.0.1/32"]}
        ]}}"#;
        let err = DiscoverySource::from_json(json).unwrap_err();
        assert!(err.to_string().contains("more than one interface"));
    }

    #[test]
    fn rejects_invalid_address() {
        let json = r#"{"10.0.0.1": {"hostname": "a", "interfaces": [
            {"name": "eth0", "addresses": ["10.0.0.300/24"]}
        ]}}"#;
        assert!(DiscoverySource::from_json(json).is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = DiscoverySource::from_json("[1, 2").unwrap_err();
        assert!(matches!(err, DatasetError::Parse(_)));
    }

    #[test]
    fn records_iterate_without_counting() {
        let source = DiscoverySource::from_json(SAMPLE).unwrap();
        let mut keys: Vec<IpAddr> = source.records().map(|(addr, _)| *addr).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![ip("192.168.1.1"), ip("192.168.1.2")]);
        assert_eq!(source.lookup_count(), 0);
    }

    #[test]
    fn rejects_address_split_across_records_of_one_device() {
        let json = r#"{
            "10.0.0.1": {"hostname": "dup", "interfaces": [
                {"name": "eth0", "addresses": ["10.9.9.9/24"]}
            ]},
            "10.0.0.2": {"hostname": "dup", "interfaces": [
                {"name": "eth1", "addresses": ["10.9.9.9/24"]}
            ]}
        }"#;
        let err = DiscoverySource::from_json(json).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidEntry { .. }));
        assert!(err.to_string().contains("device 'dup'"));
    }

    #[test]
    fn same_interface_across_records_is_accepted() {
        let json = r#"{
            "10.0.0.1": {"hostname": "dup", "interfaces": [
                {"name": "eth0", "addresses": ["10.9.9.9/24"]}
            ]},
            "10.0.0.2": {"hostname": "dup", "interfaces": [
                {"name": "eth0", "addresses": ["10.9.9.9/24"]}
            ]},
            "10.0.0.3": {"hostname": "other", "interfaces": [
                {"name": "eth1", "addresses": ["10.9.9.9/24"]}
            ]}
        }"#;
        let source = DiscoverySource::from_json(json).unwrap();
        assert_eq!(source.len(), 3);
    }

    #[tokio::test]
    async fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discovery.json");
        tokio::fs::write(&path, SAMPLE).await.unwrap();
        let source = DiscoverySource::load(&path).await.unwrap();
        assert_eq!(source.len(), 2);
    }

    #[tokio::test]
    async fn load_missing_file_fails() {
        let err = DiscoverySource::load("/nonexistent/netsync/discovery.json")
            .await
            .unwrap_err();
        assert!(matches!(err, DatasetError::Load { .. }));
    }
}
