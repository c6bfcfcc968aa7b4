//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 디스커버리 레코드, 인벤토리 참조, 대상별 조정(reconciliation) 결과와
//! 최종 스캔 리포트를 정의합니다. 리포트의 JSON 형식은 HTTP 응답 계약과 동일합니다.

use std::fmt;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// 디스커버리 데이터가 없는 대상의 skip 사유
pub const REASON_NO_DISCOVERY_DATA: &str = "no discovery data";

/// 인벤토리가 이미 최신인 대상의 skip 사유
pub const REASON_UP_TO_DATE: &str = "already up to date";

/// 인터페이스 정보
///
/// 인터페이스 이름과 할당된 주소(CIDR 표기) 목록입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceFact {
    /// 인터페이스 이름 (예: `GigabitEthernet0/1`)
    pub name: String,
    /// 할당된 주소 목록 (CIDR 표기, 순서 유지)
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// 디스커버리 레코드
///
/// 하나의 대상 주소에 대해 (시뮬레이션된) 프로토콜 조회가 반환했을 사실 묶음입니다.
/// 로드 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    /// 장치 호스트명
    pub hostname: String,
    /// 장치 설명 (sysDescr 등)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 인터페이스 목록
    #[serde(default)]
    pub interfaces: Vec<InterfaceFact>,
}

impl DiscoveryRecord {
    /// 접두어를 적용한 인벤토리 장치 이름을 반환합니다.
    pub fn device_name(&self, prefix: Option<&str>) -> String {
        match prefix {
            Some(prefix) => format!("{prefix}{}", self.hostname),
            None => self.hostname.clone(),
        }
    }

    /// 모든 인터페이스에 할당된 주소 수
    pub fn address_count(&self) -> usize {
        self.interfaces.iter().map(|i| i.addresses.len()).sum()
    }
}

/// 외부 인벤토리 시스템의 장치 참조
///
/// 인벤토리 시스템이 소유하며, 한 대상의 처리 범위를 넘어 캐시하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDeviceRef {
    /// 인벤토리 내부 ID (시뮬레이션 모드에서는 0)
    pub id: u64,
    /// 장치 이름
    pub name: String,
    /// 대표 주소
    pub primary_address: Option<String>,
}

/// 외부 인벤토리 시스템의 인터페이스 참조
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryInterfaceRef {
    /// 인벤토리 내부 ID (시뮬레이션 모드에서는 0)
    pub id: u64,
    /// 인터페이스 이름 (장치 내에서 유일)
    pub name: String,
}

/// 인벤토리 클라이언트 동작 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryMode {
    /// 실제 REST 호출
    Live,
    /// 자격 증명 없음, 변경은 로그로만 기록
    Degraded,
    /// 인메모리 테스트 더블
    Memory,
}

impl InventoryMode {
    /// 메트릭/로그용 고정 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Degraded => "degraded",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for InventoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 대상별 최종 조치
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeAction {
    /// 장치를 새로 생성함
    Created,
    /// 기존 장치에 누락된 인터페이스/주소를 추가함
    Updated,
    /// 변경 없음
    Skipped,
    /// 인벤토리 호출 실패
    Error,
}

impl OutcomeAction {
    /// 메트릭 레이블용 고정 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for OutcomeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 대상 하나의 조정 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    /// 대상 주소
    pub address: String,
    /// 최종 조치
    pub action: OutcomeAction,
    /// 사람이 읽을 수 있는 상세 (장치 이름, 에러 메시지 또는 skip 사유)
    pub detail: String,
    /// 관련 장치 이름
    pub device: Option<String>,
    /// 생성 이후 실패한 개별 할당 (created 결과에만 사용)
    pub issues: Vec<String>,
}

impl ReconciliationOutcome {
    /// 생성 결과
    pub fn created(
        address: impl Into<String>,
        device: impl Into<String>,
        issues: Vec<String>,
    ) -> Self {
        let device = device.into();
        Self {
            address: address.into(),
            action: OutcomeAction::Created,
            detail: device.clone(),
            device: Some(device),
            issues,
        }
    }

    /// 갱신 결과
    pub fn updated(address: impl Into<String>, device: impl Into<String>) -> Self {
        let device = device.into();
        Self {
            address: address.into(),
            action: OutcomeAction::Updated,
            detail: device.clone(),
            device: Some(device),
            issues: Vec::new(),
        }
    }

    /// skip 결과
    pub fn skipped(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            action: OutcomeAction::Skipped,
            detail: reason.into(),
            device: None,
            issues: Vec::new(),
        }
    }

    /// 에러 결과
    pub fn error(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            action: OutcomeAction::Error,
            detail: reason.into(),
            device: None,
            issues: Vec::new(),
        }
    }
}

/// `created` 버킷 엔트리
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEntry {
    pub ip: String,
    pub device: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// `updated` 버킷 엔트리
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedEntry {
    pub ip: String,
    pub device: String,
}

/// `skipped` / `errors` 버킷 엔트리
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonEntry {
    pub ip: String,
    pub reason: String,
}

/// 스캔 리포트
///
/// 처리된 모든 대상은 `scanned`에 한 번, 나머지 네 버킷 중 정확히 하나에 나타납니다.
/// 각 버킷의 순서는 대상 제출 순서를 따릅니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scanned: Vec<String>,
    pub created: Vec<CreatedEntry>,
    pub updated: Vec<UpdatedEntry>,
    pub skipped: Vec<ReasonEntry>,
    pub errors: Vec<ReasonEntry>,
    /// 리포트를 생성한 인벤토리 모드
    pub mode: InventoryMode,
    /// 배치가 취소되어 일부 대상만 처리되었는지 여부
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

impl ScanReport {
    /// 빈 리포트를 생성합니다.
    pub fn new(mode: InventoryMode) -> Self {
        Self {
            scanned: Vec::new(),
            created: Vec::new(),
            updated: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
            mode,
            partial: false,
        }
    }

    /// 결과 하나를 `scanned`와 해당 버킷에 추가합니다.
    pub fn push(&mut self, outcome: ReconciliationOutcome) {
        let ReconciliationOutcome {
            address,
            action,
            detail,
            device,
            issues,
        } = outcome;

        self.scanned.push(address.clone());
        match action {
            OutcomeAction::Created => self.created.push(CreatedEntry {
                ip: address,
                device: device.unwrap_or(detail),
                issues,
            }),
            OutcomeAction::Updated => self.updated.push(UpdatedEntry {
                ip: address,
                device: device.unwrap_or(detail),
            }),
            OutcomeAction::Skipped => self.skipped.push(ReasonEntry {
                ip: address,
                reason: detail,
            }),
            OutcomeAction::Error => self.errors.push(ReasonEntry {
                ip: address,
                reason: detail,
            }),
        }
    }

    /// 주소가 속한 버킷을 반환합니다.
    pub fn action_for(&self, ip: &str) -> Option<OutcomeAction> {
        if self.created.iter().any(|e| e.ip == ip) {
            Some(OutcomeAction::Created)
        } else if self.updated.iter().any(|e| e.ip == ip) {
            Some(OutcomeAction::Updated)
        } else if self.skipped.iter().any(|e| e.ip == ip) {
            Some(OutcomeAction::Skipped)
        } else if self.errors.iter().any(|e| e.ip == ip) {
            Some(OutcomeAction::Error)
        } else {
            None
        }
    }
}

/// 주소 문자열을 CIDR 정규형으로 변환합니다.
///
/// 프리픽스가 없는 주소는 호스트 프리픽스(/32, /128)로 간주합니다.
/// 파싱할 수 없으면 `None`을 반환합니다.
pub fn canonical_cidr(input: &str) -> Option<String> {
    input
        .trim()
        .parse::<IpNetwork>()
        .ok()
        .map(|net| net.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DiscoveryRecord {
        DiscoveryRecord {
            hostname: "core-sw1".to_owned(),
            description: None,
            interfaces: vec![
                InterfaceFact {
                    name: "eth0".to_owned(),
                    addresses: vec!["10.0.0.1/24".to_owned()],
                },
                InterfaceFact {
                    name: "eth1".to_owned(),
                    addresses: vec!["10.0.1.1/24".to_owned(), "10.0.2.1/24".to_owned()],
                },
            ],
        }
    }

    #[test]
    fn device_name_applies_prefix() {
        let r = record();
        assert_eq!(r.device_name(None), "core-sw1");
        assert_eq!(r.device_name(Some("lab-")), "lab-core-sw1");
    }

    #[test]
    fn address_count_sums_interfaces() {
        assert_eq!(record().address_count(), 3);
    }

    #[test]
    fn report_push_places_each_action_in_one_bucket() {
        let mut report = ScanReport::new(InventoryMode::Memory);
        report.push(ReconciliationOutcome::created("10.0.0.1", "a", Vec::new()));
        report.push(ReconciliationOutcome::updated("10.0.0.2", "b"));
        report.push(ReconciliationOutcome::skipped("10.0.0.3", REASON_UP_TO_DATE));
        report.push(ReconciliationOutcome::error("10.0.0.4", "backend timeout"));

        assert_eq!(
            report.scanned,
            vec!["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"]
        );
        assert_eq!(report.action_for("10.0.0.1"), Some(OutcomeAction::Created));
        assert_eq!(report.action_for("10.0.0.2"), Some(OutcomeAction::Updated));
        assert_eq!(report.action_for("10.0.0.3"), Some(OutcomeAction::Skipped));
        assert_eq!(report.action_for("10.0.0.4"), Some(OutcomeAction::Error));
        assert_eq!(report.action_for("10.0.0.5"), None);
    }

    #[test]
    fn report_json_matches_response_contract() {
        let mut report = ScanReport::new(InventoryMode::Degraded);
        report.push(ReconciliationOutcome::created("10.0.0.1", "r1", Vec::new()));
        report.push(ReconciliationOutcome::skipped("10.0.0.2", REASON_NO_DISCOVERY_DATA));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scanned"][0], "10.0.0.1");
        assert_eq!(json["created"][0]["ip"], "10.0.0.1");
        assert_eq!(json["created"][0]["device"], "r1");
        assert!(json["created"][0].get("issues").is_none());
        assert_eq!(json["skipped"][0]["reason"], "no discovery data");
        assert_eq!(json["mode"], "degraded");
        assert!(json.get("partial").is_none());
    }

    #[test]
    fn created_entry_serializes_issues_when_present() {
        let mut report = ScanReport::new(InventoryMode::Live);
        report.push(ReconciliationOutcome::created(
            "10.0.0.1",
            "r1",
            vec!["interface eth0: backend timeout".to_owned()],
        ));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["created"][0]["issues"][0], "interface eth0: backend timeout");
    }

    #[test]
    fn partial_flag_serialized_only_when_set() {
        let mut report = ScanReport::new(InventoryMode::Live);
        report.partial = true;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["partial"], true);
    }

    #[test]
    fn canonical_cidr_normalizes_forms() {
        assert_eq!(canonical_cidr("10.0.0.1/24").as_deref(), Some("10.0.0.1/24"));
        assert_eq!(canonical_cidr(" 10.0.0.1 ").as_deref(), Some("10.0.0.1/32"));
        assert_eq!(
            canonical_cidr("2001:db8:0:0::1/64").as_deref(),
            Some("2001:db8::1/64")
        );
        assert_eq!(canonical_cidr("not-an-address"), None);
        assert_eq!(canonical_cidr("10.0.0.1/33"), None);
    }

    #[test]
    fn discovery_record_deserializes_with_defaults() {
        let r: DiscoveryRecord = serde_json::from_str(r#"{"hostname":"edge1"}"#).unwrap();
        assert_eq!(r.hostname, "edge1");
        assert!(r.interfaces.is_empty());
        assert!(r.description.is_none());
    }

    #[test]
    fn mode_and_action_display() {
        assert_eq!(InventoryMode::Degraded.to_string(), "degraded");
        assert_eq!(OutcomeAction::Error.to_string(), "error");
    }
}
