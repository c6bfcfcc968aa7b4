//! 조정 엔진 통합 테스트
//!
//! - 멱등성 (두 번째 실행은 아무것도 생성하지 않음)
//! - 대상 단위 장애 격리
//! - 같은 장치 이름의 동시 처리
//! - 취소 시 부분 리포트
//! - 입력 에러는 디스커버리 조회 이전에 반환

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use netsync_core::types::{InventoryMode, OutcomeAction, REASON_NO_DISCOVERY_DATA, REASON_UP_TO_DATE};
use netsync_reconciler::inventory::operation as op;
use netsync_reconciler::{
    DiscoverySource, InjectedFailure, MemoryInventory, ReconciliationEngine, ScanRequest,
    resolve_cidr,
};
use tokio_util::sync::CancellationToken;

const FIXTURE: &str = include_str!("fixtures/discovery.json");

fn dataset() -> Arc<DiscoverySource> {
    Arc::new(DiscoverySource::from_json(FIXTURE).expect("fixture should load"))
}

fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid ip")
}

fn engine(inventory: MemoryInventory) -> ReconciliationEngine<MemoryInventory> {
    ReconciliationEngine::new(Arc::new(inventory), dataset(), 4)
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let engine = engine(MemoryInventory::new());
    let targets = resolve_cidr("192.168.1.0/29", 64).expect("valid cidr");

    let first = engine.reconcile(&targets, None).await;
    assert_eq!(first.scanned.len(), 8);
    let created: Vec<&str> = first.created.iter().map(|e| e.ip.as_str()).collect();
    assert_eq!(
        created,
        ["192.168.1.1", "192.168.1.2", "192.168.1.3", "192.168.1.6"]
    );
    assert!(first.errors.is_empty());
    assert_eq!(first.mode, InventoryMode::Memory);

    let second = engine.reconcile(&targets, None).await;
    assert!(second.created.is_empty());
    assert!(second.updated.is_empty());
    assert!(second.errors.is_empty());
    let up_to_date = second
        .skipped
        .iter()
        .filter(|e| e.reason == REASON_UP_TO_DATE)
        .count();
    assert_eq!(up_to_date, 4);
    assert_eq!(engine.inventory().calls(op::CREATE_DEVICE), 4);
}

#[tokio::test]
async fn every_target_lands_in_exactly_one_bucket() {
    let engine = engine(MemoryInventory::new());
    let targets = resolve_cidr("192.168.1.0/29", 64).expect("valid cidr");
    let report = engine.reconcile(&targets, None).await;

    let bucketed = report.created.len()
        + report.updated.len()
        + report.skipped.len()
        + report.errors.len();
    assert_eq!(bucketed, report.scanned.len());
    for ip in &report.scanned {
        assert!(report.action_for(ip).is_some(), "{ip} missing from buckets");
    }
}

#[tokio::test]
async fn unknown_address_is_skipped() {
    let engine = engine(MemoryInventory::new());
    let report = engine.reconcile(&[ip("10.99.0.1")], None).await;
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, REASON_NO_DISCOVERY_DATA);
    assert_eq!(engine.inventory().total_calls(), 0);
}

#[tokio::test]
async fn timeout_on_one_target_does_not_abort_siblings() {
    let inventory = MemoryInventory::new().with_device_failure("access-sw2", InjectedFailure::Timeout);
    let engine = engine(inventory);
    let targets = [ip("192.168.1.1"), ip("192.168.1.2"), ip("192.168.1.3")];

    let report = engine.reconcile(&targets, None).await;
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].ip, "192.168.1.2");
    assert!(report.errors[0].reason.contains("timed out"));
    assert_eq!(report.created.len(), 2);
    assert_eq!(report.action_for("192.168.1.1"), Some(OutcomeAction::Created));
    assert_eq!(report.action_for("192.168.1.3"), Some(OutcomeAction::Created));
}

#[tokio::test]
async fn concurrent_targets_with_same_hostname_create_one_device() {
    let dataset = r#"{
        "10.0.0.1": {"hostname": "dup", "interfaces": [{"name": "eth0", "addresses": ["10.0.0.1/24"]}]},
        "10.0.0.2": {"hostname": "dup", "interfaces": [{"name": "eth1", "addresses": ["10.0.1.1/24"]}]}
    }"#;
    let discovery = Arc::new(DiscoverySource::from_json(dataset).expect("valid dataset"));
    let inventory =
        Arc::new(MemoryInventory::new().with_latency(Duration::from_millis(10)));
    let engine = ReconciliationEngine::new(Arc::clone(&inventory), discovery, 2);

    let report = engine.reconcile(&[ip("10.0.0.1"), ip("10.0.0.2")], None).await;

    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
    assert_eq!(inventory.device_names(), vec!["dup"]);
    assert_eq!(inventory.calls(op::CREATE_DEVICE), 1);
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.updated.len(), 1);
    assert_eq!(inventory.interfaces_of("dup"), vec!["eth0", "eth1"]);
    assert!(engine.device_locks().is_empty());
}

#[test]
fn address_on_two_interfaces_of_one_device_is_rejected_at_load() {
    let dataset = r#"{
        "10.0.0.1": {"hostname": "dup", "interfaces": [{"name": "eth0", "addresses": ["10.9.9.9/24"]}]},
        "10.0.0.2": {"hostname": "dup", "interfaces": [{"name": "eth1", "addresses": ["10.9.9.9/24"]}]}
    }"#;
    let err = DiscoverySource::from_json(dataset).expect_err("conflicting assignment");
    let message = err.to_string();
    assert!(message.contains("assigned to both"), "message: {message}");
    assert!(message.contains("'eth0'") && message.contains("'eth1'"));
}

#[tokio::test]
async fn shared_address_on_one_interface_reconciles_once() {
    let dataset = r#"{
        "10.0.0.1": {"hostname": "dup", "interfaces": [{"name": "eth0", "addresses": ["10.9.9.9/24"]}]},
        "10.0.0.2": {"hostname": "dup", "interfaces": [{"name": "eth0", "addresses": ["10.9.9.9/24"]}]}
    }"#;
    let discovery = Arc::new(DiscoverySource::from_json(dataset).expect("valid dataset"));
    let inventory = Arc::new(MemoryInventory::new());
    let engine = ReconciliationEngine::new(Arc::clone(&inventory), discovery, 2);

    let report = engine.reconcile(&[ip("10.0.0.1"), ip("10.0.0.2")], None).await;

    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
    assert_eq!(inventory.interfaces_of("dup"), vec!["eth0"]);
    assert_eq!(inventory.addresses_of("dup", "eth0"), vec!["10.9.9.9/24"]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_yields_partial_report() {
    let inventory = MemoryInventory::new().with_latency(Duration::from_millis(20));
    let engine = ReconciliationEngine::new(Arc::new(inventory), dataset(), 1);
    let targets = [
        ip("192.168.1.1"),
        ip("192.168.1.2"),
        ip("192.168.1.3"),
        ip("192.168.1.6"),
    ];

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        // 192.168.1.2 처리 도중 (find, create, ensure x2, assign x2 = 120ms 이후)
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let report = engine.reconcile_with_cancel(&targets, None, cancel).await;
    assert!(report.partial);
    assert_eq!(report.scanned, vec!["192.168.1.1"]);
    assert_eq!(report.created.len(), 1);
}

#[tokio::test]
async fn malformed_cidr_performs_no_lookups() {
    let engine = engine(MemoryInventory::new());
    let request = ScanRequest {
        cidr: Some("192.168.1.0/40".to_owned()),
        ..ScanRequest::default()
    };
    let err = engine
        .run(&request, 64, CancellationToken::new())
        .await
        .expect_err("should reject");
    assert_eq!(err.code(), "InvalidCIDR");
    assert_eq!(engine.discovery().lookup_count(), 0);
    assert_eq!(engine.inventory().total_calls(), 0);
}

#[tokio::test]
async fn oversized_range_is_rejected() {
    let engine = engine(MemoryInventory::new());
    let request = ScanRequest {
        cidr: Some("10.0.0.0/16".to_owned()),
        ..ScanRequest::default()
    };
    let err = engine
        .run(&request, 1024, CancellationToken::new())
        .await
        .expect_err("should reject");
    assert_eq!(err.code(), "RangeTooLarge");
    assert_eq!(engine.discovery().lookup_count(), 0);
}

#[tokio::test]
async fn name_prefix_keeps_runs_idempotent() {
    let engine = engine(MemoryInventory::new());
    let request = ScanRequest {
        ips: Some(vec!["192.168.1.3".to_owned()]),
        name_prefix: Some("lab-".to_owned()),
        ..ScanRequest::default()
    };

    let first = engine
        .run(&request, 16, CancellationToken::new())
        .await
        .expect("valid request");
    assert_eq!(first.created[0].device, "lab-edge-rtr3");

    let second = engine
        .run(&request, 16, CancellationToken::new())
        .await
        .expect("valid request");
    assert_eq!(second.skipped[0].reason, REASON_UP_TO_DATE);
    assert_eq!(
        engine.inventory().addresses_of("lab-edge-rtr3", "lo0"),
        vec!["198.51.100.3/32"]
    );
}
