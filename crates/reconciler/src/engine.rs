//! 조정 엔진 -- 대상별 결정 절차와 배치 실행
//!
//! 대상 하나의 상태 전이:
//!
//! ```text
//! Resolved ─▶ Discovered ─▶ Matched  ─▶ Applied ─▶ Updated | Skipped
//!    │                  └─▶ ToCreate ─▶ Applied ─▶ Created
//!    └─▶ NotFound ─▶ Skipped                    └─▶ Failed ─▶ Error
//! ```
//!
//! - 디스커버리 레코드가 없으면 `Skipped` ("no discovery data")
//! - 인벤토리에 장치가 없으면 생성 후 인터페이스/주소를 최선 노력으로 추가하고,
//!   생성 이후의 실패는 `Created` 결과의 `issues`에 기록
//! - 장치가 있으면 누락된 인터페이스/주소만 추가 (`Updated`), 추가할 것이 없으면
//!   `Skipped` ("already up to date")
//! - 그 밖의 `InventoryError`는 대상 경계에서 잡혀 `Error`가 됨
//!
//! 조정은 추가만 수행하며, 인벤토리에만 있는 인터페이스/주소는 삭제하지 않습니다.
//! 엔진은 실행 간 상태를 갖지 않으므로 존재 여부는 매번 조회로 다시 판단합니다.
//!
//! # 동시성
//!
//! 대상은 `max_concurrency` 크기의 세마포어로 제한된 `JoinSet`에서 처리되며,
//! 같은 장치 이름을 가진 대상들은 [`DeviceLocks`]로 직렬화됩니다.
//! 취소 시 새 대상은 시작하지 않고 진행 중인 작업은 중단되며, 리포트는
//! 처리된 대상만 포함한 부분 리포트(`partial = true`)가 됩니다.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use netsync_core::error::InputError;
use netsync_core::metrics as m;
use netsync_core::types::{
    DiscoveryRecord, InventoryDeviceRef, InventoryInterfaceRef, InventoryMode,
    REASON_NO_DISCOVERY_DATA, REASON_UP_TO_DATE, ReconciliationOutcome, ScanReport,
};
use tokio::sync::{OwnedMutexGuard, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::discovery::DiscoverySource;
use crate::error::InventoryError;
use crate::inventory::InventoryClient;
use crate::report::ReportAggregator;
use crate::resolver::ScanRequest;

/// 대상 처리 단계 (디버그 로그용)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetPhase {
    Resolved,
    Discovered,
    NotFound,
    Matched,
    ToCreate,
    Applied,
    Failed,
}

impl TargetPhase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Discovered => "discovered",
            Self::NotFound => "not_found",
            Self::Matched => "matched",
            Self::ToCreate => "to_create",
            Self::Applied => "applied",
            Self::Failed => "failed",
        }
    }
}

fn trace_phase(address: &str, phase: TargetPhase) {
    debug!(target_addr = address, phase = phase.as_str(), "target phase");
}

/// 장치 이름 단위 상호 배제
///
/// 같은 이름에 대한 조회-생성-갱신 시퀀스가 겹치지 않도록 합니다.
/// 대기자가 없는 항목은 잠금 해제 시 제거됩니다.
#[derive(Debug, Default)]
pub struct DeviceLocks {
    entries: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeviceLocks {
    /// 빈 잠금 테이블을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 장치 이름 잠금을 획득합니다.
    pub async fn lock(&self, name: &str) -> DeviceGuard<'_> {
        let entry = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(name.to_owned()).or_default())
        };
        let guard = entry.lock_owned().await;
        DeviceGuard {
            locks: self,
            name: name.to_owned(),
            guard: Some(guard),
        }
    }

    /// 현재 테이블에 남아 있는 이름 수
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 테이블이 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, name: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // 테이블만 참조하고 있으면 대기자가 없음
        if entries
            .get(name)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            entries.remove(name);
        }
    }
}

/// [`DeviceLocks::lock`]이 반환하는 가드. drop 시 잠금을 해제합니다.
pub struct DeviceGuard<'a> {
    locks: &'a DeviceLocks,
    name: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DeviceGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.name);
    }
}

/// 조정 엔진
///
/// 내부 상태는 모두 `Arc`로 공유되므로 복제 비용이 낮습니다.
pub struct ReconciliationEngine<C: InventoryClient> {
    inventory: Arc<C>,
    discovery: Arc<DiscoverySource>,
    locks: Arc<DeviceLocks>,
    max_concurrency: usize,
}

impl<C: InventoryClient> Clone for ReconciliationEngine<C> {
    fn clone(&self) -> Self {
        Self {
            inventory: Arc::clone(&self.inventory),
            discovery: Arc::clone(&self.discovery),
            locks: Arc::clone(&self.locks),
            max_concurrency: self.max_concurrency,
        }
    }
}

impl<C: InventoryClient> ReconciliationEngine<C> {
    /// 새 엔진을 생성합니다. `max_concurrency`는 최소 1로 보정됩니다.
    pub fn new(inventory: Arc<C>, discovery: Arc<DiscoverySource>, max_concurrency: usize) -> Self {
        Self {
            inventory,
            discovery,
            locks: Arc::new(DeviceLocks::new()),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// 인벤토리 모드
    pub fn mode(&self) -> InventoryMode {
        self.inventory.mode()
    }

    /// 인벤토리 클라이언트
    pub fn inventory(&self) -> &Arc<C> {
        &self.inventory
    }

    /// 디스커버리 소스
    pub fn discovery(&self) -> &Arc<DiscoverySource> {
        &self.discovery
    }

    /// 장치 잠금 테이블
    pub fn device_locks(&self) -> &DeviceLocks {
        &self.locks
    }

    /// 요청을 검증하고 조정을 실행합니다.
    ///
    /// 입력 에러는 어떤 디스커버리 조회보다 먼저 반환됩니다.
    pub async fn run(
        &self,
        request: &ScanRequest,
        max_targets: usize,
        cancel: CancellationToken,
    ) -> Result<ScanReport, InputError> {
        let resolved = request.resolve(max_targets)?;
        Ok(self
            .reconcile_with_cancel(&resolved.targets, resolved.name_prefix.as_deref(), cancel)
            .await)
    }

    /// 대상 목록을 조정합니다.
    pub async fn reconcile(&self, targets: &[IpAddr], name_prefix: Option<&str>) -> ScanReport {
        self.reconcile_with_cancel(targets, name_prefix, CancellationToken::new())
            .await
    }

    /// 취소 토큰과 함께 대상 목록을 조정합니다.
    ///
    /// 반환된 future를 drop하면 진행 중인 작업도 중단됩니다.
    pub async fn reconcile_with_cancel(
        &self,
        targets: &[IpAddr],
        name_prefix: Option<&str>,
        cancel: CancellationToken,
    ) -> ScanReport {
        let started = Instant::now();
        let mode = self.mode();
        let total = targets.len();
        info!(targets = total, mode = mode.as_str(), "reconciliation started");

        let prefix: Option<Arc<str>> = name_prefix.map(Arc::from);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut aggregator = ReportAggregator::new(total);
        let mut tasks = JoinSet::new();
        let mut indices = HashMap::with_capacity(total);
        let mut cancelled = false;

        for (index, addr) in targets.iter().copied().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        cancelled = true;
                        break;
                    }
                },
            };

            while let Some(done) = tasks.try_join_next_with_id() {
                Self::collect(&mut aggregator, &indices, done);
            }

            let engine = self.clone();
            let prefix = prefix.clone();
            let handle = tasks.spawn(async move {
                let _permit = permit;
                gauge!(m::ENGINE_TARGETS_IN_FLIGHT).increment(1.0);
                let outcome = engine.reconcile_target(addr, prefix.as_deref()).await;
                gauge!(m::ENGINE_TARGETS_IN_FLIGHT).decrement(1.0);
                outcome
            });
            indices.insert(handle.id(), (index, addr));
        }

        if cancelled {
            tasks.abort_all();
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled(), if !cancelled => {
                    cancelled = true;
                    tasks.abort_all();
                }
                next = tasks.join_next_with_id() => match next {
                    Some(done) => Self::collect(&mut aggregator, &indices, done),
                    None => break,
                },
            }
        }

        let partial = cancelled && !aggregator.is_complete();
        let processed = aggregator.recorded();
        let report = aggregator.finish(mode, partial);

        let elapsed = started.elapsed();
        histogram!(m::ENGINE_SCAN_DURATION_SECONDS).record(elapsed.as_secs_f64());
        counter!(m::ENGINE_SCANS_TOTAL, m::LABEL_MODE => mode.as_str()).increment(1);
        if partial {
            counter!(m::ENGINE_SCANS_CANCELLED_TOTAL).increment(1);
            warn!(
                processed,
                targets = total,
                "reconciliation cancelled, returning partial report"
            );
        }
        info!(
            scanned = report.scanned.len(),
            created = report.created.len(),
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "reconciliation finished"
        );
        report
    }

    /// 끝난 작업의 결과를 집계기에 기록합니다.
    ///
    /// 중단된 작업은 기록하지 않고, 패닉한 작업은 해당 대상의 `Error`로 기록합니다.
    fn collect(
        aggregator: &mut ReportAggregator,
        indices: &HashMap<tokio::task::Id, (usize, IpAddr)>,
        done: Result<(tokio::task::Id, ReconciliationOutcome), tokio::task::JoinError>,
    ) {
        match done {
            Ok((id, outcome)) => {
                if let Some(&(index, _)) = indices.get(&id) {
                    aggregator.record(index, outcome);
                }
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                if let Some(&(index, addr)) = indices.get(&e.id()) {
                    error!(target_addr = %addr, error = %e, "reconciliation task panicked");
                    aggregator.record(
                        index,
                        ReconciliationOutcome::error(addr.to_string(), "internal error"),
                    );
                }
            }
        }
    }

    /// 대상 하나를 조정합니다. 어떤 실패도 결과로 변환되어 반환됩니다.
    pub async fn reconcile_target(
        &self,
        addr: IpAddr,
        name_prefix: Option<&str>,
    ) -> ReconciliationOutcome {
        let address = addr.to_string();
        trace_phase(&address, TargetPhase::Resolved);

        let Some(record) = self.discovery.lookup(&addr) else {
            trace_phase(&address, TargetPhase::NotFound);
            let outcome = ReconciliationOutcome::skipped(&address, REASON_NO_DISCOVERY_DATA);
            Self::count(&outcome);
            return outcome;
        };
        trace_phase(&address, TargetPhase::Discovered);

        let device_name = record.device_name(name_prefix);
        let outcome = {
            let _guard = self.locks.lock(&device_name).await;
            match self.apply(&address, &device_name, &record).await {
                Ok(outcome) => {
                    trace_phase(&address, TargetPhase::Applied);
                    outcome
                }
                Err(e) => {
                    trace_phase(&address, TargetPhase::Failed);
                    warn!(
                        target_addr = %address,
                        device = %device_name,
                        error = %e,
                        kind = e.kind(),
                        "target reconciliation failed"
                    );
                    ReconciliationOutcome::error(&address, e.to_string())
                }
            }
        };

        Self::count(&outcome);
        outcome
    }

    fn count(outcome: &ReconciliationOutcome) {
        counter!(m::ENGINE_TARGETS_TOTAL, m::LABEL_ACTION => outcome.action.as_str()).increment(1);
    }

    async fn apply(
        &self,
        address: &str,
        device_name: &str,
        record: &DiscoveryRecord,
    ) -> Result<ReconciliationOutcome, InventoryError> {
        match self.inventory.find_device(device_name).await? {
            None => {
                trace_phase(address, TargetPhase::ToCreate);
                self.create(address, device_name, record).await
            }
            Some(device) => {
                trace_phase(address, TargetPhase::Matched);
                self.update(address, &device, record).await
            }
        }
    }

    /// 장치를 생성하고 인터페이스/주소를 최선 노력으로 추가합니다.
    async fn create(
        &self,
        address: &str,
        device_name: &str,
        record: &DiscoveryRecord,
    ) -> Result<ReconciliationOutcome, InventoryError> {
        let device = self
            .inventory
            .create_device(device_name, address, record.description.as_deref())
            .await?;
        info!(target_addr = address, device = device_name, "device created");

        let mut issues = Vec::new();
        for iface in &record.interfaces {
            let iface_ref = match self.inventory.ensure_interface(&device, &iface.name).await {
                Ok(iface_ref) => iface_ref,
                Err(e) => {
                    warn!(device = device_name, interface = %iface.name, error = %e, "interface creation failed");
                    issues.push(format!("interface {}: {e}", iface.name));
                    continue;
                }
            };
            for addr in &iface.addresses {
                if let Err(e) = self
                    .inventory
                    .ensure_address_assignment(&device, &iface_ref, addr)
                    .await
                {
                    warn!(device = device_name, interface = %iface.name, address = %addr, error = %e, "address assignment failed");
                    issues.push(format!("address {addr} on {}: {e}", iface.name));
                }
            }
        }

        Ok(ReconciliationOutcome::created(address, device_name, issues))
    }

    /// 누락된 인터페이스/주소만 추가합니다.
    ///
    /// 여기서 미리 걸러도 `ensure_address_assignment`가 주소를 다시 확인하므로
    /// Live 모드에서는 할당마다 조회 요청이 한 번 더 발생합니다.
    async fn update(
        &self,
        address: &str,
        device: &InventoryDeviceRef,
        record: &DiscoveryRecord,
    ) -> Result<ReconciliationOutcome, InventoryError> {
        let existing: HashMap<String, InventoryInterfaceRef> = self
            .inventory
            .find_interfaces(device)
            .await?
            .into_iter()
            .map(|iface| (iface.name.clone(), iface))
            .collect();

        let mut changes = 0usize;
        for iface in &record.interfaces {
            let (iface_ref, current) = match existing.get(&iface.name) {
                Some(iface_ref) => {
                    let current = self.inventory.find_addresses(device, iface_ref).await?;
                    (iface_ref.clone(), current.into_iter().collect::<HashSet<_>>())
                }
                None => {
                    let iface_ref = self.inventory.ensure_interface(device, &iface.name).await?;
                    changes += 1;
                    (iface_ref, HashSet::new())
                }
            };

            for addr in &iface.addresses {
                if current.contains(addr) {
                    continue;
                }
                self.inventory
                    .ensure_address_assignment(device, &iface_ref, addr)
                    .await?;
                changes += 1;
            }
        }

        if changes == 0 {
            return Ok(ReconciliationOutcome::skipped(address, REASON_UP_TO_DATE));
        }
        info!(
            target_addr = address,
            device = %device.name,
            changes,
            "device updated"
        );
        Ok(ReconciliationOutcome::updated(address, device.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use netsync_core::types::{InterfaceFact, OutcomeAction};

    use super::*;
    use crate::inventory::{DegradedInventory, InjectedFailure, MemoryInventory, operation as op};

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn record(hostname: &str, ifaces: &[(&str, &[&str])]) -> DiscoveryRecord {
        DiscoveryRecord {
            hostname: hostname.to_owned(),
            description: None,
            interfaces: ifaces
                .iter()
                .map(|(name, addrs)| InterfaceFact {
                    name: (*name).to_owned(),
                    addresses: addrs.iter().map(|a| (*a).to_owned()).collect(),
                })
                .collect(),
        }
    }

    fn discovery() -> Arc<DiscoverySource> {
        Arc::new(DiscoverySource::from_records([
            (
                ip("10.0.0.1"),
                record("sw1", &[("eth0", &["10.0.0.1/24"]), ("eth1", &["10.1.0.1/24"])]),
            ),
            (ip("10.0.0.2"), record("sw2", &[("eth0", &["10.0.0.2/24"])])),
        ]))
    }

    #[tokio::test]
    async fn unknown_address_is_skipped() {
        let engine = ReconciliationEngine::new(Arc::new(MemoryInventory::new()), discovery(), 4);
        let outcome = engine.reconcile_target(ip("10.9.9.9"), None).await;
        assert_eq!(outcome.action, OutcomeAction::Skipped);
        assert_eq!(outcome.detail, REASON_NO_DISCOVERY_DATA);
        assert_eq!(engine.inventory().total_calls(), 0);
    }

    #[tokio::test]
    async fn missing_device_is_created_with_interfaces() {
        let inv = Arc::new(MemoryInventory::new());
        let engine = ReconciliationEngine::new(Arc::clone(&inv), discovery(), 4);
        let outcome = engine.reconcile_target(ip("10.0.0.1"), None).await;
        assert_eq!(outcome.action, OutcomeAction::Created);
        assert_eq!(outcome.device.as_deref(), Some("sw1"));
        assert!(outcome.issues.is_empty());
        assert_eq!(inv.interfaces_of("sw1"), vec!["eth0", "eth1"]);
        assert_eq!(inv.addresses_of("sw1", "eth1"), vec!["10.1.0.1/24"]);
    }

    #[tokio::test]
    async fn name_prefix_applies_to_lookup_and_create() {
        let inv = Arc::new(MemoryInventory::new());
        let engine = ReconciliationEngine::new(Arc::clone(&inv), discovery(), 4);
        let outcome = engine.reconcile_target(ip("10.0.0.2"), Some("lab-")).await;
        assert_eq!(outcome.device.as_deref(), Some("lab-sw2"));
        assert_eq!(inv.device_names(), vec!["lab-sw2"]);
    }

    #[tokio::test]
    async fn post_creation_failures_become_issues() {
        let inv = Arc::new(MemoryInventory::new().with_operation_failure(
            "sw1",
            op::ENSURE_ADDRESS,
            InjectedFailure::Rejected(400),
        ));
        let engine = ReconciliationEngine::new(Arc::clone(&inv), discovery(), 4);
        let outcome = engine.reconcile_target(ip("10.0.0.1"), None).await;
        assert_eq!(outcome.action, OutcomeAction::Created);
        assert_eq!(outcome.issues.len(), 2);
        assert!(outcome.issues[0].contains("10.0.0.1/24"));
    }

    #[tokio::test]
    async fn existing_device_gets_only_missing_facts() {
        let inv = Arc::new(MemoryInventory::new().with_device(
            "sw1",
            vec![InterfaceFact {
                name: "eth0".to_owned(),
                addresses: vec!["10.0.0.1/24".to_owned(), "192.0.2.1/32".to_owned()],
            }],
        ));
        let engine = ReconciliationEngine::new(Arc::clone(&inv), discovery(), 4);
        let outcome = engine.reconcile_target(ip("10.0.0.1"), None).await;
        assert_eq!(outcome.action, OutcomeAction::Updated);
        assert_eq!(inv.calls(op::CREATE_DEVICE), 0);
        assert_eq!(inv.calls(op::ENSURE_INTERFACE), 1);
        assert_eq!(inv.calls(op::ENSURE_ADDRESS), 1);
        // 추가 전용: 인벤토리에만 있던 주소는 유지
        assert_eq!(
            inv.addresses_of("sw1", "eth0"),
            vec!["10.0.0.1/24", "192.0.2.1/32"]
        );
    }

    #[tokio::test]
    async fn up_to_date_device_is_skipped() {
        let inv = Arc::new(
            MemoryInventory::new()
                .with_device("sw2", vec![InterfaceFact {
                    name: "eth0".to_owned(),
                    addresses: vec!["10.0.0.2/24".to_owned()],
                }]),
        );
        let engine = ReconciliationEngine::new(Arc::clone(&inv), discovery(), 4);
        let outcome = engine.reconcile_target(ip("10.0.0.2"), None).await;
        assert_eq!(outcome.action, OutcomeAction::Skipped);
        assert_eq!(outcome.detail, REASON_UP_TO_DATE);
    }

    #[tokio::test]
    async fn lookup_failure_becomes_error() {
        let inv = Arc::new(MemoryInventory::new().with_device_failure("sw1", InjectedFailure::Unavailable));
        let engine = ReconciliationEngine::new(inv, discovery(), 4);
        let outcome = engine.reconcile_target(ip("10.0.0.1"), None).await;
        assert_eq!(outcome.action, OutcomeAction::Error);
        assert!(outcome.detail.contains("unavailable"));
    }

    #[tokio::test]
    async fn batch_report_keeps_submission_order() {
        let engine = ReconciliationEngine::new(
            Arc::new(MemoryInventory::new().with_latency(Duration::from_millis(5))),
            discovery(),
            3,
        );
        let targets = [ip("10.0.0.2"), ip("10.9.9.9"), ip("10.0.0.1")];
        let report = engine.reconcile(&targets, None).await;
        assert_eq!(report.scanned, vec!["10.0.0.2", "10.9.9.9", "10.0.0.1"]);
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.created[0].ip, "10.0.0.2");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.mode, InventoryMode::Memory);
        assert!(!report.partial);
    }

    #[tokio::test]
    async fn degraded_mode_reports_created() {
        let engine = ReconciliationEngine::new(Arc::new(DegradedInventory::new()), discovery(), 2);
        let report = engine.reconcile(&[ip("10.0.0.1"), ip("10.0.0.2")], None).await;
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.mode, InventoryMode::Degraded);
    }

    #[tokio::test]
    async fn pre_cancelled_batch_is_empty_and_partial() {
        let engine = ReconciliationEngine::new(Arc::new(MemoryInventory::new()), discovery(), 2);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = engine
            .reconcile_with_cancel(&[ip("10.0.0.1")], None, cancel)
            .await;
        assert!(report.scanned.is_empty());
        assert!(report.partial);
    }

    #[tokio::test]
    async fn run_rejects_input_before_lookup() {
        let engine = ReconciliationEngine::new(Arc::new(MemoryInventory::new()), discovery(), 2);
        let request = ScanRequest {
            cidr: Some("10.0.0.0/33".to_owned()),
            ..ScanRequest::default()
        };
        let err = engine
            .run(&request, 16, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "InvalidCIDR");
        assert_eq!(engine.discovery().lookup_count(), 0);
    }

    #[tokio::test]
    async fn device_locks_are_pruned() {
        let locks = DeviceLocks::new();
        {
            let _a = locks.lock("sw1").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn device_locks_serialize_same_name() {
        let locks = Arc::new(DeviceLocks::new());
        let guard = locks.lock("sw1").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock("sw1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
