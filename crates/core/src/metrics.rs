//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `netsync_`
//! - 모듈명: `engine_`, `inventory_`, `discovery_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//! use netsync_core::metrics as m;
//!
//! counter!(m::ENGINE_TARGETS_TOTAL, m::LABEL_ACTION => "created").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 조정 결과 레이블 키 (created, updated, skipped, error)
pub const LABEL_ACTION: &str = "action";

/// 인벤토리 모드 레이블 키 (live, degraded, memory)
pub const LABEL_MODE: &str = "mode";

/// 인벤토리 호출 종류 레이블 키 (find_device, create_device, ...)
pub const LABEL_OPERATION: &str = "operation";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Engine 메트릭 ──────────────────────────────────────────────────

/// Engine: 완료된 스캔 수 (counter, label: mode)
pub const ENGINE_SCANS_TOTAL: &str = "netsync_engine_scans_total";

/// Engine: 취소되어 부분 리포트로 끝난 스캔 수 (counter)
pub const ENGINE_SCANS_CANCELLED_TOTAL: &str = "netsync_engine_scans_cancelled_total";

/// Engine: 결과별 처리된 대상 수 (counter, label: action)
pub const ENGINE_TARGETS_TOTAL: &str = "netsync_engine_targets_total";

/// Engine: 스캔 소요 시간 (histogram, 초)
pub const ENGINE_SCAN_DURATION_SECONDS: &str = "netsync_engine_scan_duration_seconds";

/// Engine: 처리 중인 대상 수 (gauge)
pub const ENGINE_TARGETS_IN_FLIGHT: &str = "netsync_engine_targets_in_flight";

// ─── Inventory 메트릭 ───────────────────────────────────────────────

/// Inventory: 백엔드 호출 수 (counter, labels: operation, result)
pub const INVENTORY_REQUESTS_TOTAL: &str = "netsync_inventory_requests_total";

/// Inventory: 백엔드 호출 지연 시간 (histogram, 초, label: operation)
pub const INVENTORY_REQUEST_DURATION_SECONDS: &str =
    "netsync_inventory_request_duration_seconds";

/// Inventory: 읽기 호출 재시도 수 (counter, label: operation)
pub const INVENTORY_RETRIES_TOTAL: &str = "netsync_inventory_retries_total";

/// Inventory: 감사 로그로 기록된 변경 의도 수 (counter, labels: operation, mode)
pub const INVENTORY_MUTATIONS_TOTAL: &str = "netsync_inventory_mutations_total";

// ─── Discovery 메트릭 ───────────────────────────────────────────────

/// Discovery: 조회 수 (counter)
pub const DISCOVERY_LOOKUPS_TOTAL: &str = "netsync_discovery_lookups_total";

/// Discovery: 데이터셋에 로드된 레코드 수 (gauge)
pub const DISCOVERY_DATASET_ENTRIES: &str = "netsync_discovery_dataset_entries";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "netsync_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "netsync_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 인벤토리 호출 지연 시간 히스토그램 버킷 (초)
///
/// 1ms ~ 30s 범위
pub const REQUEST_DURATION_BUCKETS: [f64; 10] =
    [0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 30.0];

/// 스캔 소요 시간 히스토그램 버킷 (초)
///
/// 10ms ~ 600s 범위 (대상 수와 백엔드 지연에 비례)
pub const SCAN_DURATION_BUCKETS: [f64; 9] = [0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0, 600.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `netsync-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Engine
    describe_counter!(
        ENGINE_SCANS_TOTAL,
        "Total number of reconciliation scans completed"
    );
    describe_counter!(
        ENGINE_SCANS_CANCELLED_TOTAL,
        "Total number of scans cancelled before all targets finished"
    );
    describe_counter!(
        ENGINE_TARGETS_TOTAL,
        "Targets processed per outcome (created, updated, skipped, error)"
    );
    describe_histogram!(
        ENGINE_SCAN_DURATION_SECONDS,
        "Time to reconcile a full target batch in seconds"
    );
    describe_gauge!(
        ENGINE_TARGETS_IN_FLIGHT,
        "Number of targets currently being reconciled"
    );

    // Inventory
    describe_counter!(
        INVENTORY_REQUESTS_TOTAL,
        "Inventory backend calls per operation and result"
    );
    describe_histogram!(
        INVENTORY_REQUEST_DURATION_SECONDS,
        "Inventory backend call latency in seconds"
    );
    describe_counter!(
        INVENTORY_RETRIES_TOTAL,
        "Retried idempotent inventory reads"
    );
    describe_counter!(
        INVENTORY_MUTATIONS_TOTAL,
        "Intended inventory mutations recorded in the audit trail"
    );

    // Discovery
    describe_counter!(
        DISCOVERY_LOOKUPS_TOTAL,
        "Total number of discovery source lookups"
    );
    describe_gauge!(
        DISCOVERY_DATASET_ENTRIES,
        "Number of records loaded into the discovery source"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "netsync daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
