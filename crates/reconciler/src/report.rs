//! 리포트 집계 -- 대상별 결과를 제출 순서대로 [`ScanReport`]로 모읍니다.
//!
//! 작업자는 임의의 순서로 끝나므로 결과는 대상 인덱스 슬롯에 기록되고,
//! [`ReportAggregator::finish`]에서 인덱스 순서로 펼쳐집니다.
//! 취소된 배치는 기록된 대상만 포함합니다.

use netsync_core::types::{InventoryMode, ReconciliationOutcome, ScanReport};
use tracing::warn;

/// 결과 집계기
#[derive(Debug)]
pub struct ReportAggregator {
    slots: Vec<Option<ReconciliationOutcome>>,
    recorded: usize,
}

impl ReportAggregator {
    /// `total`개 대상을 위한 집계기를 생성합니다.
    pub fn new(total: usize) -> Self {
        Self {
            slots: (0..total).map(|_| None).collect(),
            recorded: 0,
        }
    }

    /// 대상 인덱스의 결과를 기록합니다.
    ///
    /// 범위를 벗어나거나 이미 기록된 인덱스는 무시합니다.
    pub fn record(&mut self, index: usize, outcome: ReconciliationOutcome) {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(outcome);
                self.recorded += 1;
            }
            Some(_) => {
                warn!(index, address = %outcome.address, "duplicate outcome ignored");
            }
            None => {
                warn!(index, total = self.slots.len(), "outcome index out of range");
            }
        }
    }

    /// 기록된 결과 수
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// 모든 대상이 기록되었는지 여부
    pub fn is_complete(&self) -> bool {
        self.recorded == self.slots.len()
    }

    /// 불변 리포트를 생성합니다.
    pub fn finish(self, mode: InventoryMode, partial: bool) -> ScanReport {
        let mut report = ScanReport::new(mode);
        for outcome in self.slots.into_iter().flatten() {
            report.push(outcome);
        }
        report.partial = partial;
        report
    }
}
