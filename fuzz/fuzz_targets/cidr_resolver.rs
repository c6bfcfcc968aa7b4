#![no_main]

use libfuzzer_sys::fuzz_target;
use netsync_reconciler::resolve_cidr;

/// 퍼징 중 메모리 폭주를 막기 위한 대상 상한
const MAX_TARGETS: usize = 1024;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(targets) = resolve_cidr(input, MAX_TARGETS) {
            assert!(!targets.is_empty());
            assert!(targets.len() <= MAX_TARGETS);
            assert!(targets.windows(2).all(|w| w[0] < w[1]));
        }
    }
});
