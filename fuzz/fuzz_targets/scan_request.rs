#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use netsync_reconciler::ScanRequest;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    cidr: Option<String>,
    ips: Option<Vec<String>>,
    name_prefix: Option<String>,
    /// 대상 상한 (1..=512로 접음)
    max_targets: u16,
}

fuzz_target!(|input: FuzzInput| {
    let max_targets = usize::from(input.max_targets % 512) + 1;
    let request = ScanRequest {
        cidr: input.cidr,
        ips: input.ips.map(|ips| ips.into_iter().take(64).collect()),
        name_prefix: input.name_prefix,
    };

    if let Ok(resolved) = request.resolve(max_targets) {
        assert!(!resolved.targets.is_empty());
        assert!(resolved.targets.len() <= max_targets);

        let unique: HashSet<_> = resolved.targets.iter().collect();
        assert_eq!(unique.len(), resolved.targets.len(), "targets must be deduplicated");

        if let Some(prefix) = resolved.name_prefix {
            assert!(!prefix.is_empty());
            assert!(!prefix.chars().any(char::is_whitespace));
        }
    }
});
