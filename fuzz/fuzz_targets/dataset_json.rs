#![no_main]

use libfuzzer_sys::fuzz_target;
use netsync_reconciler::DiscoverySource;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = std::str::from_utf8(data) {
        if let Ok(source) = DiscoverySource::from_json(json) {
            let count = source.records().count();
            assert_eq!(count, source.len());
            for (_, record) in source.records() {
                assert!(!record.hostname.is_empty());
            }
        }
    }
});
