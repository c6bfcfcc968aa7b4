#![no_main]

use libfuzzer_sys::fuzz_target;
use netsync_core::config::NetsyncConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        if let Ok(config) = NetsyncConfig::parse(content) {
            let _ = config.validate();
        }
    }
});
