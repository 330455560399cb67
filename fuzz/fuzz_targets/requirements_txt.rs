#![no_main]

use libfuzzer_sys::fuzz_target;
use vulnlens_core::pipeline::Collector;
use vulnlens_engine::collector::PypiCollector;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        let _ = PypiCollector.collect(content);
    }
});
