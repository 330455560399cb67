#![no_main]

use libfuzzer_sys::fuzz_target;
use vulnlens_core::pipeline::Collector;
use vulnlens_engine::collector::GolangCollector;

fuzz_target!(|data: &[u8]| {
    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    if let Ok(content) = std::str::from_utf8(data) {
        let _ = GolangCollector.collect(content);
    }
});
