#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use vulnlens_engine::collector::CollectorRegistry;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    manifest: FuzzManifest,
    text: String,
}

#[derive(Arbitrary, Debug)]
enum FuzzManifest {
    PackageJson,
    Requirements,
    GoMod,
}

impl FuzzManifest {
    fn file_name(&self) -> &'static str {
        match self {
            FuzzManifest::PackageJson => "package.json",
            FuzzManifest::Requirements => "requirements.txt",
            FuzzManifest::GoMod => "go.mod",
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let registry = CollectorRegistry::with_defaults();
    let Some(collector) = registry.find(input.manifest.file_name()) else {
        return;
    };
    let Ok(dependencies) = collector.collect(&input.text) else {
        return;
    };

    let line_count = input.text.lines().count() as u32;
    for dep in &dependencies {
        // 범위는 문서 안에 있고 시작이 끝보다 앞서야 한다
        for range in [dep.name.range, dep.version.range] {
            assert!(range.start <= range.end, "inverted range for {dep}");
            assert!(range.end.line < line_count.max(1), "range past end of document for {dep}");
        }
        assert!(!dep.name.value.is_empty(), "empty dependency name");
    }
});
