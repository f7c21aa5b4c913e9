//! `format(parse(f)) == f` byte-for-byte, for every fixture on disk.

use std::fs;
use std::path::Path;

#[test]
fn every_fixture_round_trips_byte_identical() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let mut checked = 0;
    for entry in fs::read_dir(&dir).expect("fixtures dir") {
        let entry = entry.expect("dir entry");
        if !entry.file_type().expect("file type").is_file() {
            continue;
        }
        let path = entry.path();
        let source = fs::read_to_string(&path).expect("read fixture");
        let tree = sexpr_codec::parse(&source)
            .unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()));
        let rendered = sexpr_codec::format(&tree);
        assert_eq!(
            rendered,
            source,
            "round-trip mismatch for {}",
            path.display()
        );
        checked += 1;
    }
    assert!(checked > 0, "expected at least one fixture under {dir:?}");
}
