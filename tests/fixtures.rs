use schema_required::cli::resolve_file_path_patterns;
use schema_required::fixture::Fixture;

#[test]
fn fixture_files_hold() {
    let pattern = format!("{}/fixtures/*.json", env!("CARGO_MANIFEST_DIR"));
    let files = resolve_file_path_patterns([pattern]).unwrap();
    assert!(files.len() >= 6, "expected the fixture set, found {} files", files.len());

    let mut failures = Vec::new();
    for file in &files {
        let fixture = Fixture::from_path(file).unwrap();
        for outcome in fixture.run().unwrap() {
            if !outcome.passed() {
                failures.push(format!("{}: {:?} → {:?}", file.display(), outcome.case.path, outcome.got));
            }
        }
    }
    assert!(failures.is_empty(), "failing cases:\n{}", failures.join("\n"));
}
