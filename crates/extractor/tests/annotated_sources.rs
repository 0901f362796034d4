use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;
use threatspec_core::{check_coverage, normalize, unmitigated, AnnotationReader, CoverageProfile};
use threatspec_extractor::{ExtractorConfig, TreeSitterExtractor};

const STORE_GO: &str = r#"// alias component @db to Database Server
package store

// Exposes @db to SQL Injection with string concatenation
func (s *Store) Find(name string) {
	s.query(name)
}

// Mitigates @db against SQL Injection with parameterized queries
// Transfers Denial of Service to Internet:@db with managed database provider
func (s *Store) query(name string) {}

// alias threat @dos to Denial of Service
func helper() {}
"#;

#[test]
fn go_file_builds_model() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.go");
    fs::write(&path, STORE_GO).unwrap();

    let mut reader = AnnotationReader::new("default", TreeSitterExtractor::default());
    reader.read_paths([&path]).unwrap();
    let model = reader.model();

    assert_eq!(model.component_name(&normalize("@db")), "Database Server");
    // aliases anywhere in the file are file-scoped and applied first
    assert_eq!(model.threat_name(&normalize("@dos")), "Denial of Service");

    let exposure = model.exposures().next().unwrap();
    let source = exposure.source.as_ref().unwrap();
    assert_eq!(source.function, "store.(*Store).Find");
    assert_eq!(source.line, 5);
    assert_eq!(source.file, path.display().to_string());

    assert!(unmitigated(model.exposures(), model.mitigations()).is_empty());
    assert_eq!(model.projects["default"].transfers.len(), 1);
    assert_eq!(model.callflow.len(), 1);
    assert_eq!(model.callflow[0].destination, "store.(*Store).query");
}

#[test]
fn coverage_uses_short_function_name() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.go");
    fs::write(&path, STORE_GO).unwrap();

    let mut reader = AnnotationReader::new("default", TreeSitterExtractor::default());
    reader.read_path(&path).unwrap();

    let profile = CoverageProfile::parse(&format!("{}:11:\tquery\t\t50.0%\n", path.display())).unwrap();
    let findings = check_coverage(reader.model().mitigations(), &profile, 80.0);
    assert_eq!(findings.len(), 1);
    assert_eq!(
        findings[0].to_string(),
        format!(
            "Coverage 50.0 < 80.0 for mitigation function {}:11:query",
            path.display()
        )
    );
}

#[test]
fn syntax_error_aborts_reading() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.py");
    fs::write(&path, "def broken(:\n    pass\n").unwrap();

    let mut reader = AnnotationReader::new("default", TreeSitterExtractor::default());
    let err = reader.read_path(&path).unwrap_err();
    assert!(err.to_string().contains("broken.py"), "{err}");
}

#[test]
fn callflow_can_be_disabled() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.go");
    fs::write(&path, STORE_GO).unwrap();

    let config = ExtractorConfig {
        include_callflow: false,
        ..Default::default()
    };
    let mut reader = AnnotationReader::new("default", TreeSitterExtractor::new(config).unwrap());
    reader.read_path(&path).unwrap();
    assert!(reader.model().callflow.is_empty());
}

#[test]
fn typescript_methods_carry_class_name() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("auth.ts");
    fs::write(
        &path,
        r#"export class Auth {
  // Exposes Login to Brute Force with unlimited attempts
  login(user: string): boolean {
    return true;
  }
}
"#,
    )
    .unwrap();

    let mut reader = AnnotationReader::new("web", TreeSitterExtractor::default());
    reader.read_path(&path).unwrap();
    let exposure = reader.model().exposures().next().unwrap();
    assert_eq!(exposure.source.as_ref().unwrap().function, "Auth.login");
    assert_eq!(exposure.threat, normalize("Brute Force"));
}

#[test]
fn go_comments_apart_from_functions_are_recorded() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.go");
    fs::write(
        &path,
        "package cache\n\nfunc A() {}\n\n// Exposes Database to SQL Injection with raw input\n\nfunc B() {}\n\nfunc C() {} // Exposes Cache to Poisoning with unsigned keys\n",
    )
    .unwrap();

    let mut reader = AnnotationReader::new("default", TreeSitterExtractor::default());
    reader.read_path(&path).unwrap();
    let model = reader.model();

    let mut functions: Vec<&str> = model
        .exposures()
        .filter_map(|e| e.source.as_ref())
        .map(|s| s.function.as_str())
        .collect();
    functions.sort_unstable();
    assert_eq!(functions, vec!["cache.B", "cache.C"]);
    assert_eq!(unmitigated(model.exposures(), model.mitigations()).len(), 2);
}
