// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

fn write_definition(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).expect("Failed to write definition");
}

fn populated_root() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_definition(tmp.path(), "gcc/9.3.yaml", "whatis: GNU Compiler Collection 9.3\n");
    write_definition(tmp.path(), "gcc/10.2.yml", "whatis: GNU Compiler Collection 10.2\n");
    write_definition(
        tmp.path(),
        "openmpi/4.0.yaml",
        "whatis: Open MPI 4.0\nprerequisites: [gcc/9.3]\n",
    );
    write_definition(tmp.path(), "libgcc-compat/1.0.yaml", "whatis: Compatibility runtime\n");
    write_definition(tmp.path(), "README.md", "not a definition");
    write_definition(tmp.path(), ".hidden/1.0.yaml", "whatis: never seen\n");
    tmp
}

#[rstest]
fn test_find_exact_name() {
    let root = populated_root();
    let registry = ModuleRegistry::from_modulepath(&[root.path()]);

    assert_eq!(registry.len(), 4);
    let module = registry.find("gcc/9.3").unwrap();
    assert_eq!(module.whatis, "GNU Compiler Collection 9.3");
    assert!(module.source_digest.is_some());
    assert!(registry.warnings().is_empty());
}

#[rstest]
fn test_find_is_case_sensitive() {
    let root = populated_root();
    let registry = ModuleRegistry::from_modulepath(&[root.path()]);
    let err = registry.find("GCC/9.3").unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[rstest]
fn test_not_found_suggests_family() {
    let root = populated_root();
    let registry = ModuleRegistry::from_modulepath(&[root.path()]);
    match registry.find("gcc/11.1") {
        Err(Error::NotFound { similar, .. }) => {
            assert_eq!(similar, vec!["gcc/10.2", "gcc/9.3"]);
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[rstest]
fn test_search_sorted_substring() {
    let root = populated_root();
    let registry = ModuleRegistry::from_modulepath(&[root.path()]);

    let names: Vec<String> = registry
        .search(Some("gcc"))
        .iter()
        .map(|m| m.name.clone())
        .collect();
    assert_eq!(names, vec!["gcc/10.2", "gcc/9.3", "libgcc-compat/1.0"]);
    assert_eq!(registry.search(None).len(), 4);
    assert!(registry.search(Some("nothing")).is_empty());
}

#[rstest]
fn test_malformed_definition_is_isolated() {
    let root = populated_root();
    write_definition(root.path(), "broken/1.0.yaml", "environment: [[[\n");
    write_definition(
        root.path(),
        "named/2.0.yaml",
        "name: custom/2.0\nenvironment:\n  - set: 'BAD NAME'\n    value: x\n",
    );

    let registry = ModuleRegistry::from_modulepath(&[root.path()]);
    assert_eq!(registry.len(), 4);
    assert_eq!(registry.warnings().len(), 2);

    let err = registry.find("broken/1.0").unwrap_err();
    assert!(matches!(err, Error::MalformedDefinition { .. }));
    assert_eq!(err.exit_code(), 5);

    // the declared name is preferred over the file location
    assert!(matches!(
        registry.find("custom/2.0"),
        Err(Error::MalformedDefinition { .. })
    ));
}

#[rstest]
fn test_first_root_wins() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write_definition(first.path(), "tool/1.0.yaml", "whatis: from first\n");
    write_definition(second.path(), "tool/1.0.yaml", "whatis: from second\n");
    write_definition(second.path(), "other/1.0.yaml", "whatis: only second\n");

    let registry = ModuleRegistry::from_modulepath(&[first.path(), second.path()]);
    assert_eq!(registry.find("tool/1.0").unwrap().whatis, "from first");
    assert!(registry.contains("other/1.0"));
    assert_eq!(registry.warnings().len(), 1);
}

#[rstest]
fn test_missing_root_is_skipped() {
    let root = populated_root();
    let missing = root.path().join("does-not-exist");
    let registry = ModuleRegistry::from_modulepath(&[missing.as_path(), root.path()]);
    assert_eq!(registry.len(), 4);
}

#[rstest]
fn test_lazy_registry_builds_once() {
    let root = populated_root();
    let lazy = LazyRegistry::new(vec![root.path().to_path_buf()]);
    let first = lazy.get();

    write_definition(root.path(), "late/1.0.yaml", "whatis: added later\n");
    let second = lazy.get();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(!second.contains("late/1.0"));
}

#[rstest]
fn test_name_from_path() {
    let root = Path::new("/modules");
    assert_eq!(
        name_from_path(root, Path::new("/modules/gcc/9.3.yaml")).as_deref(),
        Some("gcc/9.3")
    );
    assert_eq!(
        name_from_path(root, Path::new("/modules/intel/oneapi/2024.yml")).as_deref(),
        Some("intel/oneapi/2024")
    );
}
