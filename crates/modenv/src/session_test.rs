// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::{fixture, rstest};

use super::*;
use crate::definition::ModuleDefinition;

fn module(yaml: &str) -> Module {
    ModuleDefinition::from_yaml(yaml)
        .and_then(|d| d.into_module(None))
        .expect("valid module")
}

#[fixture]
fn gcc() -> Module {
    module(
        r#"
name: gcc/9.3
conflicts: [gcc]
environment:
  - set: CC
    value: gcc
  - prepend: PATH
    value: /opt/gcc/9.3/bin
  - prepend: LD_LIBRARY_PATH
    value: /opt/gcc/9.3/lib
"#,
    )
}

#[fixture]
fn openmpi() -> Module {
    module(
        r#"
name: openmpi/4.0
prerequisites: [gcc/9.3]
environment:
  - prepend: PATH
    value: /opt/openmpi/4.0/bin
  - set: MPI_HOME
    value: /opt/openmpi/4.0
"#,
    )
}

#[fixture]
fn cmake() -> Module {
    module(
        r#"
name: cmake/3.27
environment:
  - append: PATH
    value: /opt/cmake/bin
  - unset: CMAKE_PREFIX_PATH
"#,
    )
}

#[fixture]
fn baseline() -> EnvironmentState {
    [
        ("PATH", "/usr/bin:/bin"),
        ("CMAKE_PREFIX_PATH", "/usr"),
        ("HOME", "/home/user"),
    ]
    .into_iter()
    .collect()
}

#[rstest]
fn test_load_unload_round_trip(baseline: EnvironmentState, gcc: Module) {
    let mut session = Session::new(baseline.clone());
    assert_eq!(session.load(&gcc).unwrap(), LoadStatus::Loaded);
    assert_eq!(session.env().get("PATH"), Some("/opt/gcc/9.3/bin:/usr/bin:/bin"));
    assert_eq!(session.env().get(LOADED_MODULES_VAR), Some("gcc/9.3"));
    assert!(session.env().contains(SESSION_VAR));

    assert_eq!(session.unload("gcc/9.3", false).unwrap(), UnloadStatus::Unloaded);
    assert_eq!(session.env(), &baseline);
    assert!(session.stack().is_empty());
}

#[rstest]
fn test_load_twice_is_noop(baseline: EnvironmentState, gcc: Module) {
    let mut session = Session::new(baseline);
    session.load(&gcc).unwrap();
    let once = session.clone();

    assert_eq!(session.load(&gcc).unwrap(), LoadStatus::AlreadyLoaded);
    assert_eq!(session, once);
}

#[rstest]
fn test_unload_not_loaded_is_noop(baseline: EnvironmentState) {
    let mut session = Session::new(baseline.clone());
    assert_eq!(
        session.unload("gcc/9.3", false).unwrap(),
        UnloadStatus::AlreadyUnloaded
    );
    assert_eq!(session.env(), &baseline);
}

#[rstest]
fn test_conflict_leaves_session_unchanged(baseline: EnvironmentState, gcc: Module) {
    let other = module("name: gcc/10.2\nenvironment:\n  - set: CC\n    value: gcc-10\n");
    let mut session = Session::new(baseline);
    session.load(&gcc).unwrap();
    let before = session.clone();

    let err = session.load(&other).unwrap_err();
    assert!(matches!(err, Error::Conflict { .. }));
    assert_eq!(session, before);
}

#[rstest]
fn test_prerequisite_order(baseline: EnvironmentState, gcc: Module, openmpi: Module) {
    let mut session = Session::new(baseline);
    let err = session.load(&openmpi).unwrap_err();
    assert!(matches!(err, Error::MissingPrerequisite { .. }));
    assert!(session.stack().is_empty());

    session.load(&gcc).unwrap();
    session.load(&openmpi).unwrap();
    assert_eq!(
        session.env().get(LOADED_MODULES_VAR),
        Some("gcc/9.3:openmpi/4.0")
    );
}

#[rstest]
fn test_dependent_protected_unload(baseline: EnvironmentState, gcc: Module, openmpi: Module) {
    let mut session = Session::new(baseline);
    session.load(&gcc).unwrap();
    session.load(&openmpi).unwrap();
    let before = session.clone();

    let err = session.unload("gcc/9.3", false).unwrap_err();
    assert!(matches!(err, Error::DependentInUse { .. }));
    assert_eq!(session, before);

    session.unload("gcc/9.3", true).unwrap();
    let names: Vec<&str> = session.stack().names().collect();
    assert_eq!(names, vec!["openmpi/4.0"]);
    assert_eq!(session.env().get("CC"), None);
    assert_eq!(
        session.env().get("PATH"),
        Some("/opt/openmpi/4.0/bin:/usr/bin:/bin")
    );
}

#[rstest]
fn test_purge_restores_baseline(
    baseline: EnvironmentState,
    gcc: Module,
    openmpi: Module,
    cmake: Module,
) {
    let mut session = Session::new(baseline.clone());
    session.load(&cmake).unwrap();
    session.load(&gcc).unwrap();
    session.load(&openmpi).unwrap();

    let report = session.purge(false);
    assert!(report.blocked.is_none());
    assert_eq!(report.unloaded, vec!["openmpi/4.0", "gcc/9.3", "cmake/3.27"]);
    assert_eq!(session.env(), &baseline);
}

#[rstest]
fn test_resume_across_invocations(baseline: EnvironmentState, gcc: Module, cmake: Module) {
    let mut first = Session::new(baseline.clone());
    first.load(&gcc).unwrap();
    first.load(&cmake).unwrap();

    // a new process sees only the environment the shell evaluated
    let mut second = Session::resume(first.env().clone()).unwrap();
    assert_eq!(second.stack(), first.stack());

    second.unload("gcc/9.3", false).unwrap();
    let mut third = Session::resume(second.env().clone()).unwrap();
    third.unload("cmake/3.27", false).unwrap();
    assert_eq!(third.env(), &baseline);
}

#[rstest]
fn test_resume_without_state(baseline: EnvironmentState) {
    let session = Session::resume(baseline).unwrap();
    assert!(session.stack().is_empty());
}

#[rstest]
#[case::not_json("{nope")]
#[case::wrong_version(r#"{"version":99,"stack":[]}"#)]
fn test_resume_corrupt_state(mut baseline: EnvironmentState, #[case] encoded: &str) {
    baseline.set(SESSION_VAR, encoded);
    let err = Session::resume(baseline).unwrap_err();
    assert!(matches!(err, Error::CorruptSession(_)));
    assert_eq!(err.exit_code(), crate::GENERAL_FAILURE_EXIT_CODE);
}

#[rstest]
fn test_resume_rejects_duplicate_entries(baseline: EnvironmentState, gcc: Module) {
    let mut session = Session::new(baseline);
    session.load(&gcc).unwrap();

    let mut record: serde_json::Value =
        serde_json::from_str(session.env().get(SESSION_VAR).unwrap()).unwrap();
    let entry = record["stack"][0].clone();
    record["stack"].as_array_mut().unwrap().push(entry);

    let mut env = session.env().clone();
    env.set(SESSION_VAR, record.to_string());
    let err = Session::resume(env).unwrap_err();
    assert!(matches!(err, Error::CorruptSession(ref reason) if reason.contains("gcc/9.3")));
}

#[rstest]
fn test_transaction_rolls_back(baseline: EnvironmentState, gcc: Module, openmpi: Module) {
    let mut session = Session::new(baseline.clone());
    let result = session.transaction(|draft| {
        draft.load(&openmpi)?;
        draft.load(&gcc)?;
        Ok(())
    });
    assert!(result.is_err());
    assert_eq!(session.env(), &baseline);

    session
        .transaction(|draft| {
            draft.load(&gcc)?;
            draft.load(&openmpi)
        })
        .unwrap();
    assert_eq!(session.stack().len(), 2);
}

#[rstest]
#[case::set_then_set("  - set: CC\n    value: cc-a\n")]
#[case::unset_then_set("  - unset: CC\n")]
fn test_unload_oldest_first_restores_baseline(#[case] first_operations: &str) {
    let baseline: EnvironmentState = [("CC", "cc"), ("PATH", "/usr/bin")].into_iter().collect();
    let first = module(&format!("name: a/1\nenvironment:\n{first_operations}"));
    let second = module("name: b/1\nenvironment:\n  - set: CC\n    value: cc-b\n");

    let mut session = Session::new(baseline.clone());
    session.load(&first).unwrap();
    session.load(&second).unwrap();

    session.unload("a/1", false).unwrap();
    assert_eq!(session.env().get("CC"), Some("cc-b"));

    // the value is still handed back after a round trip through the shell
    let mut session = Session::resume(session.env().clone()).unwrap();
    session.unload("b/1", false).unwrap();
    assert_eq!(session.env(), &baseline);
}

#[rstest]
fn test_unload_middle_of_three(baseline: EnvironmentState) {
    let mut session = Session::new(baseline.clone());
    for (name, value) in [("a/1", "cc-a"), ("b/1", "cc-b"), ("c/1", "cc-c")] {
        let module = module(&format!(
            "name: {name}\nenvironment:\n  - set: CC\n    value: {value}\n"
        ));
        session.load(&module).unwrap();
    }

    session.unload("b/1", false).unwrap();
    assert_eq!(session.env().get("CC"), Some("cc-c"));
    session.unload("c/1", false).unwrap();
    assert_eq!(session.env().get("CC"), Some("cc-a"));
    session.unload("a/1", false).unwrap();
    assert_eq!(session.env(), &baseline);
}
