// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;
use crate::definition::ModuleDefinition;
use crate::diff::InverseDiff;
use crate::stack::LoadedEntry;

fn module(name: &str, prerequisites: &[&str], conflicts: &[&str]) -> Module {
    ModuleDefinition {
        prerequisites: prerequisites.iter().map(|s| s.to_string()).collect(),
        conflicts: conflicts.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
    .into_module(Some(name))
    .expect("valid module")
}

fn stack_of(modules: &[Module]) -> ModuleStack {
    let mut stack = ModuleStack::new();
    for module in modules {
        stack.push(LoadedEntry::new(module, InverseDiff::default()));
    }
    stack
}

#[rstest]
fn test_missing_prerequisite() {
    let openmpi = module("openmpi/4.0", &["gcc/9.3"], &[]);
    let err = validate_load(&openmpi, &ModuleStack::new()).unwrap_err();
    match &err {
        Error::MissingPrerequisite { module, missing } => {
            assert_eq!(module, "openmpi/4.0");
            assert_eq!(missing, &vec!["gcc/9.3".to_string()]);
        }
        other => panic!("expected MissingPrerequisite, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 3);

    let stack = stack_of(&[module("gcc/9.3", &[], &[])]);
    validate_load(&openmpi, &stack).unwrap();
}

#[rstest]
fn test_family_prerequisite() {
    let tool = module("tool/1.0", &["gcc"], &[]);
    let stack = stack_of(&[module("gcc/10.2", &[], &[])]);
    assert!(missing_prerequisites(&tool, &stack).is_empty());
}

#[rstest]
#[case::declared_by_new(module("gcc/10.2", &[], &["gcc"]), module("gcc/9.3", &[], &[]))]
#[case::declared_by_loaded(module("clang/17", &[], &[]), module("gcc/9.3", &[], &["clang"]))]
fn test_conflict_either_direction(#[case] candidate: Module, #[case] loaded: Module) {
    let stack = stack_of(&[loaded.clone()]);
    let err = validate_load(&candidate, &stack).unwrap_err();
    match &err {
        Error::Conflict { conflicts, .. } => assert_eq!(conflicts, &vec![loaded.name.clone()]),
        other => panic!("expected Conflict, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 2);
}

#[rstest]
fn test_conflict_reported_before_missing_prerequisite() {
    let candidate = module("mpich/3.4", &["gcc/9.3"], &["openmpi"]);
    let stack = stack_of(&[module("openmpi/4.0", &[], &[])]);
    assert!(matches!(
        validate_load(&candidate, &stack),
        Err(Error::Conflict { .. })
    ));
}

#[rstest]
fn test_unload_blocked_by_dependent() {
    let gcc = module("gcc/9.3", &[], &[]);
    let openmpi = module("openmpi/4.0", &["gcc/9.3"], &[]);
    let stack = stack_of(&[gcc, openmpi]);

    let err = validate_unload("gcc/9.3", &stack, false).unwrap_err();
    assert_eq!(err.exit_code(), 4);
    validate_unload("gcc/9.3", &stack, true).unwrap();
    validate_unload("openmpi/4.0", &stack, false).unwrap();
}

#[rstest]
fn test_dependent_satisfied_elsewhere() {
    let stack = stack_of(&[
        module("gcc/9.3", &[], &[]),
        module("gcc-runtime/9.3", &[], &[]),
        module("gcc/10.2", &[], &[]),
        module("tool/1.0", &["gcc"], &[]),
    ]);
    // another gcc still satisfies the family prerequisite
    assert!(dependents("gcc/9.3", &stack).is_empty());
    assert!(dependents("gcc-runtime/9.3", &stack).is_empty());
}

#[rstest]
fn test_later_module_does_not_satisfy_dependent() {
    let stack = stack_of(&[
        module("gcc/9.3", &[], &[]),
        module("tool/1.0", &["gcc"], &[]),
        module("gcc/10.2", &[], &[]),
    ]);
    assert_eq!(dependents("gcc/9.3", &stack), vec!["tool/1.0"]);
    assert_eq!(
        validate_unload("gcc/9.3", &stack, false).unwrap_err().exit_code(),
        4
    );
    // gcc/9.3 was loaded before tool/1.0 and keeps it satisfied
    assert_eq!(dependents("gcc/10.2", &stack), Vec::<String>::new());
}

#[rstest]
fn test_unsatisfied_after_forced_removal() {
    let mut stack = stack_of(&[
        module("gcc/9.3", &[], &[]),
        module("openmpi/4.0", &["gcc/9.3"], &[]),
    ]);
    assert!(unsatisfied(&stack).is_empty());
    stack.remove("gcc/9.3");
    assert_eq!(unsatisfied(&stack), vec!["openmpi/4.0"]);
}

#[rstest]
fn test_plan_load_orders_prerequisites_first() {
    let registry = ModuleRegistry::from_modules([
        module("gcc/9.3", &[], &[]),
        module("gcc/10.2", &[], &[]),
        module("openmpi/4.0", &["gcc/9.3"], &[]),
        module("hdf5/1.14", &["openmpi/4.0", "zlib"], &[]),
        module("zlib/1.3", &[], &[]),
    ]);
    let target = registry.find("hdf5/1.14").unwrap();

    let plan = plan_load(target, &registry, &ModuleStack::new()).unwrap();
    let names: Vec<&str> = plan.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["gcc/9.3", "openmpi/4.0", "zlib/1.3", "hdf5/1.14"]);
}

#[rstest]
fn test_plan_load_skips_loaded_and_prefers_newest() {
    let registry = ModuleRegistry::from_modules([
        module("gcc/9.3", &[], &[]),
        module("gcc/10.2", &[], &[]),
        module("tool/1.0", &["gcc"], &[]),
        module("zlib/1.3", &[], &[]),
        module("app/2.0", &["tool/1.0", "zlib/1.3"], &[]),
    ]);

    let plan = plan_load(
        registry.find("tool/1.0").unwrap(),
        &registry,
        &ModuleStack::new(),
    )
    .unwrap();
    let names: Vec<&str> = plan.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["gcc/10.2", "tool/1.0"]);

    let stack = stack_of(&[module("zlib/1.3", &[], &[])]);
    let plan = plan_load(registry.find("app/2.0").unwrap(), &registry, &stack).unwrap();
    let names: Vec<&str> = plan.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["gcc/10.2", "tool/1.0", "app/2.0"]);
}

#[rstest]
fn test_plan_load_detects_cycle() {
    let registry = ModuleRegistry::from_modules([
        module("a/1", &["b/1"], &[]),
        module("b/1", &["c/1"], &[]),
        module("c/1", &["a/1"], &[]),
    ]);
    let err = plan_load(registry.find("a/1").unwrap(), &registry, &ModuleStack::new()).unwrap_err();
    match &err {
        Error::DependencyCycle { cycle } => assert_eq!(cycle, &vec!["a/1", "b/1", "c/1", "a/1"]),
        other => panic!("expected DependencyCycle, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 3);
}

#[rstest]
fn test_plan_load_unknown_prerequisite() {
    let registry = ModuleRegistry::from_modules([module("openmpi/4.0", &["gcc/9.3"], &[])]);
    let err = plan_load(
        registry.find("openmpi/4.0").unwrap(),
        &registry,
        &ModuleStack::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingPrerequisite { .. }));
}

#[rstest]
#[case("9.3", "10.2", Ordering::Less)]
#[case("1.10", "1.9", Ordering::Greater)]
#[case("2.0", "2.0", Ordering::Equal)]
#[case("2.0", "2.0.1", Ordering::Less)]
#[case("1.0-rc1", "1.0-rc2", Ordering::Less)]
fn test_compare_versions(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
    assert_eq!(compare_versions(a, b), expected);
}
