// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

#[rstest]
fn test_defaults() {
    let config = Config::default();
    assert!(config.modulepath.is_empty());
    assert!(!config.auto_load_prerequisites);
    assert!(config.collections_dir.is_none());
}

#[rstest]
fn test_from_yaml() {
    let config = Config::from_yaml(
        "modulepath:\n  - /opt/modules\nauto_load_prerequisites: true\ncollections_dir: /tmp/c\n",
    )
    .unwrap();
    assert_eq!(config.modulepath, vec!["/opt/modules"]);
    assert!(config.auto_load_prerequisites);
    assert_eq!(config.collections_dir, Some(PathBuf::from("/tmp/c")));
}

#[rstest]
fn test_from_yaml_rejects_unknown_keys() {
    assert!(matches!(
        Config::from_yaml("modulepaths: []\n"),
        Err(Error::Config(_))
    ));
}

#[rstest]
fn test_file_then_env() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.yaml");
    std::fs::write(
        &path,
        "modulepath: [/from/file]\nauto_load_prerequisites: true\n",
    )
    .unwrap();

    let env: EnvironmentState = [
        (CONFIG_ENV, path.to_str().unwrap()),
        (MODULEPATH_ENV, "/a::/b"),
        (AUTO_LOAD_ENV, "off"),
    ]
    .into_iter()
    .collect();
    let config = Config::load_with_env(&env).unwrap();
    assert_eq!(config.modulepath, vec!["/a", "/b"]);
    assert!(!config.auto_load_prerequisites);
}

#[rstest]
fn test_explicit_file_must_exist() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.yaml");
    let env: EnvironmentState = [(CONFIG_ENV, missing.to_str().unwrap())]
        .into_iter()
        .collect();
    assert!(matches!(
        Config::load_with_env(&env),
        Err(Error::ReadFailed { .. })
    ));
}

#[rstest]
fn test_empty_modulepath_keeps_file_value() {
    let mut config = Config {
        modulepath: vec!["/keep".to_string()],
        ..Default::default()
    };
    let env: EnvironmentState = [(MODULEPATH_ENV, "")].into_iter().collect();
    config.apply_env(&env);
    assert_eq!(config.modulepath, vec!["/keep"]);
}

#[rstest]
fn test_collections_dir_override() {
    let mut config = Config::default();
    let env: EnvironmentState = [(COLLECTIONS_ENV, "/srv/collections")].into_iter().collect();
    config.apply_env(&env);
    assert_eq!(
        config.collections_dir().unwrap(),
        PathBuf::from("/srv/collections")
    );
}

#[rstest]
fn test_modulepath_dirs_canonicalizes_existing() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("modules");
    std::fs::create_dir(&nested).unwrap();
    let config = Config {
        modulepath: vec![
            format!("{}/./modules", tmp.path().display()),
            "/no/such/dir".to_string(),
        ],
        ..Default::default()
    };
    let dirs = config.modulepath_dirs();
    assert_eq!(dirs[0], dunce::canonicalize(&nested).unwrap());
    assert_eq!(dirs[1], PathBuf::from("/no/such/dir"));
}

#[rstest]
#[case("1", true)]
#[case("TRUE", true)]
#[case("yes", true)]
#[case("on", true)]
#[case("0", false)]
#[case("off", false)]
#[case("", false)]
fn test_is_truthy(#[case] value: &str, #[case] expected: bool) {
    assert_eq!(is_truthy(value), expected);
}
