//! Unit tests for dependency resolution.

use super::*;
use crate::model::Scope;
use crate::repository::{MemoryRepository, MockRepository};
use jarshade_common::Requirement;
use rstest::rstest;

fn dep(raw: &str) -> Dependency {
    Dependency::new(
        Requirement::parse(raw).expect("valid requirement"),
        Scope::Implementation,
    )
}

fn scoped(raw: &str, scope: Scope) -> Dependency {
    Dependency::new(Requirement::parse(raw).expect("valid requirement"), scope)
}

fn module(raw: &str) -> ModuleId {
    ModuleId::parse(raw).expect("valid module")
}

fn publish(repository: &mut MemoryRepository, coordinate: &str, dependencies: Vec<Dependency>) {
    repository.publish(
        Coordinate::parse(coordinate).expect("valid coordinate"),
        dependencies,
        Vec::new(),
    );
}

fn selected(resolution: &Resolution, raw: &str) -> Option<String> {
    resolution
        .version_of(&module(raw))
        .map(|version| version.as_str().to_owned())
}

#[test]
fn nearest_soft_preference_wins() {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:a:1.0", vec![dep("g:c:2.0")]);
    publish(&mut repository, "g:b:1.0", vec![dep("g:d:1.0")]);
    publish(&mut repository, "g:d:1.0", vec![dep("g:c:3.0")]);
    publish(&mut repository, "g:c:2.0", Vec::new());
    publish(&mut repository, "g:c:3.0", Vec::new());

    let resolution = Resolver::new(&repository)
        .resolve(&[dep("g:a:1.0"), dep("g:b:1.0")], Classpath::Runtime)
        .expect("resolves");
    assert_eq!(selected(&resolution, "g:c"), Some("2.0".to_owned()));
}

#[test]
fn equal_depth_ties_go_to_the_highest_version() {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:a:1.0", vec![dep("g:c:1.0")]);
    publish(&mut repository, "g:b:1.0", vec![dep("g:c:2.0")]);
    publish(&mut repository, "g:c:1.0", Vec::new());
    publish(&mut repository, "g:c:2.0", Vec::new());

    let resolution = Resolver::new(&repository)
        .resolve(&[dep("g:a:1.0"), dep("g:b:1.0")], Classpath::Runtime)
        .expect("resolves");
    assert_eq!(selected(&resolution, "g:c"), Some("2.0".to_owned()));
}

#[test]
fn hard_constraints_override_nearer_preferences() {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:a:1.0", vec![dep("g:c:[2.0,3.0)")]);
    for version in ["1.0", "2.0", "2.5", "3.0"] {
        publish(&mut repository, &format!("g:c:{version}"), Vec::new());
    }

    let resolution = Resolver::new(&repository)
        .resolve(&[dep("g:c:1.0"), dep("g:a:1.0")], Classpath::Runtime)
        .expect("resolves");
    assert_eq!(selected(&resolution, "g:c"), Some("2.5".to_owned()));
}

#[test]
fn wildcards_leave_soft_preferences_in_charge() {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:a:1.0", vec![dep("g:c:*")]);
    publish(&mut repository, "g:c:1.0", Vec::new());
    publish(&mut repository, "g:c:2.0", Vec::new());

    let resolution = Resolver::new(&repository)
        .resolve(&[dep("g:c:1.0"), dep("g:a:1.0")], Classpath::Runtime)
        .expect("resolves");
    assert_eq!(selected(&resolution, "g:c"), Some("1.0".to_owned()));
}

#[test]
fn constraints_found_in_later_rounds_are_honoured() {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:a:1.0", Vec::new());
    publish(&mut repository, "g:a:2.0", Vec::new());
    publish(&mut repository, "g:b:1.0", Vec::new());
    publish(&mut repository, "g:b:2.0", vec![dep("g:a:[2.0,)")]);

    let resolution = Resolver::new(&repository)
        .resolve(&[dep("g:a:1.0"), dep("g:b:[1.0,2.0]")], Classpath::Runtime)
        .expect("resolves");
    assert_eq!(selected(&resolution, "g:a"), Some("2.0".to_owned()));
    assert_eq!(selected(&resolution, "g:b"), Some("2.0".to_owned()));
}

#[test]
fn disjoint_ranges_are_unresolvable() {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:a:1.0", vec![dep("g:c:[2.0,3.0)")]);
    publish(&mut repository, "g:c:2.0", Vec::new());
    publish(&mut repository, "g:c:4.0", Vec::new());

    let result = Resolver::new(&repository)
        .resolve(&[dep("g:c:[4.0,)"), dep("g:a:1.0")], Classpath::Runtime);
    match result {
        Err(ResolveError::UnresolvableDependency { module: failed, reason }) => {
            assert_eq!(failed, module("g:c"));
            assert!(reason.contains("no available version"), "{reason}");
        }
        other => panic!("expected unresolvable dependency, got {other:?}"),
    }
}

#[rstest]
#[case::missing_module("g:absent:1.0", "not found in repository")]
#[case::missing_version("g:c:9.9", "version 9.9 not found")]
fn missing_artifacts_are_unresolvable(#[case] requirement: &str, #[case] expected: &str) {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:c:1.0", Vec::new());

    let result = Resolver::new(&repository).resolve(&[dep(requirement)], Classpath::Runtime);
    match result {
        Err(ResolveError::UnresolvableDependency { reason, .. }) => {
            assert!(reason.contains(expected), "{reason}");
        }
        other => panic!("expected unresolvable dependency, got {other:?}"),
    }
}

#[test]
fn exclusions_prune_the_declaring_subtree() {
    let mut repository = MemoryRepository::new();
    publish(
        &mut repository,
        "com.qcloud:cos_api:5.6",
        vec![dep("org.slf4j:slf4j-api:1.7"), dep("org.json:json:1.0")],
    );
    publish(&mut repository, "org.json:json:1.0", vec![dep("org.slf4j:jul-to-slf4j:1.7")]);
    publish(&mut repository, "org.slf4j:slf4j-api:1.7", Vec::new());
    publish(&mut repository, "org.slf4j:jul-to-slf4j:1.7", Vec::new());

    let root = dep("com.qcloud:cos_api:5.6")
        .with_exclusions(vec![CoordinatePattern::parse("org.slf4j:*").expect("valid")]);
    let resolution = Resolver::new(&repository)
        .resolve(&[root], Classpath::Runtime)
        .expect("resolves");

    let names: Vec<String> = resolution
        .nodes()
        .iter()
        .map(|node| node.coordinate.to_string())
        .collect();
    assert_eq!(names, vec!["com.qcloud:cos_api:5.6", "org.json:json:1.0"]);
}

#[test]
fn wildcard_exclusion_drops_every_transitive() {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:a:1.0", vec![dep("g:b:1.0")]);
    publish(&mut repository, "g:b:1.0", Vec::new());

    let root = dep("g:a:1.0").with_exclusions(vec![CoordinatePattern::parse("*").expect("valid")]);
    let resolution = Resolver::new(&repository)
        .resolve(&[root], Classpath::Runtime)
        .expect("resolves");
    assert_eq!(resolution.nodes().len(), 1);
}

#[rstest]
#[case(Classpath::Runtime, vec!["g:impl", "g:rt"])]
#[case(Classpath::Compile, vec!["g:impl", "g:api"])]
#[case(Classpath::TestRuntime, vec!["g:impl", "g:rt", "g:junit"])]
fn classpath_selects_declared_scopes(#[case] classpath: Classpath, #[case] expected: Vec<&str>) {
    let mut repository = MemoryRepository::new();
    for name in ["impl", "api", "rt", "junit"] {
        publish(&mut repository, &format!("g:{name}:1.0"), Vec::new());
    }
    let dependencies = [
        scoped("g:impl:1.0", Scope::Implementation),
        scoped("g:api:1.0", Scope::CompileOnly),
        scoped("g:rt:1.0", Scope::RuntimeOnly),
        scoped("g:junit:1.0", Scope::TestImplementation),
    ];
    let resolution = Resolver::new(&repository)
        .resolve(&dependencies, classpath)
        .expect("resolves");
    let modules: Vec<String> = resolution
        .nodes()
        .iter()
        .map(|node| node.coordinate.module().to_string())
        .collect();
    assert_eq!(modules, expected);
}

#[test]
fn descriptor_only_scopes_are_not_followed() {
    let mut repository = MemoryRepository::new();
    publish(
        &mut repository,
        "g:a:1.0",
        vec![
            scoped("g:annotations:1.0", Scope::CompileOnly),
            scoped("g:mockito:1.0", Scope::TestImplementation),
            scoped("g:runtime:1.0", Scope::RuntimeOnly),
        ],
    );
    publish(&mut repository, "g:runtime:1.0", Vec::new());

    let resolution = Resolver::new(&repository)
        .resolve(&[dep("g:a:1.0")], Classpath::Runtime)
        .expect("resolves");
    assert_eq!(resolution.nodes().len(), 2);
    assert_eq!(selected(&resolution, "g:runtime"), Some("1.0".to_owned()));
}

#[test]
fn kinds_and_depths_are_recorded() {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:api:1.0", vec![dep("g:shared:1.0")]);
    publish(&mut repository, "g:impl:1.0", vec![dep("g:mid:1.0")]);
    publish(&mut repository, "g:mid:1.0", vec![dep("g:shared:1.0")]);
    publish(&mut repository, "g:shared:1.0", Vec::new());

    let resolution = Resolver::new(&repository)
        .resolve(
            &[scoped("g:api:1.0", Scope::CompileOnly), dep("g:impl:1.0")],
            Classpath::Compile,
        )
        .expect("resolves");

    let shared = resolution
        .nodes()
        .iter()
        .find(|node| node.coordinate.module() == &module("g:shared"))
        .expect("shared resolved");
    assert_eq!(shared.depth, 2);
    assert_eq!(shared.kind, ArtifactKind::Runtime);
    assert_eq!(shared.requested_by, Some(module("g:api")));

    let depths: Vec<usize> = resolution.nodes().iter().map(|node| node.depth).collect();
    assert_eq!(depths, vec![1, 1, 2, 2]);
}

#[test]
fn oscillating_selection_does_not_converge() {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:a:1", Vec::new());
    publish(&mut repository, "g:a:2", vec![dep("g:b:[1]")]);
    publish(&mut repository, "g:b:1", vec![dep("g:a:[1]")]);
    publish(&mut repository, "g:b:2", Vec::new());

    let result = Resolver::new(&repository)
        .with_max_rounds(8)
        .resolve(&[dep("g:a:*"), dep("g:b:*")], Classpath::Runtime);
    assert!(matches!(result, Err(ResolveError::NotConverged { rounds: 8 })));
}

#[test]
fn cycles_back_to_the_root_are_ignored() {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:lib:1.0", vec![dep("g:app:1.0")]);

    let resolution = Resolver::new(&repository)
        .with_root(module("g:app"))
        .resolve(&[dep("g:lib:1.0")], Classpath::Runtime)
        .expect("resolves");
    assert_eq!(resolution.nodes().len(), 1);
}

#[test]
fn resolution_is_deterministic() {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:a:1.0", vec![dep("g:c:1.0"), dep("g:d:1.0")]);
    publish(&mut repository, "g:b:1.0", vec![dep("g:c:2.0")]);
    for coordinate in ["g:c:1.0", "g:c:2.0", "g:d:1.0"] {
        publish(&mut repository, coordinate, Vec::new());
    }
    let dependencies = [dep("g:a:1.0"), dep("g:b:1.0")];
    let resolver = Resolver::new(&repository);
    let first = resolver
        .resolve(&dependencies, Classpath::Runtime)
        .expect("resolves");
    let second = resolver
        .resolve(&dependencies, Classpath::Runtime)
        .expect("resolves");
    assert_eq!(first, second);
}

#[test]
fn repository_answers_are_cached_across_rounds() {
    let mut repository = MockRepository::new();
    repository
        .expect_versions()
        .times(1)
        .returning(|_| Ok(vec![Version::parse("1.0").expect("valid")]));
    repository
        .expect_descriptor()
        .times(1)
        .returning(|_| Ok(Descriptor::default()));

    let resolution = Resolver::new(&repository)
        .resolve(&[dep("g:a:1.0")], Classpath::Runtime)
        .expect("resolves");
    assert_eq!(resolution.nodes().len(), 1);
}

#[test]
fn repository_failures_propagate() {
    let mut repository = MockRepository::new();
    repository.expect_versions().returning(|_| {
        Err(RepositoryError::Io {
            path: "repo/g/a".into(),
            source: std::io::Error::other("disk on fire"),
        })
    });

    let result = Resolver::new(&repository).resolve(&[dep("g:a:1.0")], Classpath::Runtime);
    assert!(matches!(result, Err(ResolveError::Repository(_))));
}

#[test]
fn fetch_loads_payloads_in_resolution_order() {
    let mut repository = MemoryRepository::new();
    publish(&mut repository, "g:a:1.0", vec![dep("g:b:1.0")]);
    publish(&mut repository, "g:b:1.0", Vec::new());

    let resolution = Resolver::new(&repository)
        .resolve(&[dep("g:a:1.0")], Classpath::Runtime)
        .expect("resolves");
    let artifacts = resolution.fetch(&repository).expect("fetched");
    let depths: Vec<usize> = artifacts.iter().map(Artifact::depth).collect();
    assert_eq!(depths, vec![1, 2]);
}
