use std::sync::Arc;

use modgraph_core::attribute::AttributeContainer;
use modgraph_core::capability::{Capability, CapabilityId};
use modgraph_core::constraint::VersionConstraint;
use modgraph_core::dependency::{DependencyConstraint, DependencySpec};
use modgraph_core::module::{ExcludeRule, ModuleId, ModuleVersionId};
use modgraph_core::variant::{FileRef, ModuleData, Variant};
use modgraph_metadata::component::{Publication, PublishedDependency, SoftwareComponent, UsageVariant};
use modgraph_metadata::services::{FileHasher, ProjectTable, StaticBuildIdentity};
use modgraph_metadata::writer::ModuleMetadataWriter;
use modgraph_resolver::cancel::CancellationFlag;
use modgraph_resolver::graph::SelectionReason;
use modgraph_resolver::mapping::ResolvedVersionMapping;
use modgraph_resolver::provider::InMemoryProvider;
use modgraph_resolver::resolver::{Resolution, ResolveRequest, Resolver, ResolverOptions};
use modgraph_resolver::rules::{CapabilityRule, ResolutionRules, Substitution, UseVersion};
use modgraph_resolver::schema::{AttributeSchema, DisambiguationRule};
use modgraph_util::errors::ModgraphError;

fn coords(s: &str) -> ModuleVersionId {
    ModuleVersionId::parse(s).unwrap()
}

fn module(s: &str) -> ModuleId {
    ModuleId::parse(s).unwrap()
}

/// A module with a single attribute-less variant.
fn lib(s: &str, dependencies: Vec<DependencySpec>) -> ModuleData {
    let mut variant = Variant::local("api", AttributeContainer::new());
    for dependency in dependencies {
        variant = variant.with_dependency(dependency);
    }
    ModuleData::new(coords(s)).with_variant(variant)
}

fn dep(s: &str) -> DependencySpec {
    let id = coords(s);
    DependencySpec::new(id.module(), VersionConstraint::require(id.version))
}

fn subgraph_dep(s: &str) -> DependencySpec {
    let mut dependency = dep(s);
    dependency.constraint = dependency.constraint.subgraph();
    dependency
}

fn root() -> ResolveRequest {
    ResolveRequest::new(ModuleVersionId::new("test", "root", "1.0"))
}

fn provider(modules: Vec<ModuleData>) -> InMemoryProvider {
    modules
        .into_iter()
        .fold(InMemoryProvider::new(), InMemoryProvider::with_module)
}

async fn resolve_with(
    provider: &InMemoryProvider,
    rules: ResolutionRules,
    request: &ResolveRequest,
) -> miette::Result<Resolution> {
    Resolver::new(Arc::new(provider.clone()))
        .with_rules(rules)
        .resolve(request)
        .await
}

async fn resolve(provider: &InMemoryProvider, request: &ResolveRequest) -> Resolution {
    resolve_with(provider, ResolutionRules::new(), request)
        .await
        .unwrap()
}

fn version(resolution: &Resolution, key: &str) -> String {
    resolution
        .graph
        .get(&module(key))
        .unwrap_or_else(|| panic!("{key} missing from graph"))
        .id
        .version
        .clone()
}

fn edge_reasons(resolution: &Resolution, from: &str, to: &str) -> Vec<SelectionReason> {
    resolution
        .graph
        .edge(&module(from), &module(to))
        .unwrap_or_else(|| panic!("no edge {from} -> {to}"))
        .reasons
        .clone()
}

fn error(report: &miette::Report) -> &ModgraphError {
    report
        .downcast_ref::<ModgraphError>()
        .expect("error should be a ModgraphError")
}

/// bar declares subgraph constraints on baz and foo; foo asks for a newer baz.
fn ancestor_graph() -> InMemoryProvider {
    provider(vec![
        lib(
            "org:bar:1.0",
            vec![subgraph_dep("org:baz:1.0"), subgraph_dep("org:foo:1.0")],
        ),
        lib("org:foo:1.0", vec![dep("org:baz:2.0")]),
        lib("org:baz:1.0", vec![]),
        lib("org:baz:2.0", vec![]),
    ])
}

#[tokio::test]
async fn test_ancestor_subgraph_constraint_wins() {
    let provider = ancestor_graph();
    let request = root().with_dependency(dep("org:bar:1.0"));
    let resolution = resolve(&provider, &request).await;

    assert_eq!(version(&resolution, "org:baz"), "1.0");
    assert!(edge_reasons(&resolution, "org:foo", "org:baz").contains(&SelectionReason::ByAncestor));
    assert!(edge_reasons(&resolution, "org:bar", "org:baz").contains(&SelectionReason::ByRequest));
    assert_eq!(resolution.conflicts.len(), 1);
    assert_eq!(resolution.conflicts.conflicts[0].requested, "2.0");
    assert_eq!(resolution.conflicts.conflicts[0].resolved, "1.0");
}

#[tokio::test]
async fn test_each_module_version_fetched_once() {
    let provider = ancestor_graph();
    let request = root().with_dependency(dep("org:bar:1.0"));
    resolve(&provider, &request).await;
    // bar, foo and baz:1.0; baz:2.0 is never selected.
    assert_eq!(provider.fetch_count(), 3);
}

#[tokio::test]
async fn test_root_subgraph_constraint() {
    let provider = provider(vec![
        lib("org:bar:1.0", vec![dep("org:foo:2.0")]),
        lib("org:foo:1.0", vec![]),
        lib("org:foo:2.0", vec![]),
    ]);
    let request = root()
        .with_dependency(dep("org:bar:1.0"))
        .with_constraint(DependencyConstraint::new(
            module("org:foo"),
            VersionConstraint::require("1.0").subgraph(),
        ));
    let resolution = resolve(&provider, &request).await;

    assert_eq!(version(&resolution, "org:foo"), "1.0");
    let constraint_edge = resolution
        .graph
        .edge(&module("test:root"), &module("org:foo"))
        .unwrap();
    assert!(constraint_edge.constraint);
    assert_eq!(constraint_edge.reasons, vec![SelectionReason::ByConstraint]);
    assert_eq!(
        edge_reasons(&resolution, "org:bar", "org:foo"),
        vec![SelectionReason::ByAncestor]
    );
}

fn two_similar_variants() -> InMemoryProvider {
    let a1 = AttributeContainer::new().with("a", "1");
    provider(vec![ModuleData::new(coords("org:foo:1.0"))
        .with_variant(Variant::local("one", a1.clone()))
        .with_variant(Variant::local("two", a1.with("b", "2")))])
}

#[tokio::test]
async fn test_extra_producer_attribute_is_ambiguous_without_rule() {
    let provider = two_similar_variants();
    let request = root()
        .with_attributes(AttributeContainer::new().with("a", "1"))
        .with_dependency(dep("org:foo:1.0"));
    let err = resolve_with(&provider, ResolutionRules::new(), &request)
        .await
        .unwrap_err();
    match error(&err) {
        ModgraphError::AmbiguousVariant { module, candidates, .. } => {
            assert_eq!(module, "org:foo:1.0");
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_disambiguation_rule_on_extra_attribute() {
    let provider = two_similar_variants();
    let request = root()
        .with_attributes(AttributeContainer::new().with("a", "1"))
        .with_dependency(dep("org:foo:1.0"));
    let schema =
        AttributeSchema::new().with_disambiguation("b", DisambiguationRule::PreferValue("2".into()));
    let resolution = Resolver::new(Arc::new(provider))
        .with_schema(schema)
        .resolve(&request)
        .await
        .unwrap();
    let foo = resolution.graph.get(&module("org:foo")).unwrap();
    assert_eq!(foo.variant.as_deref(), Some("two"));
}

#[tokio::test]
async fn test_resolution_is_deterministic() {
    let provider = provider(vec![
        lib("org:a:1.0", vec![dep("org:c:1.0"), dep("org:d:1.0")]),
        lib("org:b:1.0", vec![dep("org:c:2.0")]),
        lib("org:c:1.0", vec![]),
        lib("org:c:2.0", vec![dep("org:d:1.1")]),
        lib("org:d:1.0", vec![]),
        lib("org:d:1.1", vec![]),
    ]);
    let request = root()
        .with_dependency(dep("org:a:1.0"))
        .with_dependency(dep("org:b:1.0"));
    let first = resolve(&provider, &request).await;
    let second = resolve(&provider, &request).await;
    assert_eq!(first.graph.print_tree(None), second.graph.print_tree(None));
    assert_eq!(version(&first, "org:c"), "2.0");
    assert_eq!(version(&first, "org:d"), "1.1");
}

#[tokio::test]
async fn test_forced_edge_beats_higher_request() {
    let provider = provider(vec![
        lib("org:a:1.0", vec![]),
        lib("org:a:2.0", vec![]),
        lib("org:a:3.0", vec![]),
        lib("org:b:1.0", vec![dep("org:a:2.0")]),
    ]);
    let request = root()
        .with_dependency(dep("org:a:1.0").forced())
        .with_dependency(dep("org:b:1.0"));
    let resolution = resolve(&provider, &request).await;
    assert_eq!(version(&resolution, "org:a"), "1.0");
    assert_eq!(
        edge_reasons(&resolution, "org:b", "org:a"),
        vec![SelectionReason::Forced]
    );

    let rules = ResolutionRules::new().force(module("org:a"), "3.0");
    let resolution = resolve_with(&provider, rules, &request).await.unwrap();
    assert_eq!(version(&resolution, "org:a"), "3.0");
}

#[tokio::test]
async fn test_resolve_rule_beats_subgraph_constraint() {
    let provider = ancestor_graph();
    let request = root().with_dependency(dep("org:bar:1.0"));
    let rules = ResolutionRules::new().use_version(UseVersion {
        module: module("org:baz"),
        version: "2.0".into(),
        reason: Some("security fix".into()),
    });
    let resolution = resolve_with(&provider, rules, &request).await.unwrap();
    assert_eq!(version(&resolution, "org:baz"), "2.0");
    let baz = resolution.graph.get(&module("org:baz")).unwrap();
    assert_eq!(
        baz.reasons,
        vec![SelectionReason::SelectedByRule("security fix".into())]
    );
}

#[tokio::test]
async fn test_substitution_retargets_edges() {
    let provider = provider(vec![
        lib("org:old:1.0", vec![]),
        lib("org:new:2.0", vec![]),
        lib("org:app:1.0", vec![dep("org:old:1.0")]),
    ]);
    let request = root()
        .with_dependency(dep("org:old:1.0"))
        .with_dependency(dep("org:app:1.0"));
    let rules = ResolutionRules::new().substitute(Substitution {
        from: module("org:old"),
        to: module("org:new"),
        version: Some("2.0".into()),
        reason: None,
    });
    let resolution = resolve_with(&provider, rules, &request).await.unwrap();

    assert!(resolution.graph.get(&module("org:old")).is_none());
    assert_eq!(version(&resolution, "org:new"), "2.0");
    let rule = SelectionReason::SelectedByRule("substituted org:old with org:new:2.0".into());
    assert_eq!(
        edge_reasons(&resolution, "test:root", "org:new"),
        vec![rule.clone(), SelectionReason::ByRequest]
    );
    assert_eq!(
        edge_reasons(&resolution, "org:app", "org:new"),
        vec![rule, SelectionReason::ByRequest]
    );
}

#[tokio::test]
async fn test_substituted_edge_under_ancestor_constraint() {
    let provider = provider(vec![
        lib(
            "org:bar:1.0",
            vec![subgraph_dep("org:new:2.0"), dep("org:mid:1.0")],
        ),
        lib("org:mid:1.0", vec![dep("org:old:1.0")]),
        lib("org:old:1.0", vec![]),
        lib("org:new:2.0", vec![]),
    ]);
    let request = root().with_dependency(dep("org:bar:1.0"));
    let rules = ResolutionRules::new().substitute(Substitution {
        from: module("org:old"),
        to: module("org:new"),
        version: None,
        reason: None,
    });
    let resolution = resolve_with(&provider, rules, &request).await.unwrap();

    assert!(resolution.graph.get(&module("org:old")).is_none());
    assert_eq!(version(&resolution, "org:new"), "2.0");
    assert_eq!(
        edge_reasons(&resolution, "org:mid", "org:new"),
        vec![
            SelectionReason::SelectedByRule("substituted org:old with org:new".into()),
            SelectionReason::ByAncestor,
        ]
    );
    assert_eq!(
        edge_reasons(&resolution, "org:bar", "org:new"),
        vec![SelectionReason::ByRequest]
    );
}

fn listed_versions() -> InMemoryProvider {
    provider(vec![
        lib("org:a:1.0", vec![]),
        lib("org:a:1.5", vec![]),
        lib("org:a:2.0", vec![]),
    ])
}

#[tokio::test]
async fn test_dynamic_forced_version_uses_listing() {
    let provider = listed_versions();
    let request = root().with_dependency(dep("org:a:2.0"));
    let rules = ResolutionRules::new().force(module("org:a"), "1.+");
    let resolution = resolve_with(&provider, rules, &request).await.unwrap();

    assert_eq!(version(&resolution, "org:a"), "1.5");
    assert_eq!(
        edge_reasons(&resolution, "test:root", "org:a"),
        vec![SelectionReason::Forced]
    );
}

#[tokio::test]
async fn test_dynamic_pinned_version_uses_listing() {
    let provider = listed_versions();
    let request = root().with_dependency(dep("org:a:2.0"));
    let rules = ResolutionRules::new().use_version(UseVersion {
        module: module("org:a"),
        version: "[1.0,2.0)".into(),
        reason: Some("stay on 1.x".into()),
    });
    let resolution = resolve_with(&provider, rules, &request).await.unwrap();

    assert_eq!(version(&resolution, "org:a"), "1.5");
    assert_eq!(
        edge_reasons(&resolution, "test:root", "org:a"),
        vec![SelectionReason::SelectedByRule("stay on 1.x".into())]
    );
}

fn fixtures_module(fixtures_provides_main: bool) -> ModuleData {
    let mut fixtures = Variant::local("fixtures", AttributeContainer::new().with("kind", "fixtures"))
        .with_capability(Capability::new("org", "foo-fixtures", Some("1.0".into())));
    if fixtures_provides_main {
        fixtures = fixtures.with_capability(Capability::new("org", "foo", Some("1.0".into())));
    }
    ModuleData::new(coords("org:foo:1.0"))
        .with_variant(Variant::local("main", AttributeContainer::new().with("kind", "main")))
        .with_variant(fixtures)
}

fn fixtures_dep() -> DependencySpec {
    dep("org:foo:1.0").with_capability(CapabilityId::new("org", "foo-fixtures"))
}

#[tokio::test]
async fn test_later_edge_capability_without_shared_variant_fails() {
    let provider = provider(vec![
        fixtures_module(false),
        lib("org:mid:1.0", vec![fixtures_dep()]),
    ]);
    let request = root()
        .with_dependency(dep("org:foo:1.0"))
        .with_dependency(dep("org:mid:1.0"));
    let err = resolve_with(&provider, ResolutionRules::new(), &request)
        .await
        .unwrap_err();
    match error(&err) {
        ModgraphError::NoMatchingVariant { module, requested, .. } => {
            assert_eq!(module, "org:foo:1.0");
            assert!(requested.contains("org:foo-fixtures"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_later_edge_capability_moves_selection() {
    let schema = AttributeSchema::new()
        .with_disambiguation("kind", DisambiguationRule::PreferValue("main".into()));
    // The capability is asked for either directly or through mid, after the
    // other edge has already selected a variant.
    let orders = [
        (dep("org:foo:1.0"), fixtures_dep()),
        (fixtures_dep(), dep("org:foo:1.0")),
    ];
    for (direct, through_mid) in orders {
        let provider = provider(vec![
            fixtures_module(true),
            lib("org:mid:1.0", vec![through_mid]),
        ]);
        let request = root()
            .with_dependency(direct)
            .with_dependency(dep("org:mid:1.0"));
        let resolution = Resolver::new(Arc::new(provider.clone()))
            .with_schema(schema.clone())
            .resolve(&request)
            .await
            .unwrap();
        let foo = resolution.graph.get(&module("org:foo")).unwrap();
        assert_eq!(foo.variant.as_deref(), Some("fixtures"));
        assert!(foo
            .capabilities
            .iter()
            .any(|c| c.id() == CapabilityId::new("org", "foo-fixtures")));
    }
}

#[tokio::test]
async fn test_rejected_only_candidate_fails() {
    let provider = provider(vec![lib("org:a:1.0", vec![])]);
    let request = root()
        .with_dependency(dep("org:a:1.0"))
        .with_constraint(DependencyConstraint::new(
            module("org:a"),
            VersionConstraint::none().reject("1.0"),
        ));
    let err = resolve_with(&provider, ResolutionRules::new(), &request)
        .await
        .unwrap_err();
    match error(&err) {
        ModgraphError::NoVersionSatisfiesConstraints { module, rejected, .. } => {
            assert_eq!(module, "org:a");
            assert_eq!(rejected, &vec!["1.0".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_strict_version_caps_plain_request() {
    let provider = provider(vec![
        lib("org:a:1.0", vec![]),
        lib("org:a:2.0", vec![]),
        lib("org:b:1.0", vec![dep("org:a:2.0")]),
    ]);
    let mut strict = dep("org:a:1.0");
    strict.constraint = VersionConstraint::strictly("1.0");
    let request = root()
        .with_dependency(strict)
        .with_dependency(dep("org:b:1.0"));
    let resolution = resolve(&provider, &request).await;
    assert_eq!(version(&resolution, "org:a"), "1.0");
}

#[tokio::test]
async fn test_colliding_strict_versions_fail() {
    let mut strict_two = dep("org:a:2.0");
    strict_two.constraint = VersionConstraint::strictly("2.0");
    let provider = provider(vec![
        lib("org:a:1.0", vec![]),
        lib("org:a:2.0", vec![]),
        lib("org:b:1.0", vec![strict_two]),
    ]);
    let mut strict_one = dep("org:a:1.0");
    strict_one.constraint = VersionConstraint::strictly("1.0");
    let request = root()
        .with_dependency(strict_one)
        .with_dependency(dep("org:b:1.0"));
    let err = resolve_with(&provider, ResolutionRules::new(), &request)
        .await
        .unwrap_err();
    match error(&err) {
        ModgraphError::VersionConflict { module, strict, .. } => {
            assert_eq!(module, "org:a");
            assert_eq!(strict.len(), 2);
            assert!(strict.contains(&"org:b:1.0 requires strictly 2.0".to_string()));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

fn logging_providers() -> InMemoryProvider {
    let with_logging = |s: &str| {
        let id = coords(s);
        ModuleData::new(id.clone()).with_variant(
            Variant::local("api", AttributeContainer::new())
                .with_capability(Capability::implicit(&id.module(), &id.version))
                .with_capability(Capability::new("org", "logging", Some("1.0".into()))),
        )
    };
    provider(vec![with_logging("org:x:1.0"), with_logging("org:y:1.0")])
}

#[tokio::test]
async fn test_capability_conflict_without_rule() {
    let provider = logging_providers();
    let request = root()
        .with_dependency(dep("org:x:1.0"))
        .with_dependency(dep("org:y:1.0"));
    let err = resolve_with(&provider, ResolutionRules::new(), &request)
        .await
        .unwrap_err();
    match error(&err) {
        ModgraphError::CapabilityConflict {
            capability,
            providers,
        } => {
            assert_eq!(capability, "org:logging");
            assert_eq!(providers, &vec!["org:x:1.0".to_string(), "org:y:1.0".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_capability_rule_selects_provider() {
    let provider = logging_providers();
    let request = root()
        .with_dependency(dep("org:x:1.0"))
        .with_dependency(dep("org:y:1.0"));
    let rules = ResolutionRules::new().with_capability_rule(CapabilityRule {
        capability: CapabilityId::new("org", "logging"),
        prefer: module("org:y"),
        reason: None,
    });
    let resolution = resolve_with(&provider, rules, &request).await.unwrap();
    assert!(resolution.graph.get(&module("org:x")).is_none());
    let y = resolution.graph.get(&module("org:y")).unwrap();
    assert!(y.reasons.contains(&SelectionReason::SelectedByRule(
        "org:y selected for capability org:logging".into()
    )));
}

#[tokio::test]
async fn test_available_at_variant_is_followed() {
    let jvm = AttributeContainer::new().with("platform", "jvm");
    let provider = provider(vec![
        ModuleData::new(coords("org:foo:1.0")).with_variant(Variant::available_at(
            "jvmApi",
            jvm.clone(),
            coords("org:foo-jvm:1.0"),
        )),
        ModuleData::new(coords("org:foo-jvm:1.0")).with_variant(
            Variant::local("api", jvm.clone()).with_dependency(dep("org:bar:1.0")),
        ),
        lib("org:bar:1.0", vec![]),
    ]);
    let request = root()
        .with_attributes(jvm)
        .with_dependency(dep("org:foo:1.0"));
    let resolution = resolve(&provider, &request).await;

    let foo = resolution.graph.get(&module("org:foo")).unwrap();
    assert_eq!(foo.available_at, Some(coords("org:foo-jvm:1.0")));
    assert_eq!(version(&resolution, "org:foo-jvm"), "1.0");
    assert_eq!(version(&resolution, "org:bar"), "1.0");
    assert!(resolution
        .graph
        .edge(&module("org:foo"), &module("org:foo-jvm"))
        .is_some());
}

#[tokio::test]
async fn test_cancelled_resolution() {
    let provider = ancestor_graph();
    let flag = CancellationFlag::new();
    flag.cancel();
    let err = Resolver::new(Arc::new(provider))
        .with_cancellation(flag)
        .resolve(&root().with_dependency(dep("org:bar:1.0")))
        .await
        .unwrap_err();
    assert!(matches!(error(&err), ModgraphError::Cancelled));
}

#[tokio::test]
async fn test_missing_module_reports_requesters() {
    let provider = provider(vec![lib("org:a:1.0", vec![dep("org:gone:1.0")])]);
    let request = root().with_dependency(dep("org:a:1.0"));
    let err = resolve_with(&provider, ResolutionRules::new(), &request)
        .await
        .unwrap_err();
    match error(&err) {
        ModgraphError::ModuleNotFound {
            module,
            required_by,
        } => {
            assert_eq!(module, "org:gone:1.0");
            assert_eq!(required_by, &vec!["org:a:1.0".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_non_transitive_dependency_stops_traversal() {
    let provider = provider(vec![
        lib("org:a:1.0", vec![dep("org:b:1.0")]),
        lib("org:b:1.0", vec![]),
    ]);
    let request = root().with_dependency(dep("org:a:1.0").non_transitive());
    let resolution = resolve(&provider, &request).await;
    assert!(resolution.graph.get(&module("org:a")).is_some());
    assert!(resolution.graph.get(&module("org:b")).is_none());
}

#[tokio::test]
async fn test_exclude_applies_to_whole_subtree() {
    let provider = provider(vec![
        lib("org:a:1.0", vec![dep("org:c:1.0")]),
        lib("org:c:1.0", vec![dep("org:b:1.0")]),
        lib("org:b:1.0", vec![]),
    ]);
    let request =
        root().with_dependency(dep("org:a:1.0").exclude(ExcludeRule::parse("org:b").unwrap()));
    let resolution = resolve(&provider, &request).await;
    assert!(resolution.graph.get(&module("org:c")).is_some());
    assert!(resolution.graph.get(&module("org:b")).is_none());
}

#[tokio::test]
async fn test_exclude_needs_every_path() {
    let provider = provider(vec![
        lib("org:a:1.0", vec![dep("org:b:1.0")]),
        lib("org:c:1.0", vec![dep("org:b:1.0")]),
        lib("org:b:1.0", vec![]),
    ]);
    let request = root()
        .with_dependency(dep("org:a:1.0").exclude(ExcludeRule::parse("org:b").unwrap()))
        .with_dependency(dep("org:c:1.0"));
    let resolution = resolve(&provider, &request).await;
    assert!(resolution.graph.get(&module("org:b")).is_some());
    assert!(resolution
        .graph
        .edge(&module("org:a"), &module("org:b"))
        .is_none());
}

#[tokio::test]
async fn test_module_without_variants_uses_artifacts() {
    let jar = FileRef {
        name: "plain-1.0.jar".into(),
        url: "plain-1.0.jar".into(),
        size: 10,
        sha1: "aa".into(),
        md5: "bb".into(),
    };
    let provider = provider(vec![ModuleData::new(coords("org:plain:1.0")).with_artifact(jar.clone())]);
    let request = root().with_dependency(dep("org:plain:1.0"));
    let resolution = resolve(&provider, &request).await;
    let plain = resolution.graph.get(&module("org:plain")).unwrap();
    assert!(plain.variant.is_none());
    assert_eq!(plain.files, vec![jar]);
}

#[tokio::test]
async fn test_dynamic_versions_use_listing() {
    let provider = provider(vec![
        lib("org:a:1.0", vec![]),
        lib("org:a:1.2", vec![]),
        lib("org:a:2.0", vec![]),
    ]);
    let cases = [("1.+", "1.2"), ("[1.0,2.0)", "1.2"), ("latest", "2.0")];
    for (selector, expected) in cases {
        let request = root().with_dependency(DependencySpec::new(
            module("org:a"),
            VersionConstraint::require(selector),
        ));
        let resolution = resolve(&provider, &request).await;
        assert_eq!(version(&resolution, "org:a"), expected, "selector {selector}");
    }
}

#[tokio::test]
async fn test_pass_limit() {
    let provider = ancestor_graph();
    let request = root().with_dependency(dep("org:bar:1.0"));
    let err = Resolver::new(Arc::new(provider))
        .with_options(ResolverOptions {
            jobs: 2,
            max_passes: 1,
        })
        .resolve(&request)
        .await
        .unwrap_err();
    assert!(matches!(error(&err), ModgraphError::Resolution { .. }));
}

#[tokio::test]
async fn test_resolved_versions_are_published() {
    let provider = ancestor_graph();
    let resolution = resolve(&provider, &root().with_dependency(dep("org:bar:1.0"))).await;
    let mapping = ResolvedVersionMapping::from_graph(&resolution.graph);

    let mut variant = UsageVariant::new("api", AttributeContainer::new());
    variant.dependencies.push(PublishedDependency::external(
        module("org:baz"),
        VersionConstraint::require("2.0"),
    ));
    let publication = Publication::new(
        coords("test:root:1.0"),
        SoftwareComponent::new("root").with_variant(variant),
    )
    .with_version_mapping(Arc::new(mapping));
    let publications = [publication];

    let identity = StaticBuildIdentity::new("1.0", "build");
    let projects = ProjectTable::new();
    let writer = ModuleMetadataWriter::new(&identity, &projects, &FileHasher);
    let mut out = Vec::new();
    writer
        .generate_to(&publications[0], &publications, &mut out)
        .unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(
        doc["variants"][0]["dependencies"][0]["version"]["requires"],
        "1.0"
    );
}
