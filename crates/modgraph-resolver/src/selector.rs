//! Variant selection: matches consumer attributes and requested capabilities
//! against the variants a module publishes.

use std::collections::BTreeSet;

use modgraph_core::attribute::AttributeContainer;
use modgraph_core::capability::CapabilityId;
use modgraph_core::variant::{FileRef, ModuleData, Variant};
use modgraph_util::errors::ModgraphError;

use crate::schema::AttributeSchema;

/// What a dependency edge asks of the module it points at.
#[derive(Debug, Clone, Copy)]
pub struct VariantRequest<'a> {
    pub attributes: &'a AttributeContainer,
    pub target_variant: Option<&'a str>,
    pub requested_capabilities: &'a [CapabilityId],
}

/// Outcome of a successful selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    Variant(&'a Variant),
    /// The module exposes no variants; its raw artifacts are used as-is.
    Artifacts(&'a [FileRef]),
}

impl Selection<'_> {
    pub fn variant_name(&self) -> Option<&str> {
        match self {
            Selection::Variant(v) => Some(&v.name),
            Selection::Artifacts(_) => None,
        }
    }
}

/// Select the variant of `module` matching `request`.
pub fn select_variant<'a>(
    module: &'a ModuleData,
    request: &VariantRequest<'_>,
    schema: &AttributeSchema,
) -> Result<Selection<'a>, ModgraphError> {
    if let Some(name) = request.target_variant {
        return module
            .variant(name)
            .map(Selection::Variant)
            .ok_or_else(|| ModgraphError::NoMatchingVariant {
                module: module.id.to_string(),
                requested: format!("variant '{name}'"),
                eliminated: module.variants.iter().map(|v| format!("  - {v}")).collect(),
            });
    }
    if module.variants.is_empty() {
        return Ok(Selection::Artifacts(&module.artifacts));
    }

    let mut eliminated = Vec::new();
    let mut candidates = Vec::new();
    for variant in &module.variants {
        match rejection(module, variant, request, schema) {
            Some(reason) => eliminated.push(format!("  - {}: {reason}", variant.name)),
            None => candidates.push(variant),
        }
    }

    if candidates.is_empty() {
        return Err(ModgraphError::NoMatchingVariant {
            module: module.id.to_string(),
            requested: describe(request),
            eliminated,
        });
    }

    let candidates = disambiguate(candidates, request.attributes, schema);
    match candidates.as_slice() {
        [single] => Ok(Selection::Variant(*single)),
        _ => Err(ModgraphError::AmbiguousVariant {
            module: module.id.to_string(),
            requested: describe(request),
            candidates: candidates.iter().map(|v| format!("  - {v}")).collect(),
        }),
    }
}

/// Select one variant of `module` serving every request reaching it.
///
/// Each request is matched on its own first. When they settle on different
/// variants, the one every request also accepts wins; if there is none, no
/// single variant serves them all.
pub fn select_shared_variant<'a>(
    module: &'a ModuleData,
    requests: &[VariantRequest<'_>],
    schema: &AttributeSchema,
) -> Result<Selection<'a>, ModgraphError> {
    let mut chosen: Vec<Selection<'a>> = Vec::new();
    for request in requests {
        let selection = select_variant(module, request, schema)?;
        if !chosen.contains(&selection) {
            chosen.push(selection);
        }
    }
    match chosen.as_slice() {
        [] => Err(ModgraphError::NoMatchingVariant {
            module: module.id.to_string(),
            requested: "no variant request".to_string(),
            eliminated: Vec::new(),
        }),
        [single] => Ok(*single),
        _ => {
            let mut eliminated = Vec::new();
            let mut shared = Vec::new();
            for selection in &chosen {
                let Selection::Variant(variant) = selection else {
                    continue;
                };
                let refused = requests.iter().find_map(|request| match request.target_variant {
                    Some(name) if name == variant.name => None,
                    Some(name) => Some(format!("variant '{name}' was requested")),
                    None => rejection(module, variant, request, schema),
                });
                match refused {
                    Some(reason) => eliminated.push(format!("  - {}: {reason}", variant.name)),
                    None => shared.push(*variant),
                }
            }
            let requested: Vec<String> = requests.iter().map(describe).collect();
            match shared.as_slice() {
                [single] => Ok(Selection::Variant(*single)),
                [] => Err(ModgraphError::NoMatchingVariant {
                    module: module.id.to_string(),
                    requested: requested.join(" and "),
                    eliminated,
                }),
                _ => Err(ModgraphError::AmbiguousVariant {
                    module: module.id.to_string(),
                    requested: requested.join(" and "),
                    candidates: shared.iter().map(|v| format!("  - {v}")).collect(),
                }),
            }
        }
    }
}

fn describe(request: &VariantRequest<'_>) -> String {
    if let Some(name) = request.target_variant {
        return format!("variant '{name}'");
    }
    if request.requested_capabilities.is_empty() {
        return request.attributes.to_string();
    }
    let capabilities: Vec<String> = request
        .requested_capabilities
        .iter()
        .map(|c| c.to_string())
        .collect();
    format!(
        "{} with capabilities [{}]",
        request.attributes,
        capabilities.join(", ")
    )
}

/// Why `variant` cannot serve `request`, if it cannot.
fn rejection(
    module: &ModuleData,
    variant: &Variant,
    request: &VariantRequest<'_>,
    schema: &AttributeSchema,
) -> Option<String> {
    let mismatched: Vec<String> = request
        .attributes
        .iter()
        .filter_map(|(name, wanted)| {
            let provided = variant.attributes.get(name)?;
            (!schema.is_compatible(name, wanted, provided))
                .then(|| format!("{name}={provided} (required {wanted})"))
        })
        .collect();
    if !mismatched.is_empty() {
        return Some(format!("incompatible {}", mismatched.join(", ")));
    }

    let module_id = module.id.module();
    let provided: BTreeSet<CapabilityId> = variant
        .provided_capabilities(&module_id, &module.id.version)
        .iter()
        .map(|c| c.id())
        .collect();
    if request.requested_capabilities.is_empty() {
        let implicit = CapabilityId::new(&module_id.group, &module_id.name);
        if !provided.contains(&implicit) {
            return Some(format!("does not provide the implicit capability {implicit}"));
        }
    } else if let Some(missing) = request
        .requested_capabilities
        .iter()
        .find(|c| !provided.contains(*c))
    {
        return Some(format!("does not provide capability {missing}"));
    }
    None
}

/// Narrow compatible candidates one attribute at a time: requested
/// attributes first, then producer-only attributes, each in name order.
fn disambiguate<'a>(
    mut candidates: Vec<&'a Variant>,
    requested: &AttributeContainer,
    schema: &AttributeSchema,
) -> Vec<&'a Variant> {
    let extra: BTreeSet<String> = candidates
        .iter()
        .flat_map(|v| v.attributes.iter().map(|(name, _)| name.to_string()))
        .filter(|name| !requested.contains(name))
        .collect();

    for (name, wanted) in requested.iter() {
        if candidates.len() <= 1 {
            return candidates;
        }
        let preferred: Vec<usize> = match schema.disambiguation(name) {
            Some(rule) => {
                let values: Vec<_> = candidates.iter().map(|v| v.attributes.get(name)).collect();
                rule.preferred(&values)
            }
            None => candidates
                .iter()
                .enumerate()
                .filter(|(_, v)| v.attributes.get(name).is_some_and(|p| p.same_value(wanted)))
                .map(|(i, _)| i)
                .collect(),
        };
        candidates = narrow(candidates, &preferred);
    }

    for name in &extra {
        if candidates.len() <= 1 {
            break;
        }
        if let Some(rule) = schema.disambiguation(name) {
            let values: Vec<_> = candidates.iter().map(|v| v.attributes.get(name)).collect();
            let preferred = rule.preferred(&values);
            candidates = narrow(candidates, &preferred);
        }
    }
    candidates
}

fn narrow<'a>(candidates: Vec<&'a Variant>, preferred: &[usize]) -> Vec<&'a Variant> {
    if preferred.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .enumerate()
        .filter(|(i, _)| preferred.contains(i))
        .map(|(_, v)| v)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DisambiguationRule, JVM_VERSION, USAGE};
    use modgraph_core::attribute::AttributeValue;
    use modgraph_core::capability::Capability;
    use modgraph_core::module::ModuleVersionId;

    fn attrs(pairs: &[(&str, &str)]) -> AttributeContainer {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn module(variants: Vec<Variant>) -> ModuleData {
        let mut data = ModuleData::new(ModuleVersionId::new("org", "foo", "1.0"));
        data.variants = variants;
        data
    }

    fn request(attributes: &AttributeContainer) -> VariantRequest<'_> {
        VariantRequest {
            attributes,
            target_variant: None,
            requested_capabilities: &[],
        }
    }

    #[test]
    fn absent_producer_attribute_is_compatible() {
        let m = module(vec![Variant::local("api", attrs(&[("a", "1")]))]);
        let consumer = attrs(&[("a", "1"), ("c", "x")]);
        let selected = select_variant(&m, &request(&consumer), &AttributeSchema::new()).unwrap();
        assert_eq!(selected.variant_name(), Some("api"));
    }

    #[test]
    fn no_matching_variant_lists_eliminations() {
        let m = module(vec![
            Variant::local("api", attrs(&[("a", "1")])),
            Variant::local("runtime", attrs(&[("a", "2")])),
        ]);
        let consumer = attrs(&[("a", "3")]);
        let err = select_variant(&m, &request(&consumer), &AttributeSchema::new()).unwrap_err();
        match err {
            ModgraphError::NoMatchingVariant { eliminated, .. } => {
                assert_eq!(eliminated.len(), 2);
                assert!(eliminated[0].contains("a=1 (required 3)"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn producer_only_attribute_without_rule_is_ambiguous() {
        let m = module(vec![
            Variant::local("one", attrs(&[("a", "1")])),
            Variant::local("two", attrs(&[("a", "1"), ("b", "2")])),
        ]);
        let consumer = attrs(&[("a", "1")]);
        let err = select_variant(&m, &request(&consumer), &AttributeSchema::new()).unwrap_err();
        match err {
            ModgraphError::AmbiguousVariant { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn producer_only_attribute_with_rule_disambiguates() {
        let m = module(vec![
            Variant::local("one", attrs(&[("a", "1")])),
            Variant::local("two", attrs(&[("a", "1"), ("b", "2")])),
        ]);
        let consumer = attrs(&[("a", "1")]);
        let schema = AttributeSchema::new()
            .with_disambiguation("b", DisambiguationRule::PreferValue("2".into()));
        let selected = select_variant(&m, &request(&consumer), &schema).unwrap();
        assert_eq!(selected.variant_name(), Some("two"));
    }

    #[test]
    fn highest_compatible_jvm_version_wins() {
        let jvm = |v: i64| AttributeContainer::new().with(JVM_VERSION, v);
        let m = module(vec![
            Variant::local("jdk8", jvm(8)),
            Variant::local("jdk11", jvm(11)),
            Variant::local("jdk21", jvm(21)),
        ]);
        let consumer = jvm(17);
        let selected = select_variant(&m, &request(&consumer), &AttributeSchema::standard()).unwrap();
        assert_eq!(selected.variant_name(), Some("jdk11"));
    }

    #[test]
    fn api_preferred_over_runtime() {
        let usage = |v: &str| AttributeContainer::new().with(USAGE, AttributeValue::named(v));
        let m = module(vec![
            Variant::local("runtime", usage("java-runtime")),
            Variant::local("api", usage("java-api")),
        ]);
        let consumer = usage("java-api");
        let selected = select_variant(&m, &request(&consumer), &AttributeSchema::standard()).unwrap();
        assert_eq!(selected.variant_name(), Some("api"));
    }

    #[test]
    fn requested_capability_filters_variants() {
        let m = module(vec![
            Variant::local("main", AttributeContainer::new()),
            Variant::local("fixtures", AttributeContainer::new())
                .with_capability(Capability::new("org", "foo-fixtures", Some("1.0".into()))),
        ]);
        let consumer = AttributeContainer::new();
        let wanted = [CapabilityId::new("org", "foo-fixtures")];
        let req = VariantRequest {
            requested_capabilities: &wanted,
            ..request(&consumer)
        };
        let selected = select_variant(&m, &req, &AttributeSchema::new()).unwrap();
        assert_eq!(selected.variant_name(), Some("fixtures"));

        // Without a request, only the variant with the implicit capability fits.
        let selected = select_variant(&m, &request(&consumer), &AttributeSchema::new()).unwrap();
        assert_eq!(selected.variant_name(), Some("main"));
    }

    #[test]
    fn shared_variant_must_serve_every_request() {
        let m = module(vec![
            Variant::local("main", AttributeContainer::new()),
            Variant::local("fixtures", AttributeContainer::new())
                .with_capability(Capability::new("org", "foo-fixtures", Some("1.0".into()))),
        ]);
        let consumer = AttributeContainer::new();
        let wanted = [CapabilityId::new("org", "foo-fixtures")];
        let fixtures = VariantRequest {
            requested_capabilities: &wanted,
            ..request(&consumer)
        };
        let schema = AttributeSchema::new();

        let err = select_shared_variant(&m, &[request(&consumer), fixtures], &schema).unwrap_err();
        match err {
            ModgraphError::NoMatchingVariant { requested, eliminated, .. } => {
                assert!(requested.contains("org:foo-fixtures"));
                assert_eq!(eliminated.len(), 2);
            }
            other => panic!("unexpected error {other:?}"),
        }

        let selected = select_shared_variant(&m, &[fixtures, fixtures], &schema).unwrap();
        assert_eq!(selected.variant_name(), Some("fixtures"));
    }

    #[test]
    fn shared_variant_accepted_by_all_requests_wins() {
        let m = module(vec![
            Variant::local("api", attrs(&[("usage", "api")])),
            Variant::local("runtime", attrs(&[("usage", "runtime"), ("extra", "x")])),
        ]);
        let open = AttributeContainer::new();
        let runtime = attrs(&[("usage", "runtime")]);
        let schema = AttributeSchema::new()
            .with_disambiguation("usage", DisambiguationRule::PreferValue("api".into()));

        // Alone, the open request settles on api; runtime is acceptable to it too.
        let selected =
            select_shared_variant(&m, &[request(&open), request(&runtime)], &schema).unwrap();
        assert_eq!(selected.variant_name(), Some("runtime"));
    }

    #[test]
    fn explicit_target_variant() {
        let m = module(vec![
            Variant::local("api", attrs(&[("a", "1")])),
            Variant::local("sources", attrs(&[("a", "9")])),
        ]);
        let consumer = attrs(&[("a", "1")]);
        let req = VariantRequest {
            target_variant: Some("sources"),
            ..request(&consumer)
        };
        let selected = select_variant(&m, &req, &AttributeSchema::new()).unwrap();
        assert_eq!(selected.variant_name(), Some("sources"));

        let missing = VariantRequest {
            target_variant: Some("javadoc"),
            ..request(&consumer)
        };
        assert!(select_variant(&m, &missing, &AttributeSchema::new()).is_err());
    }

    #[test]
    fn no_variants_falls_back_to_artifacts() {
        let m = module(Vec::new());
        let consumer = attrs(&[("a", "1")]);
        let selected = select_variant(&m, &request(&consumer), &AttributeSchema::new()).unwrap();
        assert!(matches!(selected, Selection::Artifacts(files) if files.is_empty()));
    }
}
