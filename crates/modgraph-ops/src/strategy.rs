//! Turns the `[resolution]`, `[schema]` and `[consumer]` sections of a
//! manifest into resolver inputs.

use std::sync::Arc;

use modgraph_core::capability::CapabilityId;
use modgraph_core::manifest::{
    AttributeSchemaDecl, CompatibilityKind, DisambiguationKind, Manifest,
};
use modgraph_core::module::{ModuleId, ModuleVersionId};
use modgraph_resolver::resolver::ResolveRequest;
use modgraph_resolver::rules::{
    CapabilityRule, ResolutionRules, SubgraphMetadataRule, Substitution, UseVersion,
};
use modgraph_resolver::schema::{AttributeSchema, CompatibilityRule, DisambiguationRule};
use modgraph_util::errors::{ModgraphError, ModgraphResult};

fn invalid(message: String) -> miette::Report {
    ModgraphError::Manifest { message }.into()
}

fn module_id(coords: &str) -> ModgraphResult<ModuleId> {
    ModuleId::parse(coords).ok_or_else(|| invalid(format!("Invalid module coordinates '{coords}'")))
}

/// Build the resolution rules declared by the manifest.
pub fn resolution_rules(manifest: &Manifest) -> ModgraphResult<ResolutionRules> {
    let decl = &manifest.resolution;
    let mut rules = ResolutionRules::new();

    for coords in &decl.force {
        let id = ModuleVersionId::parse(coords)
            .ok_or_else(|| invalid(format!("Invalid forced coordinates '{coords}'")))?;
        rules = rules.force(id.module(), id.version);
    }

    for sub in &decl.substitute {
        let (to, version) = match ModuleVersionId::parse(&sub.to) {
            Some(id) => (id.module(), Some(id.version)),
            None => (module_id(&sub.to)?, None),
        };
        rules = rules.substitute(Substitution {
            from: module_id(&sub.from)?,
            to,
            version,
            reason: sub.reason.clone(),
        });
    }

    for pin in &decl.use_version {
        rules = rules.use_version(UseVersion {
            module: module_id(&pin.module)?,
            version: pin.version.clone(),
            reason: pin.reason.clone(),
        });
    }

    for cap in &decl.capability {
        let capability = CapabilityId::parse(&cap.capability)
            .ok_or_else(|| invalid(format!("Invalid capability '{}'", cap.capability)))?;
        rules = rules.with_capability_rule(CapabilityRule {
            capability,
            prefer: module_id(&cap.prefer)?,
            reason: cap.reason.clone(),
        });
    }

    for subgraph in &decl.subgraph {
        rules = rules.with_metadata_rule(Arc::new(SubgraphMetadataRule {
            module: module_id(&subgraph.module)?,
        }));
    }

    Ok(rules)
}

/// The standard schema with the manifest's `[schema.<attribute>]` entries
/// layered on top.
pub fn attribute_schema(manifest: &Manifest) -> ModgraphResult<AttributeSchema> {
    let mut schema = AttributeSchema::standard();
    for (attribute, decl) in &manifest.schema {
        if let Some(kind) = decl.compatibility {
            schema = schema.with_compatibility(attribute, compatibility(kind, decl));
        }
        if let Some(kind) = decl.disambiguation {
            schema = schema.with_disambiguation(attribute, disambiguation(attribute, kind, decl)?);
        }
    }
    Ok(schema)
}

fn compatibility(kind: CompatibilityKind, decl: &AttributeSchemaDecl) -> CompatibilityRule {
    match kind {
        CompatibilityKind::Equal => CompatibilityRule::Equality,
        CompatibilityKind::AtMost => CompatibilityRule::AtMost,
        CompatibilityKind::Ordered => CompatibilityRule::Ordered(decl.values.clone()),
    }
}

fn disambiguation(
    attribute: &str,
    kind: DisambiguationKind,
    decl: &AttributeSchemaDecl,
) -> ModgraphResult<DisambiguationRule> {
    Ok(match kind {
        DisambiguationKind::Highest => DisambiguationRule::PreferHighest,
        DisambiguationKind::Lowest => DisambiguationRule::PreferLowest,
        DisambiguationKind::Prefer => {
            let value = decl.value.clone().ok_or_else(|| {
                invalid(format!(
                    "Attribute '{attribute}' prefers a value but does not name one"
                ))
            })?;
            DisambiguationRule::PreferValue(value)
        }
        DisambiguationKind::Ordered => DisambiguationRule::OrderedPreference(decl.values.clone()),
    })
}

/// The resolution request rooted at the manifest's component.
pub fn resolve_request(manifest: &Manifest) -> ModgraphResult<ResolveRequest> {
    Ok(ResolveRequest {
        root: manifest.component.id(),
        attributes: manifest.consumer.attributes.clone(),
        dependencies: manifest.root_dependencies()?,
        constraints: manifest.root_constraints()?,
    })
}
