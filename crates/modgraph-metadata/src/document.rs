//! Serde model of a module metadata document.
//!
//! Field declaration order is the order keys are written in. Every optional
//! section is skipped when empty so that a variant without dependencies,
//! constraints, files or capabilities carries none of those keys.

use std::collections::BTreeMap;

use modgraph_core::attribute::{AttributeContainer, AttributeValue};
use modgraph_util::errors::ModgraphError;
use serde::{Deserialize, Serialize};

/// Version of the document schema written by this crate.
pub const FORMAT_VERSION: &str = "1.1";

/// Attribute values as they appear in a document, keyed and sorted by name.
pub type AttributesDoc = BTreeMap<String, AttributeValueDoc>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValueDoc {
    Boolean(bool),
    Integer(i64),
    String(String),
}

/// Convert attributes for writing. Values without a document representation
/// are an error, never dropped.
pub fn attributes_to_doc(attributes: &AttributeContainer) -> Result<AttributesDoc, ModgraphError> {
    attributes
        .iter()
        .map(|(name, value)| {
            let doc = match value {
                AttributeValue::Boolean(b) => AttributeValueDoc::Boolean(*b),
                AttributeValue::Integer(i) => AttributeValueDoc::Integer(*i),
                AttributeValue::String(s) | AttributeValue::Named(s) => {
                    AttributeValueDoc::String(s.clone())
                }
                AttributeValue::Opaque { type_name, repr } => {
                    return Err(ModgraphError::MalformedAttributeValue {
                        attribute: name.to_string(),
                        value: repr.clone(),
                        type_name: type_name.clone(),
                    })
                }
            };
            Ok((name.to_string(), doc))
        })
        .collect()
}

/// Convert attributes read from a document. Named values come back as strings.
pub fn attributes_from_doc(attributes: &AttributesDoc) -> AttributeContainer {
    attributes
        .iter()
        .map(|(name, value)| {
            let value = match value {
                AttributeValueDoc::Boolean(b) => AttributeValue::Boolean(*b),
                AttributeValueDoc::Integer(i) => AttributeValue::Integer(*i),
                AttributeValueDoc::String(s) => AttributeValue::String(s.clone()),
            };
            (name.clone(), value)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDocument {
    pub format_version: String,
    pub component: ComponentDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<CreatedByDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VariantDoc>,
}

/// Identity of the component. `url` is present only when the component is
/// owned by another document, in which case the coordinates are the owner's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub group: String,
    pub module: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: AttributesDoc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedByDoc {
    pub gradle: ToolDoc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDoc {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: AttributesDoc,
    #[serde(flatten)]
    pub source: VariantSourceDoc,
}

/// Either a link to the module hosting the variant, or the variant's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantSourceDoc {
    AvailableAt {
        #[serde(rename = "available-at")]
        available_at: AvailableAtDoc,
    },
    Local(LocalVariantDoc),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalVariantDoc {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_constraints: Vec<DependencyConstraintDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<CapabilityDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableAtDoc {
    pub url: String,
    pub group: String,
    pub module: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyDoc {
    pub group: String,
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<ExcludeDoc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: AttributesDoc,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requested_capabilities: Vec<CapabilityDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyConstraintDoc {
    pub group: String,
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionDoc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: AttributesDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Version constraint object. Only the defining fields are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strictly: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefers: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejects: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub for_subgraph: bool,
}

/// Exclude rule; `*` is the wildcard on either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeDoc {
    pub group: String,
    pub module: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDoc {
    pub name: String,
    pub url: String,
    pub size: u64,
    pub sha1: String,
    pub md5: String,
}

/// Capability object. `version` is always written, as `null` when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDoc {
    pub group: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}
