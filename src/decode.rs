//! Decoding raw documents into typed resources
//!
//! One raw document either decodes into a `(ResourceKey, Resource)` pair or
//! is rejected. A rejection is not an error for the run: tolerant multi-kind
//! ingestion drops documents that do not look like manifests at all, while
//! structurally valid manifests of unrecognized kinds are carried as
//! [`Resource::Other`] so the uniqueness invariant still covers them.

use serde_json::Value;

use crate::crd::{self, ProviderConfig, Resource, Workspace};
use crate::index::ResourceKey;

/// Why a document was dropped instead of decoded
#[derive(Debug, Clone)]
pub struct DecodeRejection(String);

impl std::fmt::Display for DecodeRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for DecodeRejection {}

/// Decode one raw document into a typed resource plus its reference key
///
/// ProviderConfigs are cluster-scoped: their key namespace is cleared even
/// when the manifest carries one.
pub fn decode(document: &str) -> Result<(ResourceKey, Resource), DecodeRejection> {
    let value: Value = serde_yaml::from_str(document)
        .map_err(|err| DecodeRejection(format!("invalid YAML: {err}")))?;

    if !value.is_object() {
        return Err(DecodeRejection("document is not a mapping".to_string()));
    }

    let api_version = value
        .get("apiVersion")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeRejection("missing apiVersion".to_string()))?;
    let group = match api_version.split_once('/') {
        Some((group, _version)) => group,
        None => "",
    }
    .to_string();

    let kind = value
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeRejection("missing kind".to_string()))?
        .to_string();

    let name = value
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeRejection("missing metadata.name".to_string()))?
        .to_string();
    let namespace = value
        .pointer("/metadata/namespace")
        .and_then(Value::as_str)
        .map(String::from);

    let (namespace, resource) = match (group.as_str(), kind.as_str()) {
        (crd::GROUP, "ProviderConfig") => {
            let config: ProviderConfig = typed(&kind, value)?;
            (None, Resource::ProviderConfig(config))
        }
        (crd::GROUP, "Workspace") => {
            let workspace: Workspace = typed(&kind, value)?;
            (namespace, Resource::Workspace(workspace))
        }
        ("", "Secret") => (namespace, Resource::Secret(typed(&kind, value)?)),
        ("", "ConfigMap") => (namespace, Resource::ConfigMap(typed(&kind, value)?)),
        _ => (namespace, Resource::Other(value)),
    };

    Ok((ResourceKey::new(group, kind, namespace, name), resource))
}

fn typed<T: serde::de::DeserializeOwned>(kind: &str, value: Value) -> Result<T, DecodeRejection> {
    serde_json::from_value(value)
        .map_err(|err| DecodeRejection(format!("invalid {kind} manifest: {err}")))
}
