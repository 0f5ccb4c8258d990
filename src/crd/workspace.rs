//! Workspace resource definition
//!
//! A Workspace describes one Terraform module instance: where its module
//! body comes from, which ProviderConfig it runs under, and the environment
//! its module input variables are resolved from.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use super::KeyReference;

/// Provider config name assumed when the reference is omitted
const DEFAULT_PROVIDER_CONFIG: &str = "default";

/// A Terraform workspace manifest
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Workspace specification
    pub spec: WorkspaceSpec,
}

impl Workspace {
    /// Name of the ProviderConfig this workspace runs under
    ///
    /// Falls back to `default` when the manifest omits the reference.
    pub fn provider_config_name(&self) -> &str {
        self.spec
            .provider_config_ref
            .as_ref()
            .map(|r| r.name.as_str())
            .unwrap_or(DEFAULT_PROVIDER_CONFIG)
    }
}

/// Specification for a Workspace
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSpec {
    /// Module parameters
    pub for_provider: WorkspaceParameters,

    /// Reference to the ProviderConfig by name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<ProviderConfigReference>,
}

/// Named reference to a ProviderConfig
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigReference {
    /// Name of the referenced ProviderConfig
    pub name: String,
}

/// Module parameters of a Workspace
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceParameters {
    /// Where the module body comes from
    pub source: ModuleSource,

    /// Inline module body text
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module: String,

    /// Sub-path inside the module directory to descend into for the
    /// provider-level files; sanitized before use
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entrypoint: String,

    /// Ordered environment declarations; names carrying the module input
    /// variable prefix feed the resolved variables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

/// Source mode for a workspace module body
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum ModuleSource {
    /// Module body is carried inline in the manifest
    Inline,
    /// Module body lives at a remote address; not supported for emission
    Remote,
}

impl std::fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline => write!(f, "Inline"),
            Self::Remote => write!(f, "Remote"),
        }
    }
}

/// One environment declaration on a Workspace
///
/// Exactly one of `value`, `config_map_key_ref`, or `secret_key_ref` is
/// expected to be set; a prefixed declaration with none of them set is an
/// unsupported mechanism.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Env var name; the `TF_VAR_` prefix marks a module input variable
    pub name: String,

    /// Literal value; passes through without entering the variables file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Value taken from a key of a named ConfigMap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_key_ref: Option<KeyReference>,

    /// Value taken from a key of a named Secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<KeyReference>,
}
