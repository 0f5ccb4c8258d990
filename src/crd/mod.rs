//! Typed resource definitions for the recognized manifest kinds
//!
//! The Terraform-side kinds (`Workspace`, `ProviderConfig`) are declared here
//! in full; the core kinds (`Secret`, `ConfigMap`) come from `k8s-openapi`.
//! Everything else in the stream is carried as [`Resource::Other`].

mod provider_config;
mod workspace;

pub use provider_config::{CredentialsSource, ProviderConfig, ProviderConfigSpec, ProviderCredentials};
pub use workspace::{
    EnvVar, ModuleSource, ProviderConfigReference, Workspace, WorkspaceParameters, WorkspaceSpec,
};

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use serde::{Deserialize, Serialize};

/// API group of the Terraform provider kinds
pub const GROUP: &str = "tf.upbound.io";

/// A decoded resource, tagged by kind
///
/// The index stores this variant; resolution switches on the tag. Resources
/// are immutable once decoded.
#[derive(Clone, Debug, PartialEq)]
pub enum Resource {
    /// A Terraform provider configuration
    ProviderConfig(ProviderConfig),
    /// A Terraform workspace (one module instance)
    Workspace(Workspace),
    /// A core Secret, referenced by credentials and env declarations
    Secret(Secret),
    /// A core ConfigMap, referenced by env declarations
    ConfigMap(ConfigMap),
    /// Any other structurally valid manifest; indexed but ignored
    Other(serde_json::Value),
}

impl Resource {
    /// Human-readable kind tag, used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::ProviderConfig(_) => "ProviderConfig",
            Resource::Workspace(_) => "Workspace",
            Resource::Secret(_) => "Secret",
            Resource::ConfigMap(_) => "ConfigMap",
            Resource::Other(_) => "Other",
        }
    }
}

/// Reference to a key inside a named Secret or ConfigMap
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyReference {
    /// Namespace of the referenced resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Name of the referenced resource
    pub name: String,

    /// Key to select within the referenced resource's payload
    pub key: String,
}
