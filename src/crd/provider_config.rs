//! ProviderConfig resource definition
//!
//! A ProviderConfig carries provider-level configuration shared by one or
//! more Workspaces: credential sources, optional inline provider
//! configuration text, and optional backend configuration text.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use super::KeyReference;

/// A Terraform provider configuration manifest
///
/// ProviderConfigs are cluster-scoped: any namespace in the manifest is
/// cleared during decoding.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Provider configuration specification
    pub spec: ProviderConfigSpec,
}

/// Specification for a ProviderConfig
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// Credential sources; secret-backed entries contribute their whole
    /// payload to the resolved variables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<ProviderCredentials>,

    /// Inline provider configuration text, emitted as `config.tf`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,

    /// Backend configuration text, emitted as `backend.tf`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_file: Option<String>,

    /// Whether the provider plugin cache is enabled; treated as true when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_cache: Option<bool>,
}

impl ProviderConfigSpec {
    /// Effective plugin-cache setting (defaults to enabled)
    pub fn plugin_cache(&self) -> bool {
        self.plugin_cache.unwrap_or(true)
    }
}

/// One credential source on a ProviderConfig
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    /// File name the provider would materialize the credential under
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,

    /// Where the credential comes from; only `Secret` yields variables
    pub source: CredentialsSource,

    /// Secret selector for secret-backed credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<KeyReference>,
}

/// Recognized credential source kinds
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum CredentialsSource {
    /// No credentials
    None,
    /// Credentials held in a named Secret
    Secret,
    /// Credentials injected by the runtime identity
    InjectedIdentity,
    /// Credentials taken from the process environment
    Environment,
    /// Credentials read from the filesystem
    Filesystem,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_from_manifest() {
        let yaml = r#"
apiVersion: tf.upbound.io/v1beta1
kind: ProviderConfig
metadata:
  name: aws-prod
spec:
  credentials:
    - filename: aws.json
      source: Secret
      secretRef:
        namespace: infra
        name: aws-creds
        key: credentials
  configuration: |
    provider "aws" {
      region = "eu-central-1"
    }
  backendFile: |
    terraform {
      backend "kubernetes" {}
    }
"#;
        let pc: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(pc.metadata.name.as_deref(), Some("aws-prod"));
        assert_eq!(pc.spec.credentials.len(), 1);
        assert_eq!(pc.spec.credentials[0].source, CredentialsSource::Secret);
        assert_eq!(
            pc.spec.credentials[0].secret_ref.as_ref().unwrap().name,
            "aws-creds"
        );
        assert!(pc.spec.configuration.as_deref().unwrap().contains("aws"));
        assert!(pc.spec.backend_file.as_deref().unwrap().contains("backend"));
    }

    #[test]
    fn test_plugin_cache_defaults_to_enabled() {
        let yaml = "spec: {}";
        let pc: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(pc.spec.plugin_cache());

        let yaml = "spec:\n  pluginCache: false";
        let pc: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(!pc.spec.plugin_cache());
    }

    #[test]
    fn test_non_secret_credential_sources_parse() {
        let yaml = r#"
spec:
  credentials:
    - source: InjectedIdentity
    - source: None
"#;
        let pc: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            pc.spec.credentials[0].source,
            CredentialsSource::InjectedIdentity
        );
        assert_eq!(pc.spec.credentials[1].source, CredentialsSource::None);
        assert!(pc.spec.credentials[1].secret_ref.is_none());
    }
}
