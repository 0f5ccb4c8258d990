//! Cross-resource reference resolution
//!
//! Walks the completed index and resolves every Workspace's chain:
//! Workspace -> ProviderConfig -> credential Secrets, plus the Workspace's
//! own Secret/ConfigMap-backed env declarations. Resolution is pure with
//! respect to the filesystem; nothing is written until every reference in
//! every chain has resolved, so a failing workspace never leaves partial
//! output behind.
//!
//! Aggregation is provider-level: one [`ResolvedModule`] per ProviderConfig
//! actually referenced, carrying the variables merged from its credentials
//! and from the env declarations of all workspaces running under it.

use std::collections::btree_map::{BTreeMap, Entry};

use k8s_openapi::api::core::v1::Secret;

use crate::crd::{CredentialsSource, EnvVar, ModuleSource, Resource};
use crate::index::{ResourceIndex, ResourceKey};
use crate::{Error, Result, TF_VAR_PREFIX};

/// One provider-level module, ready for emission
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedModule {
    /// Provider config name; also the output subdirectory and module name
    pub provider: String,
    /// Module input variables, merged from credentials and env declarations
    pub vars: BTreeMap<String, String>,
    /// Inline provider configuration text, if any
    pub configuration: Option<String>,
    /// Backend configuration text, if any
    pub backend_file: Option<String>,
    /// Effective plugin-cache setting
    pub plugin_cache: bool,
    /// Workspaces running under this provider, in name order
    pub workspaces: Vec<ResolvedWorkspace>,
}

/// One workspace's contribution to a resolved module
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedWorkspace {
    /// Workspace name; also the module body file name
    pub name: String,
    /// Inline module body text
    pub module: String,
    /// Raw entrypoint sub-path; sanitized by the emitter
    pub entrypoint: Option<String>,
}

/// Resolve every workspace in the index into provider-level modules
///
/// The result is ordered by provider name; workspaces within a module follow
/// index key order. Both orders are deterministic across runs.
pub fn resolve(index: &ResourceIndex) -> Result<Vec<ResolvedModule>> {
    let mut modules: BTreeMap<String, ResolvedModule> = BTreeMap::new();

    for (key, resource) in index.iter() {
        let Resource::Workspace(workspace) = resource else {
            continue;
        };

        let provider_name = workspace.provider_config_name().to_string();
        let module = match modules.entry(provider_name.clone()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => vacant.insert(resolve_provider(&provider_name, index)?),
        };

        match workspace.spec.for_provider.source {
            ModuleSource::Inline => {}
            ModuleSource::Remote => {
                return Err(Error::UnsupportedSource {
                    requested: ModuleSource::Remote,
                })
            }
        }

        resolve_env(&workspace.spec.for_provider.env, index, &mut module.vars)?;

        let entrypoint = &workspace.spec.for_provider.entrypoint;
        module.workspaces.push(ResolvedWorkspace {
            name: key.name.clone(),
            module: workspace.spec.for_provider.module.clone(),
            entrypoint: (!entrypoint.is_empty()).then(|| entrypoint.clone()),
        });
    }

    Ok(modules.into_values().collect())
}

/// Materialize a provider view: config texts plus credential variables
fn resolve_provider(name: &str, index: &ResourceIndex) -> Result<ResolvedModule> {
    let key = ResourceKey::terraform("ProviderConfig", name);
    let Some(Resource::ProviderConfig(config)) = index.lookup(&key) else {
        return Err(Error::unresolved(
            "ProviderConfig",
            name,
            "no provider config in stream",
        ));
    };

    let mut vars = BTreeMap::new();
    for credential in &config.spec.credentials {
        match credential.source {
            CredentialsSource::Secret => {
                let Some(secret_ref) = &credential.secret_ref else {
                    return Err(Error::unresolved(
                        "Secret",
                        name,
                        "secret-backed credential has no secretRef",
                    ));
                };
                let secret_key = ResourceKey::core(
                    "Secret",
                    secret_ref.namespace.clone(),
                    secret_ref.name.clone(),
                );
                let Some(Resource::Secret(secret)) = index.lookup(&secret_key) else {
                    return Err(Error::unresolved(
                        "Secret",
                        secret_key.to_string(),
                        "provider config credential secret not in stream",
                    ));
                };
                vars.append(&mut secret_entries(secret, &secret_key)?);
            }
            // other credential sources carry no variables
            _ => {}
        }
    }

    if !config.spec.plugin_cache() {
        tracing::debug!(provider = name, "plugin cache disabled");
    }

    Ok(ResolvedModule {
        provider: name.to_string(),
        vars,
        configuration: config.spec.configuration.clone(),
        backend_file: config.spec.backend_file.clone(),
        plugin_cache: config.spec.plugin_cache(),
        workspaces: Vec::new(),
    })
}

/// Resolve prefixed env declarations into variables, in declared order
fn resolve_env(
    env: &[EnvVar],
    index: &ResourceIndex,
    vars: &mut BTreeMap<String, String>,
) -> Result<()> {
    for declaration in env {
        let Some(var_name) = declaration.name.strip_prefix(TF_VAR_PREFIX) else {
            continue;
        };

        // a literal value passes through to the process environment and does
        // not enter the variables file
        if matches!(declaration.value.as_deref(), Some(value) if !value.is_empty()) {
            continue;
        }

        if let Some(reference) = &declaration.config_map_key_ref {
            let key = ResourceKey::core(
                "ConfigMap",
                reference.namespace.clone(),
                reference.name.clone(),
            );
            let Some(Resource::ConfigMap(map)) = index.lookup(&key) else {
                return Err(Error::unresolved(
                    "ConfigMap",
                    key.to_string(),
                    "referenced config map not in stream",
                ));
            };
            let value = map
                .data
                .as_ref()
                .and_then(|data| data.get(&reference.key))
                .ok_or_else(|| {
                    Error::unresolved(
                        "ConfigMap",
                        key.to_string(),
                        format!("key `{}` not present", reference.key),
                    )
                })?;
            vars.insert(var_name.to_string(), value.clone());
        } else if let Some(reference) = &declaration.secret_key_ref {
            let key = ResourceKey::core(
                "Secret",
                reference.namespace.clone(),
                reference.name.clone(),
            );
            let Some(Resource::Secret(secret)) = index.lookup(&key) else {
                return Err(Error::unresolved(
                    "Secret",
                    key.to_string(),
                    "referenced secret not in stream",
                ));
            };
            let entries = secret_entries(secret, &key)?;
            let value = entries.get(&reference.key).ok_or_else(|| {
                Error::unresolved(
                    "Secret",
                    key.to_string(),
                    format!("key `{}` not present", reference.key),
                )
            })?;
            vars.insert(var_name.to_string(), value.clone());
        } else {
            return Err(Error::UnsupportedEnvMechanism {
                name: declaration.name.clone(),
            });
        }
    }

    Ok(())
}

/// Flatten a secret's payload into string entries
///
/// Base64 `data` and plain `stringData` are both honored; `stringData` wins
/// on overlapping keys, matching Kubernetes merge semantics.
fn secret_entries(secret: &Secret, key: &ResourceKey) -> Result<BTreeMap<String, String>> {
    let mut entries = BTreeMap::new();

    if let Some(data) = &secret.data {
        for (name, bytes) in data {
            let value = String::from_utf8(bytes.0.clone()).map_err(|_| {
                Error::unresolved(
                    "Secret",
                    key.to_string(),
                    format!("value for key `{name}` is not valid UTF-8"),
                )
            })?;
            entries.insert(name.clone(), value);
        }
    }

    if let Some(string_data) = &secret.string_data {
        for (name, value) in string_data {
            entries.insert(name.clone(), value.clone());
        }
    }

    Ok(entries)
}
