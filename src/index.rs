//! Reference keys and the resource index
//!
//! The index is the single aggregation point of the ingestion pipeline. It is
//! owned by exactly one writer while it is being built and handed off by
//! value to the resolver afterwards, so it needs no interior locking. Keys
//! are ordered, which makes every downstream walk (and therefore the emitted
//! tree) deterministic across runs.

use std::collections::btree_map::{BTreeMap, Entry};

use crate::crd::Resource;
use crate::{Error, Result};

/// Composite identity of a resource within one run
///
/// Never mutated after creation; used only as a lookup key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey {
    /// API group; empty for the core group
    pub group: String,
    /// Resource kind
    pub kind: String,
    /// Namespace; `None` for cluster-scoped resources
    pub namespace: Option<String>,
    /// Resource name
    pub name: String,
}

impl ResourceKey {
    /// Create a key from its parts
    pub fn new(
        group: impl Into<String>,
        kind: impl Into<String>,
        namespace: Option<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
            namespace,
            name: name.into(),
        }
    }

    /// Key for a core-group resource (Secret, ConfigMap)
    pub fn core(kind: impl Into<String>, namespace: Option<String>, name: impl Into<String>) -> Self {
        Self::new("", kind, namespace, name)
    }

    /// Key for a cluster-scoped Terraform-group resource
    pub fn terraform(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(crate::crd::GROUP, kind, None, name)
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.group.is_empty() {
            write!(f, ".{}", self.group)?;
        }
        match &self.namespace {
            Some(ns) => write!(f, " {}/{}", ns, self.name),
            None => write!(f, " {}", self.name),
        }
    }
}

/// Mapping from reference key to decoded resource
///
/// Append-only for the lifetime of one run; there is no deletion operation.
#[derive(Debug, Default)]
pub struct ResourceIndex {
    entries: BTreeMap<ResourceKey, Resource>,
}

impl ResourceIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a decoded resource under its key
    ///
    /// Fails with [`Error::Collision`] if the key is already present; a
    /// duplicate is a fatal condition, never a silent overwrite.
    pub fn insert(&mut self, key: ResourceKey, resource: Resource) -> Result<()> {
        match self.entries.entry(key) {
            Entry::Occupied(occupied) => Err(Error::Collision {
                key: occupied.key().clone(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(resource);
                Ok(())
            }
        }
    }

    /// Look up a resource by key; side-effect-free
    pub fn lookup(&self, key: &ResourceKey) -> Option<&Resource> {
        self.entries.get(key)
    }

    /// Iterate over all entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKey, &Resource)> {
        self.entries.iter()
    }

    /// Number of indexed resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn other(tag: &str) -> Resource {
        Resource::Other(serde_json::json!({ "tag": tag }))
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut index = ResourceIndex::new();
        let key = ResourceKey::core("Secret", Some("default".into()), "s1");
        index.insert(key.clone(), other("a")).unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.lookup(&key).is_some());
        assert!(index
            .lookup(&ResourceKey::core("Secret", Some("default".into()), "s2"))
            .is_none());
    }

    /// Story: duplicate keys always collide, regardless of submission order
    #[test]
    fn story_duplicate_keys_collide_in_any_order() {
        let key = ResourceKey::terraform("ProviderConfig", "pc1");

        for (first, second) in [("a", "b"), ("b", "a")] {
            let mut index = ResourceIndex::new();
            index.insert(key.clone(), other(first)).unwrap();
            let err = index.insert(key.clone(), other(second)).unwrap_err();
            match err {
                Error::Collision { key: collided } => assert_eq!(collided, key),
                unexpected => panic!("expected Collision, got {unexpected}"),
            }
            // first write wins, the index is never silently overwritten
            assert_eq!(index.len(), 1);
            assert_eq!(index.lookup(&key), Some(&other(first)));
        }
    }

    #[test]
    fn test_distinct_keys_per_dimension() {
        let mut index = ResourceIndex::new();
        // same name, different kind/namespace/group are all distinct
        index
            .insert(ResourceKey::core("Secret", Some("a".into()), "x"), other("1"))
            .unwrap();
        index
            .insert(ResourceKey::core("Secret", Some("b".into()), "x"), other("2"))
            .unwrap();
        index
            .insert(ResourceKey::core("ConfigMap", Some("a".into()), "x"), other("3"))
            .unwrap();
        index
            .insert(ResourceKey::terraform("Workspace", "x"), other("4"))
            .unwrap();
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_iteration_is_key_ordered() {
        let mut index = ResourceIndex::new();
        index
            .insert(ResourceKey::terraform("Workspace", "zeta"), other("z"))
            .unwrap();
        index
            .insert(ResourceKey::terraform("Workspace", "alpha"), other("a"))
            .unwrap();

        let names: Vec<_> = index.iter().map(|(k, _)| k.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_key_display() {
        let key = ResourceKey::core("Secret", Some("infra".into()), "creds");
        assert_eq!(key.to_string(), "Secret infra/creds");

        let key = ResourceKey::terraform("ProviderConfig", "aws");
        assert_eq!(key.to_string(), "ProviderConfig.tf.upbound.io aws");
    }
}
