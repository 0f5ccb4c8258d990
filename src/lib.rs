//! tfhydrate - materialize Terraform module trees from Kubernetes manifests
//!
//! tfhydrate reads a multi-document YAML stream of Kubernetes-style manifests
//! (Crossplane Terraform `Workspace` and `ProviderConfig` resources together
//! with the core `Secret` and `ConfigMap` resources they reference), resolves
//! the cross-references between them, and writes the result as a tree of
//! Terraform files on disk.
//!
//! # Architecture
//!
//! The run is a straight pipeline with one hard ordering barrier:
//!
//! - documents are decoded in parallel by a bounded worker pool and funneled
//!   through a bounded channel into a single aggregator that owns the
//!   [`index::ResourceIndex`];
//! - once ingestion has fully drained, the index is handed off by value and
//!   walked sequentially to resolve Workspace -> ProviderConfig ->
//!   Secret/ConfigMap chains;
//! - the resolved modules are then emitted as one directory per provider plus
//!   an aggregate root `main.tf`.
//!
//! # Modules
//!
//! - [`crd`] - typed resource definitions (Workspace, ProviderConfig, core kinds)
//! - [`yaml`] - multi-document stream splitting
//! - [`decode`] - raw document to typed resource decoding
//! - [`index`] - reference keys and the uniqueness-checked resource index
//! - [`ingest`] - the concurrent ingestion pipeline
//! - [`resolve`] - cross-resource reference resolution
//! - [`emit`] - module tree emission
//! - [`hydrate`] - run configuration and orchestration
//! - [`error`] - error types

#![deny(missing_docs)]

pub mod crd;
pub mod decode;
pub mod emit;
pub mod error;
pub mod hydrate;
pub mod index;
pub mod ingest;
pub mod resolve;
pub mod yaml;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Default output directory when `--out` is not given
pub const DEFAULT_OUTPUT_DIR: &str = "./tfmodule";

/// Env var name prefix marking a declaration as a Terraform module input
/// variable; the prefix is stripped to obtain the variable name
pub const TF_VAR_PREFIX: &str = "TF_VAR_";
