//! Error types for tfhydrate

use thiserror::Error;

use crate::crd::ModuleSource;
use crate::index::ResourceKey;

/// Main error type for hydration runs
///
/// Decode rejections (documents that do not match any known schema) are not
/// represented here: they are recovered locally in the pipeline by dropping
/// the document. Everything below is fatal for the run.
#[derive(Debug, Error)]
pub enum Error {
    /// Two documents in the stream decoded to the same reference key
    #[error("resource already indexed: {key}")]
    Collision {
        /// Key both documents mapped to
        key: ResourceKey,
    },

    /// A named resource referenced by another manifest is missing or incomplete
    #[error("unresolved {kind} reference `{name}`: {message}")]
    UnresolvedReference {
        /// Kind of the referenced resource (ProviderConfig, Secret, ConfigMap)
        kind: &'static str,
        /// Name (or key) of the missing reference
        name: String,
        /// What exactly could not be resolved
        message: String,
    },

    /// The workspace requests a module source that cannot be written to disk
    #[error("unsupported module source: {requested}")]
    UnsupportedSource {
        /// The rejected source mode
        requested: ModuleSource,
    },

    /// An env declaration carries none of the recognized value mechanisms
    #[error("unsupported env mechanism for `{name}`")]
    UnsupportedEnvMechanism {
        /// Name of the offending env declaration
        name: String,
    },

    /// A decode worker died from an unexpected fault instead of returning
    #[error("worker exited from a fault: {message}")]
    WorkerFault {
        /// Description of the fault, including the panic payload when known
        message: String,
    },

    /// Filesystem failure while reading the stream or writing the module tree
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Variables file serialization failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an unresolved-reference error for the given kind and name
    pub fn unresolved(
        kind: &'static str,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::UnresolvedReference {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a worker-fault error with the given message
    pub fn worker_fault(message: impl Into<String>) -> Self {
        Self::WorkerFault {
            message: message.into(),
        }
    }
}
