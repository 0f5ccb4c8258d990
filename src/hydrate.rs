//! Run configuration and orchestration
//!
//! One [`Hydrator`] performs one run: ingest the stream into the index,
//! resolve references, emit the tree. The phases are strictly ordered; the
//! index only becomes visible to resolution after ingestion has fully
//! drained, and nothing is written before resolution has fully succeeded.

use std::path::PathBuf;

use tokio::io::AsyncBufRead;

use crate::{emit, ingest, resolve, Result};

/// Configuration for one hydration run
///
/// Constructed once at startup and passed into [`Hydrator::new`]; no core
/// component reads ambient process state.
#[derive(Clone, Debug)]
pub struct Config {
    /// Output directory; must not exist yet
    pub out: PathBuf,
    /// Decode parallelism
    pub workers: usize,
    /// Cancel remaining work on the first error
    pub fail_fast: bool,
}

/// Orchestrates one manifest stream into one module tree
pub struct Hydrator {
    config: Config,
}

impl Hydrator {
    /// Create a hydrator with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the full pipeline over the given manifest stream
    ///
    /// Fails without touching the filesystem beyond the (empty) output root
    /// if ingestion or resolution report any fatal error.
    pub async fn run<R>(&self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        emit::prepare_output_dir(&self.config.out)?;

        let index = ingest::run(input, self.config.workers, self.config.fail_fast).await?;
        let modules = resolve::resolve(&index)?;
        emit::write_tree(&self.config.out, &modules)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_resolution_leaves_no_root_file() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("tree");

        // workspace without its provider config
        let stream = br##"
apiVersion: tf.upbound.io/v1beta1
kind: Workspace
metadata:
  name: ws1
  namespace: default
spec:
  providerConfigRef:
    name: absent
  forProvider:
    source: Inline
    module: "# body"
"##;

        let hydrator = Hydrator::new(Config {
            out: out.clone(),
            workers: 2,
            fail_fast: false,
        });
        hydrator.run(&stream[..]).await.unwrap_err();

        assert!(!out.join(emit::ROOT_FILE).exists());
        assert!(!out.join("absent").exists());
    }

    #[tokio::test]
    async fn test_existing_output_dir_fails_before_reading() {
        let tmp = tempfile::tempdir().unwrap();
        let hydrator = Hydrator::new(Config {
            out: tmp.path().to_path_buf(),
            workers: 2,
            fail_fast: false,
        });
        let err = hydrator.run(&b"unread"[..]).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
