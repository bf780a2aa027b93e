//! File-backed template store.

use std::path::{Path, PathBuf};

use scalemate_core::MetricSpec;
use thiserror::Error;
use tracing::debug;

/// Errors from resolving a single template name.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid template name: {0:?}")]
    InvalidName(String),

    #[error("failed to read template {name:?}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode template {name:?}: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Reads named metric templates from a directory.
///
/// One file per template name, YAML content, one `MetricSpec` each.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory templates are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve one template name into a metric specification.
    ///
    /// Names must be plain file names; anything empty or containing a
    /// path separator is rejected before touching the file system.
    pub fn resolve(&self, name: &str) -> Result<MetricSpec, TemplateError> {
        let name = name.trim();
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(TemplateError::InvalidName(name.to_string()));
        }

        let path = self.dir.join(name);
        let raw = std::fs::read_to_string(&path).map_err(|source| TemplateError::Read {
            name: name.to_string(),
            source,
        })?;

        let spec: MetricSpec =
            serde_yaml::from_str(&raw).map_err(|source| TemplateError::Decode {
                name: name.to_string(),
                source,
            })?;

        debug!(template = name, "resolved metric template");
        Ok(spec)
    }
}
