//! Binary unit loader: search-path resolution of logical unit names.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::unit::{UnitCatalog, UnitHandle};

/// Structured errors for unit resolution.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unit '{name}' not found in any search path")]
    UnitNotFound { name: String },
    #[error("artifact '{artifact}' exists at {path} but no unit manifest claims it")]
    UnknownArtifact { artifact: String, path: PathBuf },
}

/// Resolves logical unit names against a prioritized list of search roots.
/// The first existing candidate wins; the artifact is then matched to a
/// catalogued manifest by its declared artifact name.
pub struct UnitLoader<'a> {
    catalog: &'a UnitCatalog,
    search_paths: &'a [PathBuf],
}

impl<'a> UnitLoader<'a> {
    pub fn new(catalog: &'a UnitCatalog, search_paths: &'a [PathBuf]) -> Self {
        Self {
            catalog,
            search_paths,
        }
    }

    pub fn resolve(&self, logical_name: &str) -> Result<UnitHandle, LoadError> {
        for root in self.search_paths {
            let candidate = root.join(logical_name);
            if !candidate.is_file() {
                continue;
            }
            tracing::debug!(
                unit = logical_name,
                path = %candidate.display(),
                "resolved unit artifact"
            );
            return self.claim(logical_name, candidate);
        }
        Err(LoadError::UnitNotFound {
            name: logical_name.to_string(),
        })
    }

    fn claim(&self, logical_name: &str, path: PathBuf) -> Result<UnitHandle, LoadError> {
        let artifact = Path::new(logical_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(logical_name);
        self.catalog
            .by_artifact(artifact)
            .ok_or(LoadError::UnknownArtifact {
                artifact: artifact.to_string(),
                path,
            })
    }
}
