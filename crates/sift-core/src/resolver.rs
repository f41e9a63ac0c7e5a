use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::dynamic::ModelSpec;
use crate::error::AppError;

/// A loaded model file and the name it was resolved under.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub path: PathBuf,
    pub name: String,
    pub spec: ModelSpec,
}

/// Resolves model references (file paths or `name@version` strings) to
/// parsed [`ModelSpec`]s.
pub struct ModelResolver {
    models_dir: PathBuf,
}

impl ModelResolver {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Resolve a model reference.
    ///
    /// Accepts:
    /// - A direct file path (e.g. `models/answer.json`)
    /// - `name@version`, read from `<models_dir>/<name>/<version>.json`
    /// - `name@latest`, with the version looked up in `<models_dir>/registry.json`
    pub fn resolve(&self, reference: &str) -> Result<ResolvedModel, AppError> {
        let (path, name) = self.resolve_path(reference)?;
        let spec = ModelSpec::from_path(&path)?;
        tracing::debug!(model = %name, path = %path.display(), "Resolved model");
        Ok(ResolvedModel { path, name, spec })
    }

    fn resolve_path(&self, reference: &str) -> Result<(PathBuf, String), AppError> {
        let candidate = PathBuf::from(reference);
        if candidate.is_file() {
            let name = model_name_from_path(&candidate);
            return Ok((candidate, name));
        }

        let (name, version) = reference
            .split_once('@')
            .ok_or_else(|| AppError::SchemaError(format!("Model not found: {reference}")))?;
        if name.is_empty() || version.is_empty() {
            return Err(AppError::SchemaError(format!(
                "Model must be a file path or name@version, got: {reference}"
            )));
        }

        let version = if version == "latest" {
            self.load_registry()?.remove(name).ok_or_else(|| {
                AppError::SchemaError(format!("No latest version for model {name}"))
            })?
        } else {
            version.to_string()
        };

        let path = self.models_dir.join(name).join(format!("{version}.json"));
        if !path.is_file() {
            return Err(AppError::SchemaError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        Ok((path, format!("{name}@{version}")))
    }

    fn load_registry(&self) -> Result<HashMap<String, String>, AppError> {
        let path = self.models_dir.join("registry.json");
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            AppError::SchemaError(format!(
                "Failed to read model registry {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::SchemaError(format!("Invalid JSON in model registry: {e}")))
    }
}

/// File stem of a model path, e.g. `"models/answer.json"` → `"answer"`.
pub fn model_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("default")
        .to_string()
}
