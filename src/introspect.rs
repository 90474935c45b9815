use crate::ir::IntrospectionResult;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Source of raw schema metadata. Implementations may be slow; the pipeline
/// calls `introspect` exactly once per run.
pub trait Introspector {
    fn introspect(&self) -> Result<IntrospectionResult>;
}

impl Introspector for IntrospectionResult {
    fn introspect(&self) -> Result<IntrospectionResult> {
        Ok(self.clone())
    }
}

impl<F> Introspector for F
where
    F: Fn() -> Result<IntrospectionResult>,
{
    fn introspect(&self) -> Result<IntrospectionResult> {
        self()
    }
}

/// Reads an introspection snapshot (JSON or TOML, by extension) from disk.
#[derive(Debug, Clone)]
pub struct FileIntrospector {
    path: PathBuf,
}

impl FileIntrospector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileIntrospector { path: path.into() }
    }
}

impl Introspector for FileIntrospector {
    fn introspect(&self) -> Result<IntrospectionResult> {
        load_introspection(&self.path)
    }
}

pub fn load_introspection(path: &Path) -> Result<IntrospectionResult> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read introspection snapshot {}", path.display()))?;
    let is_toml = path
        .extension()
        .map(|ext| ext == "toml")
        .unwrap_or(false);
    let result = if is_toml {
        toml::from_str(&text).with_context(|| format!("invalid TOML in {}", path.display()))?
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON in {}", path.display()))?
    };
    Ok(result)
}
