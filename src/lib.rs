pub mod analysis;
pub mod changes;
pub mod codegen;
pub mod config;
pub mod context;
pub mod error;
pub mod files;
pub mod format;
pub mod introspect;
pub mod ir;
pub mod pipeline;

pub use config::GeneratorConfig;
pub use context::{GenerationContext, GenerationOptions, TableTarget};
pub use error::{PipelineError, TableError};
pub use introspect::{load_introspection, FileIntrospector, Introspector};
pub use pipeline::{GeneratedModel, GenerationResult, Pipeline, Statistics};

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Load the generator config. An explicit path must exist; otherwise
/// `zerogen.toml` in the current directory is used when present.
pub fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    match path {
        Some(path) => GeneratorConfig::load(path),
        None => GeneratorConfig::load_or_default(Path::new(".")),
    }
}

/// Build a pipeline reading its input from an introspection snapshot file.
pub fn pipeline_for_snapshot(
    input: &Path,
    config: GeneratorConfig,
    options: GenerationOptions,
) -> Result<Pipeline> {
    let introspector = FileIntrospector::new(input);
    Ok(Pipeline::from_config(config, Box::new(introspector))
        .with_context(|| format!("failed to set up generation for {}", input.display()))?
        .with_options(options))
}

/// Run a dry generation for `raw` and return the schema document body.
/// Any table error fails the call, since the body would be missing tables.
pub fn generate_schema(raw: ir::IntrospectionResult, config: &GeneratorConfig) -> Result<String> {
    let result = Pipeline::from_config(config.clone(), Box::new(raw))?
        .with_options(GenerationOptions {
            dry_run: true,
            ..Default::default()
        })
        .execute(None);
    if !result.success {
        bail!("schema generation failed: {}", result.errors.join("; "));
    }
    result
        .documents
        .into_iter()
        .find(|d| d.kind == codegen::DocumentKind::Schema)
        .map(|d| d.body)
        .context("schema document was not assembled")
}
