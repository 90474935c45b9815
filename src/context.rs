use crate::changes::ChangeReport;
use crate::codegen::{Document, RenderedTable};
use crate::error::{PipelineError, DIAGNOSTIC_LINES};
use crate::ir::{Relationship, Schema};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Which tables a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableTarget {
    All,
    Single(String),
}

/// Flat run options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default)]
    pub table: Option<String>,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub skip_formatting: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        GenerationOptions {
            table: None,
            output_dir: PathBuf::from("generated"),
            dry_run: false,
            force: false,
            skip_formatting: false,
        }
    }
}

/// Everything the stages have produced so far.
#[derive(Debug, Clone, Default)]
pub struct ContextMetadata {
    pub relationships: BTreeMap<String, Vec<Relationship>>,
    pub rendered: Vec<RenderedTable>,
    pub documents: Vec<Document>,
    pub changes: Option<ChangeReport>,
    pub files: Vec<PathBuf>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub failed_tables: BTreeSet<String>,
    /// Cause chain of the first fatal error.
    pub diagnostic: Option<String>,
}

/// State threaded through the pipeline. Stages take a context by value and
/// hand back an enriched one; recorded data is never removed.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    target: TableTarget,
    schema: Option<Arc<Schema>>,
    metadata: ContextMetadata,
    options: GenerationOptions,
}

impl GenerationContext {
    pub fn new(options: GenerationOptions) -> Self {
        let target = match &options.table {
            Some(name) => TableTarget::Single(name.clone()),
            None => TableTarget::All,
        };
        GenerationContext {
            target,
            schema: None,
            metadata: ContextMetadata::default(),
            options,
        }
    }

    pub fn for_table(table: &str, options: GenerationOptions) -> Self {
        GenerationContext::new(GenerationOptions {
            table: Some(table.to_string()),
            ..options
        })
    }

    pub fn target(&self) -> &TableTarget {
        &self.target
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn metadata(&self) -> &ContextMetadata {
        &self.metadata
    }

    /// Table names this run processes, in schema order.
    pub fn target_tables(&self) -> Vec<String> {
        let Some(schema) = &self.schema else {
            return Vec::new();
        };
        match &self.target {
            TableTarget::All => schema.table_names().map(str::to_string).collect(),
            TableTarget::Single(name) => schema
                .table(name)
                .map(|t| vec![t.name.clone()])
                .unwrap_or_default(),
        }
    }

    pub fn is_failed(&self, table: &str) -> bool {
        self.metadata.failed_tables.contains(table)
    }

    pub fn with_schema(self, schema: Schema) -> Self {
        GenerationContext {
            schema: Some(Arc::new(schema)),
            ..self
        }
    }

    pub fn with_relationships(mut self, table: &str, rels: Vec<Relationship>) -> Self {
        self.metadata.relationships.insert(table.to_string(), rels);
        self
    }

    pub fn with_rendered(mut self, rendered: RenderedTable) -> Self {
        self.metadata.warnings.extend(rendered.warnings.iter().cloned());
        self.metadata.rendered.push(rendered);
        self
    }

    pub fn with_documents(mut self, documents: Vec<Document>) -> Self {
        self.metadata.documents.extend(documents);
        self
    }

    pub fn with_changes(mut self, changes: ChangeReport) -> Self {
        self.metadata.changes = Some(changes);
        self
    }

    pub fn with_file(mut self, path: PathBuf) -> Self {
        self.metadata.files.push(path);
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.metadata.warnings.push(warning.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.metadata.errors.push(error.into());
        self
    }

    /// Record an error that stopped a stage, keeping the first diagnostic.
    pub fn with_failure(mut self, error: &PipelineError) -> Self {
        self.metadata.errors.push(error.to_string());
        if self.metadata.diagnostic.is_none() {
            self.metadata.diagnostic = error.diagnostic(DIAGNOSTIC_LINES);
        }
        self
    }

    /// Record a per-table failure as `"Table <name>: <message>"`.
    pub fn with_table_error(mut self, table: &str, message: impl std::fmt::Display) -> Self {
        self.metadata.failed_tables.insert(table.to_string());
        self.metadata
            .errors
            .push(format!("Table {}: {}", table, message));
        self
    }
}
