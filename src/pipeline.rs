use crate::analysis::SchemaAnalysis;
use crate::changes::ChangeReport;
use crate::codegen::relationships::RelationshipProcessor;
use crate::codegen::type_mapper::TypeMapper;
use crate::codegen::{self, Document, TemplateRenderer};
use crate::config::GeneratorConfig;
use crate::context::{GenerationContext, GenerationOptions, TableTarget};
use crate::error::{PipelineError, TableError, DIAGNOSTIC_LINES};
use crate::files::FileManager;
use crate::format::{CommandFormatter, Formatter};
use crate::introspect::Introspector;
use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedModel {
    pub table_name: String,
    pub class_name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    /// Wall-clock seconds.
    pub execution_time: f64,
    pub tables_processed: usize,
    pub models_generated: usize,
    pub files_created: usize,
    pub errors_encountered: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationResult {
    pub success: bool,
    pub generated_models: Vec<GeneratedModel>,
    pub generated_files: Vec<PathBuf>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    pub statistics: Statistics,
    /// Assembled documents, written or not.
    #[serde(skip)]
    pub documents: Vec<Document>,
}

impl GenerationResult {
    pub fn model(&self, table: &str) -> Option<&GeneratedModel> {
        self.generated_models.iter().find(|m| m.table_name == table)
    }
}

/// Runs analysis, relationship resolution, rendering and writing in order.
pub struct Pipeline {
    analysis: SchemaAnalysis,
    type_mapper: TypeMapper,
    relationships: RelationshipProcessor,
    renderer: TemplateRenderer,
    files: FileManager,
    formatter: Option<Box<dyn Formatter>>,
    options: GenerationOptions,
}

impl Pipeline {
    pub fn new(
        analysis: SchemaAnalysis,
        type_mapper: TypeMapper,
        relationships: RelationshipProcessor,
        renderer: TemplateRenderer,
        files: FileManager,
    ) -> Self {
        Pipeline {
            analysis,
            type_mapper,
            relationships,
            renderer,
            files,
            formatter: None,
            options: GenerationOptions::default(),
        }
    }

    /// Wire every stage from one configuration. A configured formatter is
    /// installed but only resolved on `PATH` when it first runs.
    pub fn from_config(config: GeneratorConfig, introspector: Box<dyn Introspector>) -> Result<Self> {
        let config = Arc::new(config);
        let pipeline = Pipeline::new(
            SchemaAnalysis::new(introspector, config.clone()),
            TypeMapper::new(config.clone()),
            RelationshipProcessor::new(config.clone()),
            TemplateRenderer::new(config.clone()),
            FileManager::new(config.clone())?,
        );
        Ok(match &config.formatter {
            Some(fmt) => pipeline.with_formatter(Box::new(CommandFormatter::new(fmt))),
            None => pipeline,
        })
    }

    pub fn with_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Run the pipeline. Without a seed context the pipeline's own options apply.
    pub fn execute(&self, seed: Option<GenerationContext>) -> GenerationResult {
        let start = Instant::now();
        let ctx = seed.unwrap_or_else(|| GenerationContext::new(self.options.clone()));
        match ctx.target() {
            TableTarget::All => info!("generation started"),
            TableTarget::Single(name) => info!(table = %name, "single-table generation started"),
        }

        let ctx = match self.analysis.run(ctx) {
            Ok(ctx) => ctx,
            Err(e) => return fatal(e, start),
        };
        let ctx = self.render(ctx);

        if let TableTarget::Single(name) = ctx.target() {
            debug!(table = %name, "single-table run, output files are not written");
            return finish(ctx, start);
        }

        let documents = self.renderer.assemble(&ctx.metadata().rendered);
        let (documents, ctx) = self.format_documents(documents, ctx);
        let ctx = ctx.with_documents(documents);
        finish(self.files.run(ctx), start)
    }

    /// Render a single table against the full schema without writing any file.
    pub fn generate_model_for_table(&self, table: &str) -> GenerationResult {
        self.execute(Some(GenerationContext::for_table(table, self.options.clone())))
    }

    fn render(&self, mut ctx: GenerationContext) -> GenerationContext {
        let schema = ctx.schema().cloned().unwrap_or_default();
        let targets = ctx.target_tables();

        for name in &targets {
            let Some(table) = schema.table(name) else {
                continue;
            };
            debug!(table = %name, "resolving relationships");
            ctx = match self.relationships.resolve(table, &schema) {
                Ok(rels) => ctx.with_relationships(name, rels),
                Err(e) => {
                    warn!(table = %name, error = %e, "relationship resolution failed");
                    ctx.with_table_error(name, e)
                }
            };
        }

        // Tables that can never be emitted, whether targeted or not. No edge
        // may point at them.
        let mut rejected: BTreeMap<String, TableError> =
            codegen::identifier_conflicts(schema.table_names());
        for table in schema.tables.values() {
            if let Err(e) = codegen::validate(table) {
                rejected.entry(table.name.clone()).or_insert(e);
            }
        }
        for name in &targets {
            if let Some(e) = rejected.get(name) {
                if !ctx.is_failed(name) {
                    warn!(table = %name, error = %e, "table could not be rendered");
                    ctx = ctx.with_table_error(name, e);
                }
            }
        }

        let available: BTreeSet<String> = schema
            .table_names()
            .filter(|name| !ctx.is_failed(name) && !rejected.contains_key(*name))
            .map(str::to_string)
            .collect();
        for name in &targets {
            if ctx.is_failed(name) {
                continue;
            }
            let Some(table) = schema.table(name) else {
                continue;
            };
            let rels = ctx
                .metadata()
                .relationships
                .get(name)
                .cloned()
                .unwrap_or_default();
            ctx = match self
                .renderer
                .render_table(table, &rels, &available, &self.type_mapper)
            {
                Ok(rendered) => {
                    debug!(table = %name, "rendered");
                    ctx.with_rendered(rendered)
                }
                Err(e) => ctx.with_table_error(name, e),
            };
        }
        ctx
    }

    fn format_documents(
        &self,
        documents: Vec<Document>,
        mut ctx: GenerationContext,
    ) -> (Vec<Document>, GenerationContext) {
        let Some(formatter) = self.formatter.as_ref() else {
            return (documents, ctx);
        };
        if ctx.options().skip_formatting {
            debug!("formatting skipped");
            return (documents, ctx);
        }
        let mut formatted = Vec::with_capacity(documents.len());
        for mut doc in documents {
            match formatter.format(&doc.file_name, &doc.body) {
                Ok(body) => doc.body = body,
                Err(e) => {
                    warn!(file = %doc.file_name, error = %e, "formatter failed, keeping unformatted output");
                    ctx = ctx.with_warning(format!("Formatter failed for {}: {:#}", doc.file_name, e));
                }
            }
            formatted.push(doc);
        }
        (formatted, ctx)
    }
}

fn finish(ctx: GenerationContext, start: Instant) -> GenerationResult {
    let metadata = ctx.metadata();
    let generated_models: Vec<GeneratedModel> = metadata
        .rendered
        .iter()
        .map(|r| GeneratedModel {
            table_name: r.table_name.clone(),
            class_name: r.class_name.clone(),
            content: r.content(),
        })
        .collect();
    let statistics = Statistics {
        execution_time: start.elapsed().as_secs_f64(),
        tables_processed: ctx.target_tables().len(),
        models_generated: generated_models.len(),
        files_created: metadata.files.len(),
        errors_encountered: metadata.errors.len(),
        warnings: metadata.warnings.len(),
    };
    info!(
        tables = statistics.tables_processed,
        models = statistics.models_generated,
        files = statistics.files_created,
        errors = statistics.errors_encountered,
        warnings = statistics.warnings,
        "generation finished"
    );
    GenerationResult {
        success: metadata.errors.is_empty(),
        generated_models,
        generated_files: metadata.files.clone(),
        errors: metadata.errors.clone(),
        warnings: metadata.warnings.clone(),
        changes: metadata.changes.clone(),
        diagnostic: metadata.diagnostic.clone(),
        documents: metadata.documents.clone(),
        statistics,
    }
}

fn fatal(e: PipelineError, start: Instant) -> GenerationResult {
    error!(error = %e, "generation aborted");
    GenerationResult {
        success: false,
        errors: vec![e.to_string()],
        diagnostic: e.diagnostic(DIAGNOSTIC_LINES),
        statistics: Statistics {
            execution_time: start.elapsed().as_secs_f64(),
            errors_encountered: 1,
            ..Default::default()
        },
        ..Default::default()
    }
}
