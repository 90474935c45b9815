use crate::changes::ChangeDetector;
use crate::codegen::{Document, DocumentKind};
use crate::config::GeneratorConfig;
use crate::context::GenerationContext;
use crate::error::PipelineError;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Last stage: diff against the previous output, then write. Failures are
/// recorded on the context along with every file written before them.
///
/// Writing is overwrite-only. Detected customizations are reported, never merged.
pub struct FileManager {
    config: Arc<GeneratorConfig>,
    detector: ChangeDetector,
}

impl FileManager {
    pub fn new(config: Arc<GeneratorConfig>) -> Result<Self> {
        Ok(FileManager {
            config,
            detector: ChangeDetector::new()?,
        })
    }

    /// Report changes, then write. A failure is recorded on the context along
    /// with every file written before it.
    pub fn run(&self, mut ctx: GenerationContext) -> GenerationContext {
        let schema_doc = ctx
            .metadata()
            .documents
            .iter()
            .find(|d| d.kind == DocumentKind::Schema)
            .cloned();
        if let Some(doc) = schema_doc {
            let path = ctx.options().output_dir.join(&doc.file_name);
            match read_previous(&path) {
                Ok(previous) => ctx = self.record_changes(ctx, &doc, previous.as_deref()),
                Err(e) => return fail(ctx, PipelineError::Output(e)),
            }
        }
        if ctx.options().dry_run {
            info!(output_dir = %ctx.options().output_dir.display(), "dry run, nothing written");
            return ctx;
        }

        let mut written = Vec::new();
        let outcome = self.write_all(&ctx, &mut written);
        let ctx = written.into_iter().fold(ctx, GenerationContext::with_file);
        match outcome {
            Ok(()) => ctx,
            Err(e) => fail(ctx, PipelineError::Output(e)),
        }
    }

    fn record_changes(
        &self,
        mut ctx: GenerationContext,
        doc: &Document,
        previous: Option<&str>,
    ) -> GenerationContext {
        let report = self.detector.compare(previous, &doc.contents());
        for marker in &report.customizations {
            warn!(
                file = %doc.file_name,
                line = marker.line,
                text = %marker.text,
                "customization will be overwritten"
            );
            ctx = ctx.with_warning(format!(
                "Customization in {} line {} will be overwritten: {}",
                doc.file_name, marker.line, marker.text
            ));
        }
        for note in report.migration_notes() {
            info!("{}", note);
        }
        ctx.with_changes(report)
    }

    /// Write each document, then the report. Paths land in `written` as they
    /// are written so a later failure does not lose them.
    fn write_all(&self, ctx: &GenerationContext, written: &mut Vec<PathBuf>) -> Result<()> {
        let output_dir = &ctx.options().output_dir;
        let force = ctx.options().force;
        fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create {}", output_dir.display()))?;

        for doc in &ctx.metadata().documents {
            let path = output_dir.join(&doc.file_name);
            if write_if_changed(&path, &doc.contents(), force)? {
                info!(path = %path.display(), "wrote");
                written.push(path);
            } else {
                info!(path = %path.display(), "unchanged");
            }
        }

        if let (Some(report_file), Some(changes)) = (&self.config.report_file, &ctx.metadata().changes) {
            let path = output_dir.join(report_file);
            let text = changes.to_markdown(&self.config.schema_file);
            if write_if_changed(&path, &text, force)? {
                written.push(path);
            }
        }
        Ok(())
    }
}

fn read_previous(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("failed to read {}", path.display()))
}

fn fail(ctx: GenerationContext, e: PipelineError) -> GenerationContext {
    error!(error = %e, "writing output failed");
    ctx.with_failure(&e)
}

/// Write `contents` unless the file already holds exactly that (or `force`).
/// Returns whether the file was written.
pub fn write_if_changed(path: &Path, contents: &str, force: bool) -> Result<bool> {
    if !force {
        if let Ok(existing) = fs::read_to_string(path) {
            if existing == contents {
                return Ok(false);
            }
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
