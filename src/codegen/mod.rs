pub mod naming;
pub mod relationships;
pub mod schema;
pub mod type_mapper;
pub mod types;

use crate::config::GeneratorConfig;
use crate::error::TableError;
use crate::ir::{Relationship, Table};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use type_mapper::TypeMapper;

pub const HEADER_RULE: &str = "// -----------------------------------------------------------";
pub const HEADER_WARNING: &str = "//  WARNING: THIS FILE IS AUTOGENERATED BY zerogen. DO NOT EDIT.";
pub const HEADER_NOTICE: &str = "//  Hand edits are overwritten by the next `zerogen generate`.";
pub const HASH_PREFIX: &str = "//  content-hash: sha256:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Schema,
    Types,
}

/// A rendered output file. `body` excludes the header, which is derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub kind: DocumentKind,
    pub file_name: String,
    pub body: String,
}

impl Document {
    pub fn contents(&self) -> String {
        with_header(&self.body)
    }
}

pub fn content_hash(body: &str) -> String {
    format!("{:x}", Sha256::digest(body.as_bytes()))
}

pub fn with_header(body: &str) -> String {
    format!(
        "{rule}\n{warning}\n{notice}\n{prefix}{hash}\n{rule}\n\n{body}",
        rule = HEADER_RULE,
        warning = HEADER_WARNING,
        notice = HEADER_NOTICE,
        prefix = HASH_PREFIX,
        hash = content_hash(body),
        body = body,
    )
}

/// Split a generated file into its recorded hash (if any) and its body.
/// Returns `None` when the file does not start with a generator header.
pub fn split_header(text: &str) -> Option<(Option<&str>, &str)> {
    let rest = text.strip_prefix(HEADER_RULE)?.strip_prefix('\n')?;
    let closing = format!("{}\n", HEADER_RULE);
    let end = rest.find(&closing)?;
    let header = &rest[..end];
    let body = &rest[end + closing.len()..];
    let body = body.strip_prefix('\n').unwrap_or(body);
    let hash = header
        .lines()
        .find_map(|line| line.strip_prefix(HASH_PREFIX))
        .map(str::trim);
    Some((hash, body))
}

/// Everything produced for one table.
#[derive(Debug, Clone)]
pub struct RenderedTable {
    pub table_name: String,
    pub class_name: String,
    pub ident: String,
    pub columns_block: String,
    /// `relationships(...)` block, present when at least one edge resolved.
    pub relationships_block: Option<String>,
    pub relationships_ident: Option<String>,
    /// Comment-only entries for tables without edges.
    pub comment_block: Option<String>,
    pub type_block: String,
    pub builders: BTreeSet<String>,
    pub warnings: Vec<String>,
}

impl RenderedTable {
    /// Standalone content for this table, as reported per model.
    pub fn content(&self) -> String {
        let mut out = self.columns_block.clone();
        if let Some(block) = self.relationships_block.as_ref().or(self.comment_block.as_ref()) {
            out.push('\n');
            out.push_str(block);
        }
        out
    }
}

/// Check that a table can be rendered at all. Depends on nothing but the table.
pub fn validate(table: &Table) -> Result<(), TableError> {
    if table.columns.is_empty() {
        return Err(TableError::NoColumns);
    }
    if !table.has_column(&table.primary_key) {
        return Err(TableError::MissingPrimaryKey(table.primary_key.clone()));
    }
    Ok(())
}

/// Tables whose document identifiers clash with an earlier table's, keyed by
/// table name. The first table in `tables` order keeps the identifier.
pub fn identifier_conflicts<'a>(
    tables: impl IntoIterator<Item = &'a str>,
) -> BTreeMap<String, TableError> {
    let mut owners: BTreeMap<String, String> = BTreeMap::new();
    let mut conflicts = BTreeMap::new();
    for table in tables {
        let idents = [naming::table_ident(table), naming::relationships_ident(table)];
        let clash = idents
            .iter()
            .find_map(|ident| owners.get(ident).map(|owner| (ident.clone(), owner.clone())));
        if let Some((ident, owner)) = clash {
            conflicts.insert(
                table.to_string(),
                TableError::DuplicateIdentifier { ident, table: owner },
            );
            continue;
        }
        for ident in idents {
            owners.insert(ident, table.to_string());
        }
    }
    conflicts
}

pub struct TemplateRenderer {
    config: Arc<GeneratorConfig>,
}

impl TemplateRenderer {
    pub fn new(config: Arc<GeneratorConfig>) -> Self {
        TemplateRenderer { config }
    }

    /// Render the column block, relationship block and type definition for one table.
    /// Edges into tables outside `available` are downgraded to skip comments.
    pub fn render_table(
        &self,
        table: &Table,
        relationships: &[Relationship],
        available: &BTreeSet<String>,
        type_mapper: &TypeMapper,
    ) -> Result<RenderedTable, TableError> {
        validate(table)?;

        let mut builders = BTreeSet::new();
        let mut warnings = Vec::new();
        let columns_block = schema::render_columns(table, type_mapper, &mut builders, &mut warnings);

        let entries: Vec<Relationship> = relationships
            .iter()
            .map(|rel| match rel {
                Relationship::Edge { name, dest_table, .. } if !available.contains(dest_table) => {
                    relationships::skip(name, &format!("target table {} was not generated", dest_table))
                }
                other => other.clone(),
            })
            .collect();

        let (relationships_block, relationships_ident, comment_block) =
            if entries.iter().any(Relationship::is_edge) {
                builders.insert("relationships".to_string());
                (
                    Some(schema::render_relationships(table, &entries)),
                    Some(naming::relationships_ident(&table.name)),
                    None,
                )
            } else if entries.is_empty() {
                (None, None, None)
            } else {
                (None, None, Some(schema::render_comments(&entries, "")))
            };

        Ok(RenderedTable {
            table_name: table.name.clone(),
            class_name: naming::class_name(&table.name),
            ident: naming::table_ident(&table.name),
            columns_block,
            relationships_block,
            relationships_ident,
            comment_block,
            type_block: types::render_type(table, type_mapper),
            builders,
            warnings,
        })
    }

    /// Assemble the schema document and, when configured, the types document.
    pub fn assemble(&self, tables: &[RenderedTable]) -> Vec<Document> {
        let mut docs = vec![Document {
            kind: DocumentKind::Schema,
            file_name: self.config.schema_file.clone(),
            body: schema::render_document(tables),
        }];
        if let Some(types_file) = &self.config.types_file {
            docs.push(Document {
                kind: DocumentKind::Types,
                file_name: types_file.clone(),
                body: types::render_document(tables),
            });
        }
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_hash_and_body() {
        let body = "const a = 1;\n";
        let text = with_header(body);
        let (hash, parsed) = split_header(&text).unwrap();
        assert_eq!(parsed, body);
        assert_eq!(hash, Some(content_hash(body).as_str()));
    }

    #[test]
    fn later_tables_lose_clashing_identifiers() {
        let conflicts = identifier_conflicts(["taskComments", "task_comments", "tasks", "tasks_relationships"]);
        assert_eq!(
            conflicts.get("task_comments"),
            Some(&TableError::DuplicateIdentifier {
                ident: "taskComments".into(),
                table: "taskComments".into(),
            })
        );
        assert_eq!(
            conflicts.get("tasks_relationships"),
            Some(&TableError::DuplicateIdentifier {
                ident: "tasksRelationships".into(),
                table: "tasks".into(),
            })
        );
        assert_eq!(conflicts.len(), 2);
    }

    #[test]
    fn files_without_header_are_not_split() {
        assert!(split_header("import x from 'y';\n").is_none());
    }
}
