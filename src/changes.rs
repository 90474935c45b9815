//! Drift tracking between a previously written schema document and a fresh
//! rendering.
//!
//! Both sides are read back through the same patterns, so only changes in
//! table or relationship identity show up, not formatting. Customization
//! detection is heuristic: it flags anything the generator would not have
//! written. A matching content hash in the header short-circuits the scan.

use crate::codegen::{self, schema};
use anyhow::Result;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Comment,
    Import,
    Export,
}

/// Hand-written content found in a previously generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomizationMarker {
    pub kind: MarkerKind,
    /// 1-based line number in the previous file.
    pub line: usize,
    pub text: String,
}

/// Table and relationship identifiers found in a schema document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaInventory {
    pub tables: BTreeSet<String>,
    /// `"<table>.<edge>"`
    pub relationships: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    pub previous_exists: bool,
    /// The previous file no longer matches the hash recorded in its header.
    pub hand_edited: bool,
    /// The rendered document differs from the previous file in any byte.
    pub content_changed: bool,
    pub new_tables: Vec<String>,
    pub removed_tables: Vec<String>,
    pub new_relationships: Vec<String>,
    pub removed_relationships: Vec<String>,
    pub customizations: Vec<CustomizationMarker>,
}

impl ChangeReport {
    pub fn has_changes(&self) -> bool {
        self.content_changed || self.has_structural_changes()
    }

    /// Tables or relationships were added or removed.
    pub fn has_structural_changes(&self) -> bool {
        !self.new_tables.is_empty()
            || !self.removed_tables.is_empty()
            || !self.new_relationships.is_empty()
            || !self.removed_relationships.is_empty()
    }

    /// Plain-language summary lines for the run report.
    pub fn migration_notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if !self.previous_exists {
            notes.push("INITIAL GENERATION: no previous schema file".to_string());
        }
        let sections = [
            ("NEW TABLES", &self.new_tables),
            ("REMOVED TABLES", &self.removed_tables),
            ("NEW RELATIONSHIPS", &self.new_relationships),
            ("REMOVED RELATIONSHIPS", &self.removed_relationships),
        ];
        for (title, items) in sections {
            if !items.is_empty() {
                notes.push(format!("{}: {}", title, items.join(", ")));
            }
        }
        if self.previous_exists && self.content_changed && !self.has_structural_changes() {
            notes.push("CONTENT CHANGES: tables and relationships are unchanged".to_string());
        }
        if self.hand_edited {
            notes.push("PREVIOUS FILE WAS EDITED SINCE IT WAS GENERATED".to_string());
        }
        if !self.customizations.is_empty() {
            let lines: Vec<_> = self
                .customizations
                .iter()
                .map(|m| format!("line {}", m.line))
                .collect();
            notes.push(format!(
                "CUSTOMIZATIONS WILL BE OVERWRITTEN: {}",
                lines.join(", ")
            ));
        }
        if self.previous_exists && notes.is_empty() {
            notes.push("NO SCHEMA CHANGES".to_string());
        }
        notes
    }

    pub fn to_markdown(&self, schema_file: &str) -> String {
        let mut out = format!("# Schema changes: {}\n\n", schema_file);
        for note in self.migration_notes() {
            out.push_str(&format!("- {}\n", note));
        }
        if !self.customizations.is_empty() {
            out.push_str("\n## Customizations\n\n");
            for marker in &self.customizations {
                let kind = match marker.kind {
                    MarkerKind::Comment => "comment",
                    MarkerKind::Import => "import",
                    MarkerKind::Export => "export",
                };
                out.push_str(&format!(
                    "- line {} ({}): `{}`\n",
                    marker.line, kind, marker.text
                ));
            }
        }
        out
    }
}

pub struct ChangeDetector {
    table: Regex,
    rel_block: Regex,
    edge: Regex,
    import: Regex,
    export: Regex,
    generated_comments: Vec<Regex>,
}

impl ChangeDetector {
    pub fn new() -> Result<Self> {
        Ok(ChangeDetector {
            table: Regex::new(r#"^\s*(?:export\s+)?const\s+([\w$]+)\s*=\s*table\(\s*['"]([^'"]+)['"]"#)?,
            rel_block: Regex::new(r"^\s*(?:export\s+)?const\s+[\w$]+\s*=\s*relationships\(\s*([\w$]+)")?,
            edge: Regex::new(r#"^\s*['"]?([\w$-]+)['"]?\s*:\s*(one|many)\("#)?,
            import: Regex::new(schema::IMPORT_PATTERN)?,
            export: Regex::new(
                r"^\s*export\s+(?:default\s+)?(?:declare\s+)?(?:async\s+)?(?:const|let|var|function|type|interface|class|enum)\s+([\w$]+)",
            )?,
            generated_comments: schema::GENERATED_COMMENT_PATTERNS
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Extract table and relationship identifiers from a schema document.
    pub fn inventory(&self, text: &str) -> SchemaInventory {
        let mut inv = SchemaInventory::default();
        let mut idents: BTreeMap<String, String> = BTreeMap::new();
        for line in text.lines() {
            if let Some(caps) = self.table.captures(line) {
                idents.insert(caps[1].to_string(), caps[2].to_string());
                inv.tables.insert(caps[2].to_string());
            }
        }

        let mut current: Option<String> = None;
        for line in text.lines() {
            if let Some(caps) = self.rel_block.captures(line) {
                let ident = &caps[1];
                current = Some(idents.get(ident).cloned().unwrap_or_else(|| ident.to_string()));
                continue;
            }
            let Some(table) = &current else {
                continue;
            };
            if line.trim_start().starts_with("}));") {
                current = None;
                continue;
            }
            if let Some(caps) = self.edge.captures(line) {
                inv.relationships.insert(format!("{}.{}", table, &caps[1]));
            }
        }
        inv
    }

    /// Lines of `text` the generator would not have produced.
    pub fn customizations(&self, text: &str) -> Vec<CustomizationMarker> {
        let mut markers = Vec::new();
        let mut in_header = text.starts_with(codegen::HEADER_RULE);
        let mut rules_seen = 0;
        for (idx, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if in_header {
                if trimmed == codegen::HEADER_RULE {
                    rules_seen += 1;
                    if rules_seen == 2 {
                        in_header = false;
                    }
                }
                continue;
            }
            let marker = |kind| CustomizationMarker {
                kind,
                line: idx + 1,
                text: trimmed.to_string(),
            };
            if trimmed.starts_with("/*") {
                markers.push(marker(MarkerKind::Comment));
            } else if trimmed.starts_with("//") {
                if !self.generated_comments.iter().any(|re| re.is_match(line)) {
                    markers.push(marker(MarkerKind::Comment));
                }
            } else if trimmed.starts_with("import ") || trimmed.starts_with("import{") {
                if !self.import.is_match(trimmed) {
                    markers.push(marker(MarkerKind::Import));
                }
            } else if trimmed.starts_with("export ") {
                let known = self
                    .export
                    .captures(trimmed)
                    .map(|caps| schema::KNOWN_EXPORTS.contains(&&caps[1]))
                    .unwrap_or(false);
                if !known || trimmed.starts_with("export default") {
                    markers.push(marker(MarkerKind::Export));
                }
            }
        }
        markers
    }

    /// Compare the previous file (if any) with the newly rendered document.
    pub fn compare(&self, previous: Option<&str>, rendered: &str) -> ChangeReport {
        let Some(previous) = previous else {
            return ChangeReport {
                previous_exists: false,
                content_changed: true,
                new_tables: self.inventory(rendered).tables.into_iter().collect(),
                ..ChangeReport::default()
            };
        };

        let old = self.inventory(previous);
        let new = self.inventory(rendered);

        let (hand_edited, customizations) = match codegen::split_header(previous) {
            Some((Some(hash), body)) if hash == codegen::content_hash(body) => (false, Vec::new()),
            Some((Some(_), _)) => (true, self.customizations(previous)),
            _ => (false, self.customizations(previous)),
        };

        ChangeReport {
            previous_exists: true,
            hand_edited,
            content_changed: previous != rendered,
            new_tables: new.tables.difference(&old.tables).cloned().collect(),
            removed_tables: old.tables.difference(&new.tables).cloned().collect(),
            new_relationships: new
                .relationships
                .difference(&old.relationships)
                .cloned()
                .collect(),
            removed_relationships: old
                .relationships
                .difference(&new.relationships)
                .cloned()
                .collect(),
            customizations,
        }
    }
}
