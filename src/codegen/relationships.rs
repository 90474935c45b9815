//! Resolution of ORM association declarations into Zero relationship entries.
//!
//! Zero relationships are single-hop `one`/`many` edges. Through-associations
//! therefore become documentation comments, and polymorphic belongs-to
//! associations fan out into one edge per candidate table.

use crate::codegen::naming;
use crate::config::GeneratorConfig;
use crate::error::TableError;
use crate::ir::{Association, Cardinality, Relationship, Schema, Table};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

pub struct RelationshipProcessor {
    polymorphic: BTreeMap<String, Vec<String>>,
    hierarchy: Vec<String>,
    children: String,
}

impl RelationshipProcessor {
    pub fn new(config: Arc<GeneratorConfig>) -> Self {
        RelationshipProcessor {
            polymorphic: config.polymorphic.clone(),
            hierarchy: config.hierarchy_associations.clone(),
            children: config.children_association.clone(),
        }
    }

    /// Resolve every association declared on `table` against `schema`.
    pub fn resolve(&self, table: &Table, schema: &Schema) -> Result<Vec<Relationship>, TableError> {
        let mut seen = HashSet::new();
        for assoc in &table.associations {
            if !seen.insert(assoc.name()) {
                return Err(TableError::DuplicateRelationship(assoc.name().to_string()));
            }
        }

        let mut out = Vec::new();
        let mut throughs = Vec::new();
        for assoc in &table.associations {
            match assoc {
                Association::BelongsTo {
                    name,
                    foreign_key,
                    target_table,
                } => {
                    if !table.has_column(foreign_key) {
                        return Err(TableError::UnmappedForeignKey {
                            association: name.clone(),
                            table: table.name.clone(),
                            column: foreign_key.clone(),
                        });
                    }
                    let Some(target) = schema.table(target_table) else {
                        out.push(skip(name, &format!("target table {} is not in the schema", target_table)));
                        continue;
                    };
                    out.push(Relationship::Edge {
                        name: name.clone(),
                        cardinality: Cardinality::One,
                        source_field: foreign_key.clone(),
                        dest_field: target.primary_key.clone(),
                        dest_table: target.name.clone(),
                    });
                    if target.name == table.name
                        && self.hierarchy.iter().any(|h| h == name)
                        && !seen.contains(self.children.as_str())
                    {
                        debug!(table = %table.name, parent = %name, "synthesizing children edge");
                        out.push(Relationship::Comment {
                            name: self.children.clone(),
                            lines: vec![format!("{}: inverse of {} (synthesized)", self.children, name)],
                        });
                        out.push(Relationship::Edge {
                            name: self.children.clone(),
                            cardinality: Cardinality::Many,
                            source_field: table.primary_key.clone(),
                            dest_field: foreign_key.clone(),
                            dest_table: table.name.clone(),
                        });
                    }
                }
                Association::Polymorphic {
                    name,
                    foreign_key,
                    foreign_type,
                } => {
                    if !table.has_column(foreign_key) {
                        return Err(TableError::UnmappedForeignKey {
                            association: name.clone(),
                            table: table.name.clone(),
                            column: foreign_key.clone(),
                        });
                    }
                    out.extend(self.resolve_polymorphic(name, foreign_key, foreign_type, schema));
                }
                Association::HasMany {
                    name,
                    target_table,
                    foreign_key,
                    through,
                    source,
                }
                | Association::HasOne {
                    name,
                    target_table,
                    foreign_key,
                    through,
                    source,
                } => {
                    let cardinality = match assoc {
                        Association::HasOne { .. } => Cardinality::One,
                        _ => Cardinality::Many,
                    };
                    if let Some(through) = through {
                        if !seen.contains(through.as_str()) {
                            return Err(TableError::UnknownThrough {
                                association: name.clone(),
                                through: through.clone(),
                            });
                        }
                        let source = source
                            .clone()
                            .unwrap_or_else(|| match cardinality {
                                Cardinality::Many => naming::singularize(name),
                                Cardinality::One => name.clone(),
                            });
                        throughs.push((out.len(), through.clone()));
                        out.push(through_comment(assoc.kind(), name, through, &source));
                        continue;
                    }
                    let Some(target) = schema.table(target_table) else {
                        out.push(skip(name, &format!("target table {} is not in the schema", target_table)));
                        continue;
                    };
                    if !target.has_column(foreign_key) {
                        debug!(
                            table = %table.name,
                            relationship = %name,
                            foreign_key = %foreign_key,
                            "foreign key missing on target, skipping edge"
                        );
                        out.push(skip(
                            name,
                            &format!("foreign key {}.{} does not exist", target.name, foreign_key),
                        ));
                        continue;
                    }
                    out.push(Relationship::Edge {
                        name: name.clone(),
                        cardinality,
                        source_field: table.primary_key.clone(),
                        dest_field: foreign_key.clone(),
                        dest_table: target.name.clone(),
                    });
                }
            }
        }

        // A hop through an association that produced no edge cannot be queried.
        let edges: HashSet<String> = out
            .iter()
            .filter(|r| r.is_edge())
            .map(|r| r.name().to_string())
            .collect();
        for (index, through) in throughs {
            if edges.contains(&through) {
                continue;
            }
            if let Relationship::Comment { lines, .. } = &mut out[index] {
                lines.truncate(1);
                lines.push(format!(
                    "  {} is not available as a relationship, so there is no query path",
                    through
                ));
            }
        }
        Ok(out)
    }

    fn resolve_polymorphic(
        &self,
        name: &str,
        foreign_key: &str,
        foreign_type: &str,
        schema: &Schema,
    ) -> Vec<Relationship> {
        let candidates: Vec<_> = self
            .polymorphic
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|candidate| schema.table(candidate))
            .collect();
        if candidates.is_empty() {
            return vec![Relationship::Comment {
                name: name.to_string(),
                lines: vec![format!(
                    "{}: polymorphic on {}; no known candidate tables, not generated",
                    name, foreign_type
                )],
            }];
        }

        let mut out = vec![Relationship::Comment {
            name: name.to_string(),
            lines: vec![format!(
                "{}: polymorphic on {}; one edge per candidate, read the one matching the discriminator",
                name, foreign_type
            )],
        }];
        for target in candidates {
            out.push(Relationship::Edge {
                name: naming::polymorphic_edge_name(name, &target.name),
                cardinality: Cardinality::One,
                source_field: foreign_key.to_string(),
                dest_field: target.primary_key.clone(),
                dest_table: target.name.clone(),
            });
        }
        out
    }
}

/// Comment entry standing in for an edge that could not be generated.
pub fn skip(name: &str, reason: &str) -> Relationship {
    Relationship::Comment {
        name: name.to_string(),
        lines: vec![format!("{}: skipped, {}", name, reason)],
    }
}

fn through_comment(kind: &str, name: &str, through: &str, source: &str) -> Relationship {
    Relationship::Comment {
        name: name.to_string(),
        lines: vec![
            format!("{}: {} through {}; Zero relationships are single-hop", name, kind, through),
            format!("  query with .related('{}', (q) => q.related('{}'))", through, source),
        ],
    }
}
