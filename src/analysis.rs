use crate::codegen::naming;
use crate::config::GeneratorConfig;
use crate::context::{GenerationContext, TableTarget};
use crate::error::PipelineError;
use crate::introspect::Introspector;
use crate::ir::{
    Association, BelongsToDecl, Column, HasManyDecl, IntrospectionResult, PolymorphicDecl, Schema,
    Table,
};
use heck::ToSnakeCase;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{info, warn};

/// First stage: introspect and normalize into a canonical [`Schema`].
pub struct SchemaAnalysis {
    introspector: Box<dyn Introspector>,
    config: Arc<GeneratorConfig>,
}

impl SchemaAnalysis {
    pub fn new(introspector: Box<dyn Introspector>, config: Arc<GeneratorConfig>) -> Self {
        SchemaAnalysis {
            introspector,
            config,
        }
    }

    pub fn run(&self, ctx: GenerationContext) -> Result<GenerationContext, PipelineError> {
        let raw = self
            .introspector
            .introspect()
            .map_err(PipelineError::Introspection)?;
        let (schema, warnings) = normalize(raw, &self.config)?;

        if let TableTarget::Single(name) = ctx.target() {
            if !schema.contains(name) {
                return Err(PipelineError::UnknownTable(name.clone()));
            }
        }

        info!(
            tables = schema.tables.len(),
            associations = schema.tables.values().map(|t| t.associations.len()).sum::<usize>(),
            "schema analyzed"
        );
        let ctx = warnings
            .into_iter()
            .fold(ctx, |ctx, w| ctx.with_warning(w));
        Ok(ctx.with_schema(schema))
    }
}

/// Normalize raw introspection metadata. Tables come out sorted by name,
/// association conventions are filled in, and excluded tables are dropped.
pub fn normalize(
    raw: IntrospectionResult,
    config: &GeneratorConfig,
) -> Result<(Schema, Vec<String>), PipelineError> {
    let mut warnings = Vec::new();
    let mut tables: IndexMap<String, Table> = IndexMap::new();

    let mut raw_tables = raw.tables;
    raw_tables.sort_by(|a, b| a.name.cmp(&b.name));
    for raw_table in raw_tables {
        if config.is_excluded(&raw_table.name) {
            continue;
        }
        if tables.contains_key(&raw_table.name) {
            return Err(PipelineError::DuplicateTable(raw_table.name));
        }
        let columns = raw_table
            .columns
            .into_iter()
            .map(|c| Column {
                name: c.name,
                column_type: c.column_type,
                nullable: c.nullable,
                is_enum: c.is_enum,
                comment: c.comment,
                table: raw_table.name.clone(),
            })
            .collect();
        tables.insert(
            raw_table.name.clone(),
            Table {
                name: raw_table.name,
                primary_key: raw_table.primary_key,
                columns,
                associations: Vec::new(),
            },
        );
    }

    for decls in raw.relationships {
        if config.is_excluded(&decls.table) {
            continue;
        }
        let Some(table) = tables.get_mut(&decls.table) else {
            warn!(table = %decls.table, "associations declared for unknown table, ignoring");
            warnings.push(format!(
                "Associations declared for unknown table {} were ignored",
                decls.table
            ));
            continue;
        };
        let owner = table.name.clone();
        for bt in decls.belongs_to {
            table.associations.push(belongs_to(&bt));
        }
        for poly in decls.polymorphic {
            table.associations.push(polymorphic(&poly));
        }
        for ho in decls.has_one {
            let (name, target_table, foreign_key, through, source) = has_association(&owner, ho);
            table.associations.push(Association::HasOne {
                name,
                target_table,
                foreign_key,
                through,
                source,
            });
        }
        for hm in decls.has_many {
            let (name, target_table, foreign_key, through, source) = has_association(&owner, hm);
            table.associations.push(Association::HasMany {
                name,
                target_table,
                foreign_key,
                through,
                source,
            });
        }
    }

    Ok((Schema { tables }, warnings))
}

fn belongs_to(decl: &BelongsToDecl) -> Association {
    let foreign_key = decl
        .foreign_key
        .clone()
        .unwrap_or_else(|| format!("{}_id", decl.name));
    if decl.polymorphic {
        return Association::Polymorphic {
            name: decl.name.clone(),
            foreign_key,
            foreign_type: decl
                .foreign_type
                .clone()
                .unwrap_or_else(|| format!("{}_type", decl.name)),
        };
    }
    let target_table = decl
        .target_table
        .clone()
        .or_else(|| decl.class_name.as_deref().map(table_for_class))
        .unwrap_or_else(|| naming::pluralize(&decl.name));
    Association::BelongsTo {
        name: decl.name.clone(),
        foreign_key,
        target_table,
    }
}

fn polymorphic(decl: &PolymorphicDecl) -> Association {
    Association::Polymorphic {
        name: decl.name.clone(),
        foreign_key: decl
            .foreign_key
            .clone()
            .unwrap_or_else(|| format!("{}_id", decl.name)),
        foreign_type: decl
            .foreign_type
            .clone()
            .unwrap_or_else(|| format!("{}_type", decl.name)),
    }
}

type HasParts = (String, String, String, Option<String>, Option<String>);

fn has_association(owner: &str, decl: HasManyDecl) -> HasParts {
    let target_table = decl
        .target_table
        .or_else(|| decl.class_name.as_deref().map(table_for_class))
        .unwrap_or_else(|| naming::pluralize(&decl.name));
    let foreign_key = decl
        .foreign_key
        .unwrap_or_else(|| format!("{}_id", naming::singularize(owner)));
    (decl.name, target_table, foreign_key, decl.through, decl.source)
}

/// `"TaskComment"` -> `"task_comments"`
fn table_for_class(class_name: &str) -> String {
    naming::pluralize(&class_name.to_snake_case())
}
