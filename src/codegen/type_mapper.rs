use crate::config::GeneratorConfig;
use crate::ir::{Column, ColumnType};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub const STRING: &str = "string()";
pub const NUMBER: &str = "number()";
pub const BOOLEAN: &str = "boolean()";
pub const JSON: &str = "json()";

const OPTIONAL: &str = ".optional()";

/// A target column type such as `string().optional()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub base: String,
    pub optional: bool,
    /// Set when the source type was not recognized and `string()` was used.
    pub fallback: bool,
}

impl TypeExpr {
    /// Builder function the expression starts with, e.g. `string` for `string()`.
    pub fn builder(&self) -> &str {
        self.base
            .split(|c: char| c == '(' || c == '<')
            .next()
            .unwrap_or(&self.base)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        if self.optional {
            f.write_str(OPTIONAL)?;
        }
        Ok(())
    }
}

pub struct TypeMapper {
    overrides: BTreeMap<String, String>,
}

impl TypeMapper {
    pub fn new(config: Arc<GeneratorConfig>) -> Self {
        TypeMapper::with_overrides(config.type_overrides.clone())
    }

    pub fn with_overrides(overrides: BTreeMap<String, String>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(k, v)| (k, normalize_override(&v)))
            .collect();
        TypeMapper { overrides }
    }

    /// Map a non-key column. Nullable columns get the optional modifier.
    pub fn map(&self, table: &str, column: &Column) -> TypeExpr {
        let mut expr = self.base_type(table, column);
        expr.optional = column.nullable;
        expr
    }

    /// Map a primary key column. Never optional, whatever the source says.
    pub fn map_primary_key(&self, table: &str, column: &Column) -> TypeExpr {
        let mut expr = self.base_type(table, column);
        expr.optional = false;
        expr
    }

    /// Map a column, choosing the primary-key path when `primary_key` names it.
    pub fn map_in_table(&self, table: &str, primary_key: &str, column: &Column) -> TypeExpr {
        if column.name == primary_key {
            self.map_primary_key(table, column)
        } else {
            self.map(table, column)
        }
    }

    fn base_type(&self, table: &str, column: &Column) -> TypeExpr {
        let qualified = format!("{}.{}", table, column.name);
        if let Some(ty) = self
            .overrides
            .get(&qualified)
            .or_else(|| self.overrides.get(&column.name))
        {
            return TypeExpr {
                base: ty.clone(),
                optional: false,
                fallback: false,
            };
        }

        let (base, fallback) = if column.is_enum {
            (STRING, false)
        } else {
            match &column.column_type {
                ColumnType::Uuid | ColumnType::String | ColumnType::Text => (STRING, false),
                ColumnType::Integer
                | ColumnType::BigInteger
                | ColumnType::Decimal
                | ColumnType::Float => (NUMBER, false),
                ColumnType::Boolean => (BOOLEAN, false),
                ColumnType::Json | ColumnType::Jsonb => (JSON, false),
                ColumnType::Date
                | ColumnType::DateTime
                | ColumnType::Time
                | ColumnType::Timestamp
                | ColumnType::Enum => (STRING, false),
                ColumnType::Unknown(raw) => {
                    warn!(
                        table = %table,
                        column = %column.name,
                        source_type = %raw,
                        "unknown column type, falling back to string()"
                    );
                    (STRING, true)
                }
            }
        };
        TypeExpr {
            base: base.to_string(),
            optional: false,
            fallback,
        }
    }
}

/// Optionality comes from the column, so an override never carries it.
fn normalize_override(raw: &str) -> String {
    let mut raw = raw.trim();
    while let Some(base) = raw.strip_suffix(".optional()") {
        raw = base.trim_end();
    }
    if raw.is_empty() {
        STRING.to_string()
    } else if raw.ends_with(')') {
        raw.to_string()
    } else {
        format!("{}()", raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, ty: &str, nullable: bool) -> Column {
        Column {
            name: name.into(),
            column_type: ColumnType::from(ty),
            nullable,
            is_enum: false,
            comment: None,
            table: "tasks".into(),
        }
    }

    fn mapper() -> TypeMapper {
        let mut overrides = BTreeMap::new();
        overrides.insert("tasks.position".to_string(), "number".to_string());
        overrides.insert("position".to_string(), "string()".to_string());
        overrides.insert("lock_version".to_string(), "number()".to_string());
        TypeMapper::with_overrides(overrides)
    }

    #[test]
    fn defaults_follow_source_type() {
        let m = mapper();
        assert_eq!(m.map("tasks", &col("title", "string", false)).to_string(), "string()");
        assert_eq!(m.map("tasks", &col("count", "bigint", false)).to_string(), "number()");
        assert_eq!(m.map("tasks", &col("price", "decimal", false)).to_string(), "number()");
        assert_eq!(m.map("tasks", &col("done", "boolean", false)).to_string(), "boolean()");
        assert_eq!(m.map("tasks", &col("meta", "jsonb", false)).to_string(), "json()");
        assert_eq!(m.map("tasks", &col("due_at", "datetime", false)).to_string(), "string()");
    }

    #[test]
    fn nullable_columns_are_optional() {
        let m = mapper();
        assert_eq!(
            m.map("tasks", &col("notes", "text", true)).to_string(),
            "string().optional()"
        );
    }

    #[test]
    fn primary_key_is_never_optional() {
        let m = mapper();
        let pk = col("id", "uuid", true);
        assert_eq!(m.map_primary_key("tasks", &pk).to_string(), "string()");
        assert_eq!(m.map_in_table("tasks", "id", &pk).to_string(), "string()");
    }

    #[test]
    fn qualified_override_wins_over_bare_name() {
        let m = mapper();
        assert_eq!(m.map("tasks", &col("position", "integer", false)).to_string(), "number()");
        assert_eq!(
            m.map("projects", &col("position", "integer", false)).to_string(),
            "string()"
        );
        assert_eq!(
            m.map("projects", &col("lock_version", "integer", true)).to_string(),
            "number().optional()"
        );
    }

    #[test]
    fn optional_suffix_in_override_is_dropped() {
        let mut overrides = BTreeMap::new();
        overrides.insert("id".to_string(), "string().optional()".to_string());
        overrides.insert("notes".to_string(), "json.optional().optional()".to_string());
        let m = TypeMapper::with_overrides(overrides);
        assert_eq!(m.map_primary_key("tasks", &col("id", "integer", true)).to_string(), "string()");
        assert_eq!(m.map("tasks", &col("notes", "text", false)).to_string(), "json()");
        assert_eq!(
            m.map("tasks", &col("notes", "text", true)).to_string(),
            "json().optional()"
        );
    }

    #[test]
    fn enum_integers_map_to_string() {
        let m = mapper();
        let mut status = col("status", "integer", false);
        status.is_enum = true;
        assert_eq!(m.map("tasks", &status).to_string(), "string()");
    }

    #[test]
    fn unknown_types_fall_back_to_string() {
        let m = mapper();
        let expr = m.map("tasks", &col("shape", "geometry", false));
        assert_eq!(expr.to_string(), "string()");
        assert!(expr.fallback);
    }

    #[test]
    fn builder_name_is_extracted() {
        let m = mapper();
        assert_eq!(m.map("tasks", &col("notes", "text", true)).builder(), "string");
        let custom = TypeExpr {
            base: "enumeration<'a' | 'b'>()".into(),
            optional: false,
            fallback: false,
        };
        assert_eq!(custom.builder(), "enumeration");
    }
}
