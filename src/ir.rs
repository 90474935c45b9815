use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw result of schema introspection, as handed over by an [`Introspector`].
///
/// [`Introspector`]: crate::introspect::Introspector
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct IntrospectionResult {
    #[serde(default)]
    pub tables: Vec<RawTable>,
    #[serde(default)]
    pub relationships: Vec<TableAssociations>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RawTable {
    pub name: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub columns: Vec<RawColumn>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RawColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, rename = "enum")]
    pub is_enum: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Associations declared by the ORM layer for a single table.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TableAssociations {
    pub table: String,
    #[serde(default)]
    pub belongs_to: Vec<BelongsToDecl>,
    #[serde(default)]
    pub has_many: Vec<HasManyDecl>,
    #[serde(default)]
    pub has_one: Vec<HasOneDecl>,
    #[serde(default)]
    pub polymorphic: Vec<PolymorphicDecl>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BelongsToDecl {
    pub name: String,
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default, alias = "table")]
    pub target_table: Option<String>,
    /// ORM class name (`"Project"`), used when no table is given.
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub polymorphic: bool,
    #[serde(default)]
    pub foreign_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct HasManyDecl {
    pub name: String,
    #[serde(default, alias = "table")]
    pub target_table: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub through: Option<String>,
    /// Association on the intermediate table that a through-association follows.
    #[serde(default)]
    pub source: Option<String>,
}

pub type HasOneDecl = HasManyDecl;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PolymorphicDecl {
    pub name: String,
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub foreign_type: Option<String>,
}

/// Source column type as reported by introspection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Uuid,
    String,
    Text,
    Integer,
    BigInteger,
    Decimal,
    Float,
    Boolean,
    Date,
    DateTime,
    Time,
    Timestamp,
    Json,
    Jsonb,
    Enum,
    Unknown(String),
}

impl ColumnType {
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::Uuid => "uuid",
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::BigInteger => "bigint",
            ColumnType::Decimal => "decimal",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Time => "time",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
            ColumnType::Jsonb => "jsonb",
            ColumnType::Enum => "enum",
            ColumnType::Unknown(raw) => raw,
        }
    }
}

impl From<&str> for ColumnType {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "uuid" | "identifier" => ColumnType::Uuid,
            "string" | "varchar" | "character varying" | "citext" => ColumnType::String,
            "text" => ColumnType::Text,
            "integer" | "int" | "smallint" => ColumnType::Integer,
            "bigint" | "big_integer" => ColumnType::BigInteger,
            "decimal" | "numeric" => ColumnType::Decimal,
            "float" | "double" | "real" => ColumnType::Float,
            "boolean" | "bool" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "datetime" => ColumnType::DateTime,
            "time" => ColumnType::Time,
            "timestamp" | "timestamptz" => ColumnType::Timestamp,
            "json" => ColumnType::Json,
            "jsonb" => ColumnType::Jsonb,
            "enum" => ColumnType::Enum,
            _ => ColumnType::Unknown(raw.to_string()),
        }
    }
}

impl From<String> for ColumnType {
    fn from(raw: String) -> Self {
        ColumnType::from(raw.as_str())
    }
}

impl From<ColumnType> for String {
    fn from(ty: ColumnType) -> Self {
        ty.as_str().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub is_enum: bool,
    pub comment: Option<String>,
    pub table: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub name: String,
    pub primary_key: String,
    pub columns: Vec<Column>,
    pub associations: Vec<Association>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// Canonical, normalized schema. Tables are kept sorted by name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    pub tables: IndexMap<String, Table>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

/// A normalized association declaration with conventions already applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Association {
    BelongsTo {
        name: String,
        foreign_key: String,
        target_table: String,
    },
    HasMany {
        name: String,
        target_table: String,
        foreign_key: String,
        through: Option<String>,
        source: Option<String>,
    },
    HasOne {
        name: String,
        target_table: String,
        foreign_key: String,
        through: Option<String>,
        source: Option<String>,
    },
    Polymorphic {
        name: String,
        foreign_key: String,
        foreign_type: String,
    },
}

impl Association {
    pub fn name(&self) -> &str {
        match self {
            Association::BelongsTo { name, .. }
            | Association::HasMany { name, .. }
            | Association::HasOne { name, .. }
            | Association::Polymorphic { name, .. } => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Association::BelongsTo { .. } => "belongs_to",
            Association::HasMany { .. } => "has_many",
            Association::HasOne { .. } => "has_one",
            Association::Polymorphic { .. } => "polymorphic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

impl Cardinality {
    pub fn builder(self) -> &'static str {
        match self {
            Cardinality::One => "one",
            Cardinality::Many => "many",
        }
    }
}

/// A resolved relationship entry in the target schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Relationship {
    Edge {
        name: String,
        cardinality: Cardinality,
        source_field: String,
        dest_field: String,
        dest_table: String,
    },
    /// Documentation-only entry; `lines` are rendered as `//` comments.
    Comment { name: String, lines: Vec<String> },
}

impl Relationship {
    pub fn name(&self) -> &str {
        match self {
            Relationship::Edge { name, .. } | Relationship::Comment { name, .. } => name,
        }
    }

    pub fn is_edge(&self) -> bool {
        matches!(self, Relationship::Edge { .. })
    }
}
