use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "zerogen.toml";

/// Generator settings, loaded once and shared read-only by every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Schema document file name, relative to the output directory.
    pub schema_file: String,
    /// Optional type-definitions document file name.
    pub types_file: Option<String>,
    /// Change report file name; `None` disables the report file.
    pub report_file: Option<String>,
    pub exclude_tables: Vec<String>,
    /// Keyed by `"table.column"` or bare `"column"`; values are type expressions.
    pub type_overrides: BTreeMap<String, String>,
    /// Polymorphic association name to candidate target tables.
    pub polymorphic: BTreeMap<String, Vec<String>>,
    /// Self-referential belongs-to names that get an inverse children edge.
    pub hierarchy_associations: Vec<String>,
    pub children_association: String,
    pub formatter: Option<FormatterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let mut polymorphic = BTreeMap::new();
        polymorphic.insert(
            "commentable".to_string(),
            vec![
                "documents".to_string(),
                "tasks".to_string(),
                "projects".to_string(),
            ],
        );
        GeneratorConfig {
            schema_file: "schema.ts".into(),
            types_file: None,
            report_file: Some("schema.changes.md".into()),
            exclude_tables: vec!["schema_migrations".into(), "ar_internal_metadata".into()],
            type_overrides: BTreeMap::new(),
            polymorphic,
            hierarchy_associations: vec!["parent".into()],
            children_association: "children".into(),
            formatter: None,
        }
    }
}

impl GeneratorConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load `zerogen.toml` from `dir` if present, defaults otherwise.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn is_excluded(&self, table: &str) -> bool {
        self.exclude_tables.iter().any(|t| t == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = GeneratorConfig::from_toml(
            "types_file = 'schema-types.ts'\n\n[type_overrides]\n\"tasks.position\" = 'number()'\n",
        )
        .unwrap();
        assert_eq!(cfg.schema_file, "schema.ts");
        assert_eq!(cfg.types_file.as_deref(), Some("schema-types.ts"));
        assert_eq!(cfg.type_overrides["tasks.position"], "number()");
        assert!(cfg.polymorphic.contains_key("commentable"));
        assert!(cfg.is_excluded("schema_migrations"));
    }

    #[test]
    fn formatter_section_parses() {
        let cfg = GeneratorConfig::from_toml(
            "[formatter]\ncommand = 'prettier'\nargs = ['--stdin-filepath', 'schema.ts']\n",
        )
        .unwrap();
        let fmt = cfg.formatter.unwrap();
        assert_eq!(fmt.command, "prettier");
        assert_eq!(fmt.args.len(), 2);
    }
}
