use crate::codegen::naming::{object_key, relationships_ident, table_ident};
use crate::codegen::type_mapper::TypeMapper;
use crate::codegen::RenderedTable;
use crate::ir::{Relationship, Table};
use std::collections::BTreeSet;

pub const ZERO_MODULE: &str = "@rocicorp/zero";

/// Exported names the schema document always carries.
pub const KNOWN_EXPORTS: &[&str] = &["schema", "Schema"];

/// Full-line comments the generator emits in the document body.
pub const GENERATED_COMMENT_PATTERNS: &[&str] = &[
    r"^\s*// [A-Za-z_$][\w$]*: (skipped, |has_many through |has_one through |polymorphic on |inverse of )",
    r"^\s*//   query with \.related\(",
    r"^\s*//   [A-Za-z_$][\w$]* is not available as a relationship",
];

/// Pattern matching the generator's own import line.
pub const IMPORT_PATTERN: &str = r"^import \{[\w\s,]*\} from '@rocicorp/zero';\s*$";

pub fn render_columns(
    table: &Table,
    type_mapper: &TypeMapper,
    builders: &mut BTreeSet<String>,
    warnings: &mut Vec<String>,
) -> String {
    builders.insert("table".to_string());

    let mut out = String::new();
    out.push_str(&format!(
        "const {} = table('{}')\n",
        table_ident(&table.name),
        escape_single(&table.name)
    ));
    out.push_str("  .columns({\n");
    for column in &table.columns {
        let expr = type_mapper.map_in_table(&table.name, &table.primary_key, column);
        if expr.fallback {
            warnings.push(format!(
                "Table {}: column {} has unknown type '{}', mapped to string()",
                table.name, column.name, column.column_type
            ));
        }
        builders.insert(expr.builder().to_string());
        out.push_str(&format!("    {}: {},", object_key(&column.name), expr));
        if let Some(comment) = column.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            out.push_str(&format!(" // {}", single_line(comment)));
        }
        out.push('\n');
    }
    out.push_str("  })\n");
    out.push_str(&format!(
        "  .primaryKey('{}');\n",
        escape_single(&table.primary_key)
    ));
    out
}

pub fn render_relationships(table: &Table, entries: &[Relationship]) -> String {
    let mut params = BTreeSet::new();
    for entry in entries {
        if let Relationship::Edge { cardinality, .. } = entry {
            params.insert(cardinality.builder());
        }
    }
    let params: Vec<_> = params.into_iter().collect();

    let mut out = String::new();
    out.push_str(&format!(
        "const {} = relationships({}, ({{ {} }}) => ({{\n",
        relationships_ident(&table.name),
        table_ident(&table.name),
        params.join(", ")
    ));
    for entry in entries {
        match entry {
            Relationship::Edge {
                name,
                cardinality,
                source_field,
                dest_field,
                dest_table,
            } => {
                out.push_str(&format!(
                    "  {}: {}({{ sourceField: ['{}'], destField: ['{}'], destSchema: {} }}),\n",
                    object_key(name),
                    cardinality.builder(),
                    escape_single(source_field),
                    escape_single(dest_field),
                    table_ident(dest_table)
                ));
            }
            Relationship::Comment { .. } => {
                out.push_str(&render_comments(std::slice::from_ref(entry), "  "));
            }
        }
    }
    out.push_str("}));\n");
    out
}

/// Render the comment lines of every comment entry in `entries`.
pub fn render_comments(entries: &[Relationship], indent: &str) -> String {
    let mut out = String::new();
    for entry in entries {
        if let Relationship::Comment { lines, .. } = entry {
            for line in lines {
                out.push_str(&format!("{}// {}\n", indent, line));
            }
        }
    }
    out
}

pub fn render_document(tables: &[RenderedTable]) -> String {
    let mut builders: BTreeSet<&str> = BTreeSet::new();
    builders.insert("createSchema");
    for t in tables {
        builders.extend(t.builders.iter().map(String::as_str));
    }

    let mut out = String::new();
    out.push_str(&format!(
        "import {{ {} }} from '{}';\n\n",
        builders.into_iter().collect::<Vec<_>>().join(", "),
        ZERO_MODULE
    ));

    for t in tables {
        out.push_str(&t.columns_block);
        out.push('\n');
    }

    for t in tables {
        if let Some(block) = t.relationships_block.as_ref().or(t.comment_block.as_ref()) {
            out.push_str(block);
            out.push('\n');
        }
    }

    out.push_str("export const schema = createSchema({\n");
    out.push_str(&format!(
        "  tables: [{}],\n",
        tables.iter().map(|t| t.ident.as_str()).collect::<Vec<_>>().join(", ")
    ));
    let rel_idents: Vec<_> = tables
        .iter()
        .filter_map(|t| t.relationships_ident.as_deref())
        .collect();
    if !rel_idents.is_empty() {
        out.push_str(&format!("  relationships: [{}],\n", rel_idents.join(", ")));
    }
    out.push_str("});\n\n");
    out.push_str("export type Schema = typeof schema;\n");
    out
}

fn escape_single(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
