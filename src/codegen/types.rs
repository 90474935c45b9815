//! Standalone type-definitions document: one structural type per table.
//! It never imports the schema document, so consumers can use either alone.

use crate::codegen::naming::{class_name, object_key};
use crate::codegen::type_mapper::TypeMapper;
use crate::codegen::RenderedTable;
use crate::ir::Table;

pub fn render_type(table: &Table, type_mapper: &TypeMapper) -> String {
    let mut out = format!("export type {} = {{\n", class_name(&table.name));
    for column in &table.columns {
        let expr = type_mapper.map_in_table(&table.name, &table.primary_key, column);
        let mut ts_type = ts_type_for(expr.builder()).to_string();
        if expr.optional {
            ts_type.push_str(" | null");
        }
        out.push_str(&format!("  {}: {};\n", object_key(&column.name), ts_type));
    }
    out.push_str("};\n");
    out
}

fn ts_type_for(builder: &str) -> &'static str {
    match builder {
        "string" | "enumeration" => "string",
        "number" => "number",
        "boolean" => "boolean",
        _ => "unknown",
    }
}

pub fn render_document(tables: &[RenderedTable]) -> String {
    tables
        .iter()
        .map(|t| t.type_block.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
