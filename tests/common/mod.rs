#![allow(dead_code)]

use std::path::Path;
use zerogen::ir::IntrospectionResult;
use zerogen::{load_introspection, GenerationOptions, GeneratorConfig, Pipeline};

pub const FIXTURE: &str = "tests/fixtures/schema.json";

pub fn fixture() -> IntrospectionResult {
    load_introspection(Path::new(FIXTURE)).unwrap()
}

pub fn options(dir: &Path) -> GenerationOptions {
    GenerationOptions {
        output_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

pub fn pipeline(raw: IntrospectionResult, config: GeneratorConfig, dir: &Path) -> Pipeline {
    Pipeline::from_config(config, Box::new(raw))
        .unwrap()
        .with_options(options(dir))
}

pub fn read(dir: &Path, file: &str) -> String {
    std::fs::read_to_string(dir.join(file)).unwrap()
}

/// Drop a table and every association declared on it.
pub fn without_table(mut raw: IntrospectionResult, table: &str) -> IntrospectionResult {
    raw.tables.retain(|t| t.name != table);
    raw.relationships.retain(|r| r.table != table);
    raw
}
