mod common;

use common::{fixture, pipeline, read, without_table};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;
use zerogen::changes::MarkerKind;
use zerogen::ir::{BelongsToDecl, IntrospectionResult, RawColumn, RawTable, TableAssociations};
use zerogen::{generate_schema, GeneratorConfig};

fn raw_table(name: &str, columns: &[(&str, &str)]) -> RawTable {
    RawTable {
        name: name.into(),
        primary_key: "id".into(),
        columns: columns
            .iter()
            .map(|(name, ty)| RawColumn {
                name: name.to_string(),
                column_type: (*ty).into(),
                nullable: false,
                is_enum: false,
                comment: None,
            })
            .collect(),
    }
}

fn two_tables() -> IntrospectionResult {
    IntrospectionResult {
        tables: vec![
            raw_table("projects", &[("id", "uuid"), ("name", "string")]),
            raw_table("users", &[("id", "uuid"), ("email", "string")]),
        ],
        relationships: vec![],
    }
}

#[test]
fn added_table_is_reported_with_its_edge() {
    let dir = tempdir().unwrap();
    let first = pipeline(two_tables(), GeneratorConfig::default(), dir.path()).execute(None);
    assert!(first.success);

    let mut raw = two_tables();
    raw.tables.push(raw_table(
        "tasks",
        &[("id", "uuid"), ("project_id", "uuid"), ("title", "text")],
    ));
    raw.relationships.push(TableAssociations {
        table: "tasks".into(),
        belongs_to: vec![BelongsToDecl {
            name: "project".into(),
            ..Default::default()
        }],
        ..Default::default()
    });
    let second = pipeline(raw, GeneratorConfig::default(), dir.path()).execute(None);
    assert!(second.success);
    assert_eq!(second.generated_models.len(), 3);

    let changes = second.changes.unwrap();
    assert_eq!(changes.new_tables, ["tasks"]);
    assert_eq!(changes.new_relationships, ["tasks.project"]);
    assert!(changes.removed_tables.is_empty());
    assert!(changes.removed_relationships.is_empty());
    assert!(!changes.hand_edited);

    let schema = read(dir.path(), "schema.ts");
    assert_eq!(schema.matches(" = table('").count(), 3);
    assert!(schema.contains(
        "  project: one({ sourceField: ['project_id'], destField: ['id'], destSchema: projects }),\n"
    ));
    let report = read(dir.path(), "schema.changes.md");
    assert!(report.contains("- NEW TABLES: tasks\n"));
    assert!(report.contains("- NEW RELATIONSHIPS: tasks.project\n"));
}

#[test]
fn removed_table_takes_its_edges_along() {
    let dir = tempdir().unwrap();
    pipeline(fixture(), GeneratorConfig::default(), dir.path()).execute(None);
    let result = pipeline(
        without_table(fixture(), "documents"),
        GeneratorConfig::default(),
        dir.path(),
    )
    .execute(None);
    assert!(result.success);

    let changes = result.changes.unwrap();
    assert_eq!(changes.removed_tables, ["documents"]);
    assert_eq!(
        changes.removed_relationships,
        ["comments.commentableDocument", "documents.project", "projects.documents"]
    );
    assert!(changes.new_tables.is_empty());
    assert!(changes.new_relationships.is_empty());
    assert!(read(dir.path(), "schema.ts")
        .contains("  // documents: skipped, target table documents is not in the schema\n"));
}

#[test]
fn column_only_change_is_still_a_change() {
    let dir = tempdir().unwrap();
    pipeline(fixture(), GeneratorConfig::default(), dir.path()).execute(None);

    let mut raw = fixture();
    raw.tables
        .iter_mut()
        .find(|t| t.name == "users")
        .unwrap()
        .columns
        .push(RawColumn {
            name: "last_seen_at".into(),
            column_type: "timestamp".into(),
            nullable: true,
            is_enum: false,
            comment: None,
        });
    let result = pipeline(raw, GeneratorConfig::default(), dir.path()).execute(None);
    let changes = result.changes.unwrap();
    assert!(changes.has_changes());
    assert!(!changes.has_structural_changes());
    assert_eq!(
        changes.migration_notes(),
        ["CONTENT CHANGES: tables and relationships are unchanged"]
    );
    assert!(read(dir.path(), "schema.ts").contains("    last_seen_at: string().optional(),\n"));
}

#[test]
fn hand_edits_are_reported_then_overwritten() {
    let dir = tempdir().unwrap();
    pipeline(fixture(), GeneratorConfig::default(), dir.path()).execute(None);

    let path = dir.path().join("schema.ts");
    let edited = fs::read_to_string(&path)
        .unwrap()
        .replace(
            "const users = table",
            "// keep in sync with billing\nconst users = table",
        )
        + "export const permissions = definePermissions(schema, () => ({}));\n";
    fs::write(&path, edited).unwrap();

    let result = pipeline(fixture(), GeneratorConfig::default(), dir.path()).execute(None);
    assert!(result.success);
    let changes = result.changes.unwrap();
    assert!(changes.hand_edited);
    assert!(!changes.has_structural_changes());
    assert_eq!(
        changes
            .customizations
            .iter()
            .map(|m| (m.kind, m.text.as_str()))
            .collect::<Vec<_>>(),
        [
            (MarkerKind::Comment, "// keep in sync with billing"),
            (
                MarkerKind::Export,
                "export const permissions = definePermissions(schema, () => ({}));"
            ),
        ]
    );
    assert!(result.warnings.iter().any(|w| w.starts_with("Customization in schema.ts line ")
        && w.ends_with("will be overwritten: // keep in sync with billing")));

    let notes = changes.migration_notes();
    assert!(notes.contains(&"PREVIOUS FILE WAS EDITED SINCE IT WAS GENERATED".to_string()));
    assert!(notes
        .iter()
        .any(|n| n.starts_with("CUSTOMIZATIONS WILL BE OVERWRITTEN: line ")));

    let schema = read(dir.path(), "schema.ts");
    assert!(!schema.contains("billing"));
    assert!(!schema.contains("permissions"));
    let report = read(dir.path(), "schema.changes.md");
    assert!(report.contains("## Customizations\n"));
    assert!(report.contains("(comment): `// keep in sync with billing`"));
}

#[test]
fn legacy_file_without_header_has_no_false_customizations() {
    let dir = tempdir().unwrap();
    let body = generate_schema(fixture(), &GeneratorConfig::default()).unwrap();
    fs::write(dir.path().join("schema.ts"), &body).unwrap();

    let result = pipeline(fixture(), GeneratorConfig::default(), dir.path()).execute(None);
    let changes = result.changes.unwrap();
    assert!(changes.previous_exists);
    assert!(!changes.hand_edited);
    assert!(changes.customizations.is_empty());
    assert!(!changes.has_structural_changes());
    assert!(result
        .warnings
        .iter()
        .all(|w| !w.starts_with("Customization")));
}

#[test]
fn missing_report_file_setting_disables_report() {
    let dir = tempdir().unwrap();
    let config = GeneratorConfig {
        report_file: None,
        schema_file: "zero-schema.gen.ts".into(),
        ..Default::default()
    };
    let result = pipeline(fixture(), config, dir.path()).execute(None);
    assert_eq!(result.generated_files, [dir.path().join("zero-schema.gen.ts")]);
    assert!(!dir.path().join("schema.changes.md").exists());
}
