mod common;

use common::fixture;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;
use zerogen::analysis::normalize;
use zerogen::codegen::relationships::RelationshipProcessor;
use zerogen::ir::{Cardinality, HasManyDecl, IntrospectionResult, Relationship, Schema};
use zerogen::{GeneratorConfig, TableError};

fn schema_of(raw: IntrospectionResult) -> Schema {
    normalize(raw, &GeneratorConfig::default()).unwrap().0
}

fn resolve(schema: &Schema, table: &str) -> Result<Vec<Relationship>, TableError> {
    RelationshipProcessor::new(Arc::new(GeneratorConfig::default()))
        .resolve(schema.table(table).unwrap(), schema)
}

fn edge(name: &str, cardinality: Cardinality, source: &str, dest: &str, table: &str) -> Relationship {
    Relationship::Edge {
        name: name.into(),
        cardinality,
        source_field: source.into(),
        dest_field: dest.into(),
        dest_table: table.into(),
    }
}

fn comment(name: &str, lines: &[&str]) -> Relationship {
    Relationship::Comment {
        name: name.into(),
        lines: lines.iter().map(|l| l.to_string()).collect(),
    }
}

#[test]
fn missing_foreign_key_becomes_skip_comment() {
    let schema = schema_of(fixture());
    let rels = resolve(&schema, "notes").unwrap();
    assert_eq!(
        rels,
        [
            edge("project", Cardinality::One, "project_id", "id", "projects"),
            comment(
                "comments",
                &["comments: skipped, foreign key comments.note_ref does not exist"]
            ),
        ]
    );
}

#[test]
fn parent_pointer_synthesizes_children() {
    let schema = schema_of(fixture());
    let rels = resolve(&schema, "tasks").unwrap();
    assert_eq!(
        rels,
        [
            edge("project", Cardinality::One, "project_id", "id", "projects"),
            edge("parent", Cardinality::One, "parent_id", "id", "tasks"),
            comment("children", &["children: inverse of parent (synthesized)"]),
            edge("children", Cardinality::Many, "id", "parent_id", "tasks"),
            edge("assignments", Cardinality::Many, "id", "task_id", "assignments"),
            comment(
                "users",
                &[
                    "users: has_many through assignments; Zero relationships are single-hop",
                    "  query with .related('assignments', (q) => q.related('user'))",
                ]
            ),
        ]
    );
}

#[test]
fn declared_children_are_not_duplicated() {
    let mut raw = fixture();
    raw.relationships
        .iter_mut()
        .find(|r| r.table == "tasks")
        .unwrap()
        .has_many
        .push(HasManyDecl {
            name: "children".into(),
            class_name: Some("Task".into()),
            foreign_key: Some("parent_id".into()),
            ..Default::default()
        });
    let schema = schema_of(raw);
    let rels = resolve(&schema, "tasks").unwrap();
    let children: Vec<_> = rels.iter().filter(|r| r.name() == "children").collect();
    assert_eq!(
        children,
        [&edge("children", Cardinality::Many, "id", "parent_id", "tasks")]
    );
}

#[test]
fn through_associations_never_become_edges() {
    let schema = schema_of(fixture());
    for table in schema.table_names() {
        let table = schema.table(table).unwrap();
        let rels = resolve(&schema, &table.name).unwrap();
        for assoc in &table.associations {
            let through = match assoc {
                zerogen::ir::Association::HasMany { through, .. }
                | zerogen::ir::Association::HasOne { through, .. } => through.is_some(),
                _ => false,
            };
            if through {
                assert!(
                    rels.iter().all(|r| !(r.is_edge() && r.name() == assoc.name())),
                    "{}.{} produced an edge",
                    table.name,
                    assoc.name()
                );
            }
        }
    }
    let projects = resolve(&schema, "projects").unwrap();
    assert!(projects.contains(&comment(
        "assignments",
        &[
            "assignments: has_many through tasks; Zero relationships are single-hop",
            "  query with .related('tasks', (q) => q.related('assignments'))",
        ]
    )));
}

#[test]
fn to_many_edges_reference_existing_columns() {
    let schema = schema_of(fixture());
    for name in schema.table_names() {
        for rel in resolve(&schema, name).unwrap() {
            if let Relationship::Edge {
                source_field,
                dest_field,
                dest_table,
                ..
            } = &rel
            {
                let target = schema.table(dest_table).unwrap();
                assert!(target.has_column(dest_field), "{}: {:?}", name, rel);
                assert!(schema.table(name).unwrap().has_column(source_field), "{}: {:?}", name, rel);
            }
        }
    }
}

#[test]
fn polymorphic_belongs_to_fans_out() {
    let schema = schema_of(fixture());
    assert_eq!(
        resolve(&schema, "comments").unwrap(),
        [
            comment(
                "commentable",
                &["commentable: polymorphic on commentable_type; one edge per candidate, read the one matching the discriminator"]
            ),
            edge("commentableDocument", Cardinality::One, "commentable_id", "id", "documents"),
            edge("commentableTask", Cardinality::One, "commentable_id", "id", "tasks"),
            edge("commentableProject", Cardinality::One, "commentable_id", "id", "projects"),
        ]
    );
}

#[test]
fn polymorphic_without_candidates_is_documented() {
    let config = GeneratorConfig {
        polymorphic: BTreeMap::new(),
        ..Default::default()
    };
    let schema = schema_of(fixture());
    let rels = RelationshipProcessor::new(Arc::new(config))
        .resolve(schema.table("comments").unwrap(), &schema)
        .unwrap();
    assert_eq!(
        rels,
        [comment(
            "commentable",
            &["commentable: polymorphic on commentable_type; no known candidate tables, not generated"]
        )]
    );
}

#[test]
fn has_one_points_at_foreign_key_on_target() {
    let schema = schema_of(fixture());
    let rels = resolve(&schema, "users").unwrap();
    assert_eq!(
        rels,
        [
            edge("profile", Cardinality::One, "id", "user_id", "profiles"),
            edge("assignments", Cardinality::Many, "id", "user_id", "assignments"),
        ]
    );
}

#[test]
fn unknown_target_table_is_skipped() {
    let mut raw = fixture();
    raw.relationships
        .iter_mut()
        .find(|r| r.table == "projects")
        .unwrap()
        .has_many
        .push(HasManyDecl {
            name: "invoices".into(),
            ..Default::default()
        });
    let schema = schema_of(raw);
    let rels = resolve(&schema, "projects").unwrap();
    assert!(rels.contains(&comment(
        "invoices",
        &["invoices: skipped, target table invoices is not in the schema"]
    )));
}

#[test]
fn unknown_through_is_a_table_error() {
    let mut raw = fixture();
    raw.relationships
        .iter_mut()
        .find(|r| r.table == "users")
        .unwrap()
        .has_many
        .push(HasManyDecl {
            name: "tasks".into(),
            through: Some("memberships".into()),
            ..Default::default()
        });
    let schema = schema_of(raw);
    assert_eq!(
        resolve(&schema, "users"),
        Err(TableError::UnknownThrough {
            association: "tasks".into(),
            through: "memberships".into(),
        })
    );
}

#[test]
fn duplicate_association_names_are_a_table_error() {
    let mut raw = fixture();
    raw.relationships
        .iter_mut()
        .find(|r| r.table == "users")
        .unwrap()
        .has_many
        .push(HasManyDecl {
            name: "profile".into(),
            target_table: Some("profiles".into()),
            ..Default::default()
        });
    let schema = schema_of(raw);
    assert_eq!(
        resolve(&schema, "users"),
        Err(TableError::DuplicateRelationship("profile".into()))
    );
}

#[test]
fn through_a_skipped_association_has_no_query_path() {
    let mut raw = fixture();
    raw.relationships
        .iter_mut()
        .find(|r| r.table == "notes")
        .unwrap()
        .has_many
        .push(HasManyDecl {
            name: "authors".into(),
            through: Some("comments".into()),
            ..Default::default()
        });
    let schema = schema_of(raw);
    assert_eq!(
        resolve(&schema, "notes").unwrap(),
        [
            edge("project", Cardinality::One, "project_id", "id", "projects"),
            comment(
                "comments",
                &["comments: skipped, foreign key comments.note_ref does not exist"]
            ),
            comment(
                "authors",
                &[
                    "authors: has_many through comments; Zero relationships are single-hop",
                    "  comments is not available as a relationship, so there is no query path",
                ]
            ),
        ]
    );
}
