use thiserror::Error;

/// Errors that abort the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("schema introspection failed: {0}")]
    Introspection(anyhow::Error),
    #[error("duplicate table name: {0}")]
    DuplicateTable(String),
    #[error("table '{0}' not found in schema")]
    UnknownTable(String),
    #[error("failed to write generated output: {0}")]
    Output(anyhow::Error),
}

/// Cause-chain lines kept in a run diagnostic.
pub const DIAGNOSTIC_LINES: usize = 10;

impl PipelineError {
    /// Cause chain of the underlying error, one cause per line, at most `max_lines`.
    pub fn diagnostic(&self, max_lines: usize) -> Option<String> {
        let mut lines: Vec<String> = match self {
            PipelineError::Introspection(err) | PipelineError::Output(err) => err
                .chain()
                .enumerate()
                .map(|(i, cause)| format!("{}: {}", i, cause))
                .collect(),
            other => vec![format!("0: {}", other)],
        };
        if max_lines == 0 {
            return None;
        }
        if lines.len() > max_lines {
            let dropped = lines.len() - max_lines;
            lines.truncate(max_lines);
            lines.push(format!("... {} more", dropped));
        }
        Some(lines.join("\n"))
    }
}

/// Errors confined to a single table; sibling tables keep generating.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("unmapped foreign key: {association} uses {table}.{column}, which does not exist")]
    UnmappedForeignKey {
        association: String,
        table: String,
        column: String,
    },
    #[error("relationship '{0}' is declared more than once")]
    DuplicateRelationship(String),
    #[error("{association} goes through '{through}', which is not an association on this table")]
    UnknownThrough { association: String, through: String },
    #[error("table has no columns")]
    NoColumns,
    #[error("primary key '{0}' is not a column of the table")]
    MissingPrimaryKey(String),
    #[error("identifier {ident} is already used by table {table}")]
    DuplicateIdentifier { ident: String, table: String },
}
