use heck::{ToLowerCamelCase, ToUpperCamelCase};

const TS_RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "let", "static", "yield", "await", "implements",
    "interface", "package", "private", "protected", "public",
];

/// Names the schema document itself imports or declares.
const DOCUMENT_NAMES: &[&str] = &[
    "table", "relationships", "createSchema", "one", "many", "string", "number", "boolean", "json",
    "enumeration", "schema", "Schema",
];

pub fn singularize(word: &str) -> String {
    pluralizer::pluralize(word, 1, false)
}

pub fn pluralize(word: &str) -> String {
    pluralizer::pluralize(word, 2, false)
}

/// `"task_comments"` -> `"TaskComment"`
pub fn class_name(table: &str) -> String {
    singularize(table).to_upper_camel_case()
}

/// Identifier of the `table(...)` constant for a table.
pub fn table_ident(table: &str) -> String {
    let ident = table.to_lower_camel_case();
    if ident.is_empty()
        || TS_RESERVED.contains(&ident.as_str())
        || DOCUMENT_NAMES.contains(&ident.as_str())
    {
        format!("{}Table", ident)
    } else {
        ident
    }
}

pub fn relationships_ident(table: &str) -> String {
    format!("{}Relationships", table.to_lower_camel_case())
}

/// Edge name for one polymorphic candidate: `commentable` + `documents` -> `commentableDocument`.
pub fn polymorphic_edge_name(association: &str, candidate_table: &str) -> String {
    format!("{}{}", association, class_name(candidate_table))
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Object key, quoted when it is not a plain identifier.
pub fn object_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}
