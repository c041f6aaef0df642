//! SQL schema for the collection registry (C2) and the relational metadata
//! tables (C3, spec §6.2).

/// Tracks every vector collection's name and fixed dimension; the actual
/// points live in a per-collection `vec_<name>` table created on demand.
pub const CREATE_VECTOR_COLLECTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS vector_collections (
    name TEXT PRIMARY KEY NOT NULL,
    dimension INTEGER NOT NULL,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
)
"#;

pub const CREATE_INDEXED_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS indexed_files (
    project TEXT NOT NULL,
    file_path TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    mtime TEXT NOT NULL,
    language TEXT,
    unit_count INTEGER NOT NULL,
    indexed_at TEXT NOT NULL,
    PRIMARY KEY (project, file_path)
)
"#;

pub const CREATE_GIT_INDEX_STATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS git_index_state (
    repo_path TEXT PRIMARY KEY NOT NULL,
    last_indexed_sha TEXT,
    last_indexed_at TEXT,
    commit_count INTEGER NOT NULL DEFAULT 0
)
"#;

pub const CREATE_SETTINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;

/// Name of the per-collection vector table. Collection names are drawn from
/// the fixed set in `learning_memory_core::types` (`memories`, `code_units`,
/// the four `ghap_*` axes, ...), never from unsanitized user input.
#[must_use]
pub fn vector_table_name(collection: &str) -> String {
    format!("vec_{collection}")
}

/// `CREATE TABLE` for a collection's point storage. `dimension` picks the
/// width of the `F32_BLOB` column, per libsql's native vector support.
#[must_use]
pub fn create_vector_table_sql(collection: &str, dimension: usize) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY NOT NULL,
            embedding F32_BLOB({dimension}) NOT NULL,
            payload TEXT NOT NULL
        )
        "#,
        table = vector_table_name(collection),
    )
}

#[must_use]
pub fn drop_vector_table_sql(collection: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", vector_table_name(collection))
}
