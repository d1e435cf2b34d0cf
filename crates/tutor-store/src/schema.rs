//! SQL schema for the word-list document store.
//!
//! A file row is the persistence unit: its word list is one JSON column,
//! and every word mutation rewrites the whole row.

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    category    TEXT NOT NULL,
    words_json  TEXT NOT NULL DEFAULT '[]',
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER
);

CREATE INDEX IF NOT EXISTS idx_files_category ON files(category);
CREATE INDEX IF NOT EXISTS idx_files_category_name ON files(category, name);

CREATE TABLE IF NOT EXISTS actions (
    id                       INTEGER PRIMARY KEY AUTOINCREMENT,
    name                     TEXT NOT NULL UNIQUE,
    icon                     TEXT,
    groups_json              TEXT NOT NULL DEFAULT '[]',
    role_prompt              TEXT NOT NULL DEFAULT '',
    command_prompt           TEXT NOT NULL DEFAULT '',
    model                    TEXT,
    output_rendering_format  TEXT NOT NULL DEFAULT 'markdown',
    mode                     TEXT NOT NULL DEFAULT 'built-in',
    created_at               INTEGER NOT NULL,
    updated_at               INTEGER NOT NULL
);
"#;
