/// Version written to `PRAGMA user_version`; bump when the schema changes.
pub const SCHEMA_VERSION: i64 = 1;

/// Schema for the local tag store.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
/// Deleting a tag cascades to its children through the self-referencing
/// foreign key, which matches the server's subtree delete.
pub const INITIAL_SCHEMA: &str = r#"
-- Tags table: one row per tag, scoped to a review
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    review_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    parent_tag INTEGER REFERENCES tags(id) ON DELETE CASCADE
);

-- Junction table: which studies are classified under which tag
CREATE TABLE IF NOT EXISTS study_tags (
    study_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (study_id, tag_id),
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

-- Index for listing a review's tags
CREATE INDEX IF NOT EXISTS idx_tags_review ON tags(review_id);

-- Index for walking children and cascading deletes
CREATE INDEX IF NOT EXISTS idx_tags_parent ON tags(parent_tag);

-- Index for per-tag study counts
CREATE INDEX IF NOT EXISTS idx_study_tags_tag ON study_tags(tag_id);
"#;
