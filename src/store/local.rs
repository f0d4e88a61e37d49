//! SQLite-backed [`TagStore`] that mirrors the server contract.
//!
//! Unknown IDs answer with a 404 rejection, bad parents and cyclic moves with
//! a 400 rejection, and deletes cascade to the whole subtree.

use std::collections::{HashMap, HashSet};

use rusqlite::{OptionalExtension, params};

use super::{StoreError, TagStore};
use crate::db::Database;
use crate::models::{ParentTarget, ReviewId, Tag, TagCount, TagId};

struct TagRow {
    id: i64,
    name: String,
    description: String,
    parent_tag: Option<i64>,
}

impl TagRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            parent_tag: row.get(3)?,
        })
    }

    fn into_tag(self) -> Tag {
        let tag = Tag::new(TagId::new(self.id), self.name).with_description(self.description);
        match self.parent_tag {
            Some(parent) => tag.with_parent(TagId::new(parent)),
            None => tag,
        }
    }
}

/// Tag store persisted in a local SQLite database, scoped to one review.
pub struct LocalTagStore {
    db: Database,
    review_id: ReviewId,
}

impl LocalTagStore {
    /// Wraps an opened database for the given review.
    ///
    /// # Examples
    ///
    /// ```
    /// use sysrev::{Database, LocalTagStore, ParentTarget, ReviewId, TagStore};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let store = LocalTagStore::new(Database::in_memory()?, ReviewId::new(1));
    /// let tag = store.create_tag("Design", ParentTarget::Root)?;
    /// assert_eq!(store.list_tags()?[0].id(), tag.id());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(db: Database, review_id: ReviewId) -> Self {
        Self { db, review_id }
    }

    /// Returns the review this store is scoped to.
    pub fn review_id(&self) -> ReviewId {
        self.review_id
    }

    /// Classifies a study under a tag, feeding [`TagStore::tag_counts`].
    pub fn tag_study(&self, study_id: i64, tag: TagId) -> Result<(), StoreError> {
        self.require(tag)?;
        self.db.connection().execute(
            "INSERT OR IGNORE INTO study_tags (study_id, tag_id) VALUES (?1, ?2)",
            params![study_id, tag.get()],
        )?;
        Ok(())
    }

    fn fetch(&self, id: TagId) -> Result<Option<TagRow>, StoreError> {
        let row = self
            .db
            .connection()
            .query_row(
                "SELECT id, name, description, parent_tag FROM tags
                 WHERE id = ?1 AND review_id = ?2",
                params![id.get(), self.review_id.get()],
                TagRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn require(&self, id: TagId) -> Result<TagRow, StoreError> {
        self.fetch(id)?.ok_or_else(|| StoreError::not_found(id))
    }

    fn require_parent(&self, parent: ParentTarget) -> Result<(), StoreError> {
        if let ParentTarget::Tag(id) = parent
            && self.fetch(id)?.is_none()
        {
            return Err(StoreError::bad_request(format!(
                "parent tag {id} does not exist"
            )));
        }
        Ok(())
    }

    /// Returns `true` if `ancestor` appears on the parent chain of `node`.
    fn has_ancestor(&self, node: TagId, ancestor: TagId) -> Result<bool, StoreError> {
        let mut seen = HashSet::new();
        let mut current = self.require(node)?.parent_tag;

        while let Some(parent) = current {
            if parent == ancestor.get() {
                return Ok(true);
            }
            if !seen.insert(parent) {
                break;
            }
            current = self.fetch(TagId::new(parent))?.and_then(|row| row.parent_tag);
        }
        Ok(false)
    }

    fn update_field(&self, id: TagId, column: &str, value: &str) -> Result<Tag, StoreError> {
        let sql = format!("UPDATE tags SET {column} = ?1 WHERE id = ?2 AND review_id = ?3");
        let changed = self
            .db
            .connection()
            .execute(&sql, params![value, id.get(), self.review_id.get()])?;
        if changed == 0 {
            return Err(StoreError::not_found(id));
        }
        Ok(self.require(id)?.into_tag())
    }
}

impl TagStore for LocalTagStore {
    fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, parent_tag FROM tags WHERE review_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([self.review_id.get()], TagRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut by_parent: HashMap<Option<i64>, Vec<TagRow>> = HashMap::new();
        for row in rows {
            by_parent.entry(row.parent_tag).or_default().push(row);
        }

        let roots = by_parent.remove(&None).unwrap_or_default();
        Ok(roots
            .into_iter()
            .map(|row| assemble(row, &mut by_parent))
            .collect())
    }

    fn create_tag(&self, name: &str, parent: ParentTarget) -> Result<Tag, StoreError> {
        self.require_parent(parent)?;

        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO tags (review_id, name, description, parent_tag) VALUES (?1, ?2, '', ?3)",
            params![
                self.review_id.get(),
                name,
                parent.as_wire().map(TagId::get)
            ],
        )?;
        let id = TagId::new(conn.last_insert_rowid());
        Ok(self.require(id)?.into_tag())
    }

    fn delete_tag(&self, id: TagId) -> Result<(), StoreError> {
        let deleted = self.db.connection().execute(
            "DELETE FROM tags WHERE id = ?1 AND review_id = ?2",
            params![id.get(), self.review_id.get()],
        )?;
        if deleted == 0 {
            return Err(StoreError::not_found(id));
        }
        Ok(())
    }

    fn move_tag(&self, id: TagId, new_parent: ParentTarget) -> Result<Tag, StoreError> {
        // The ancestry check and the update must see the same rows.
        self.db.atomically(|| {
            self.require(id)?;
            self.require_parent(new_parent)?;

            if let ParentTarget::Tag(target) = new_parent {
                if target == id {
                    return Err(StoreError::bad_request(format!(
                        "tag {id} cannot be its own parent"
                    )));
                }
                if self.has_ancestor(target, id)? {
                    return Err(StoreError::bad_request(format!(
                        "moving tag {id} under {target} would create a cycle"
                    )));
                }
            }

            self.db.connection().execute(
                "UPDATE tags SET parent_tag = ?1 WHERE id = ?2 AND review_id = ?3",
                params![
                    new_parent.as_wire().map(TagId::get),
                    id.get(),
                    self.review_id.get()
                ],
            )?;
            Ok(self.require(id)?.into_tag())
        })
    }

    fn rename_tag(&self, id: TagId, name: &str) -> Result<Tag, StoreError> {
        self.update_field(id, "name", name)
    }

    fn set_description(&self, id: TagId, description: &str) -> Result<Tag, StoreError> {
        self.update_field(id, "description", description)
    }

    fn tag_counts(&self) -> Result<Vec<TagCount>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT t.id, COUNT(st.study_id)
             FROM tags t
             LEFT JOIN study_tags st ON st.tag_id = t.id
             WHERE t.review_id = ?1
             GROUP BY t.id
             ORDER BY t.id",
        )?;
        let counts = stmt
            .query_map([self.review_id.get()], |row| {
                Ok(TagCount {
                    id: TagId::new(row.get(0)?),
                    study_count: row.get::<_, i64>(1)?.max(0) as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(counts)
    }
}

/// Attaches every descendant of `row`, consuming entries from `by_parent`.
fn assemble(row: TagRow, by_parent: &mut HashMap<Option<i64>, Vec<TagRow>>) -> Tag {
    let children = by_parent.remove(&Some(row.id)).unwrap_or_default();
    let mut tag = row.into_tag();
    for child in children {
        tag = tag.with_child(assemble(child, by_parent));
    }
    tag
}
