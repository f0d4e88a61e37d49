//! Shared helpers for the CLI and TUI front ends.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::{Tag, TagId};
use crate::tree::TagTree;

/// Gets the default path of the local tag database.
///
/// Returns `{data_dir}/sysrev/tags.db` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn get_database_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("sysrev").join("tags.db"))
}

/// Ensures the parent directory of the database file exists.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}

/// Renders the whole forest as an indented outline, one tag per line.
///
/// Each line reads `name [id]`, followed by the study count when `counts`
/// has an entry for the tag.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use sysrev::{Tag, TagId, TagTree};
/// use sysrev::utils::render_tree;
///
/// let tree = TagTree::from_forest(vec![
///     Tag::new(TagId::new(1), "Design").with_child(Tag::new(TagId::new(2), "RCT")),
/// ])
/// .unwrap();
///
/// assert_eq!(render_tree(&tree, &HashMap::new()), "Design [1]\n  RCT [2]\n");
/// ```
pub fn render_tree(tree: &TagTree, counts: &HashMap<TagId, u64>) -> String {
    let mut out = String::new();
    for (depth, tag) in tree.iter() {
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), describe(tag, counts));
    }
    out
}

fn describe(tag: &Tag, counts: &HashMap<TagId, u64>) -> String {
    match counts.get(&tag.id()) {
        Some(count) => format!("{} [{}] ({count} studies)", tag.name(), tag.id()),
        None => format!("{} [{}]", tag.name(), tag.id()),
    }
}
