pub mod config;
pub mod controller;
pub mod db;
pub mod logging;
pub mod models;
pub mod selection;
pub mod store;
pub mod tree;
pub mod tui;
pub mod utils;

pub use config::{ConfigError, SessionConfig, SessionConfigBuilder};
pub use controller::{
    MutationError, NoOpReason, Notice, Outcome, Phase, ReloadTicket, Severity, TagTreeController,
};
pub use db::Database;
pub use models::{
    DEFAULT_TAG_NAME, DESCRIPTION_PLACEHOLDER, NAME_MAX_CHARS, ParentTarget, ReviewId, Tag,
    TagCount, TagId,
};
pub use selection::{EditField, EditState, Selection};
pub use store::{HttpTagStore, HttpTagStoreBuilder, LocalTagStore, StoreError, TagStore};
pub use tree::{TagTree, TreeError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_accessible_from_crate_root() {
        let db = Database::in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn types_accessible_from_crate_root() {
        let tag = Tag::new(TagId::new(1), DEFAULT_TAG_NAME);
        assert_eq!(tag.name(), "New Tag");
        assert_eq!(tag.display_description(), DESCRIPTION_PLACEHOLDER);

        assert_eq!(ParentTarget::from_raw(0), ParentTarget::Root);
        assert_eq!(format!("{}", Phase::Idle), "idle");

        let store = LocalTagStore::new(Database::in_memory().unwrap(), ReviewId::new(1));
        let controller = TagTreeController::new(store);
        assert!(controller.tree().is_empty());
        assert_eq!(controller.selection().edit_state(), &EditState::Viewing);
    }
}
