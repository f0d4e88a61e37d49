//! Orchestration of user-initiated tag tree edits.
//!
//! Every structural edit follows the same cycle: validate against the local
//! tree, issue one store call, and only on success reload the whole forest
//! and re-resolve the selection. A failed call leaves tree and selection
//! exactly as they were and raises a dismissible [`Notice`].
//!
//! # Examples
//!
//! ```
//! use sysrev::{Database, LocalTagStore, ReviewId, TagTreeController};
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = LocalTagStore::new(Database::in_memory()?, ReviewId::new(1));
//! let mut controller = TagTreeController::new(store);
//! controller.refresh()?;
//!
//! let id = controller.create()?;
//! controller.click(id)?;
//! controller.rename("Study design")?;
//!
//! assert_eq!(controller.tree().find_by_id(id).unwrap().name(), "Study design");
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use time::OffsetDateTime;

use crate::models::{DEFAULT_TAG_NAME, ParentTarget, Tag, TagId};
use crate::selection::{EditField, EditState, Selection};
use crate::store::{StoreError, TagStore};
use crate::tree::{TagTree, TreeError};

/// Where the controller is in a mutation + reload cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Ready to accept a new mutation.
    Idle,
    /// A store call is outstanding.
    Mutating,
    /// A forest fetch is outstanding.
    Reloading,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Mutating => write!(f, "saving"),
            Phase::Reloading => write!(f, "reloading"),
        }
    }
}

/// Handle for one forest fetch; newer tickets supersede older ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReloadTicket(u64);

/// Why a request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// The action needs a selected tag and there is none.
    NothingSelected,
    /// The new value equals the current one.
    Unchanged,
    /// A commit was requested with no editor open.
    NotEditing,
}

/// Result of a request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The store accepted the change.
    Applied,
    /// Nothing was sent to the store.
    NoOp(NoOpReason),
}

/// Failure of a requested edit.
#[derive(Debug, Error)]
pub enum MutationError {
    /// Another mutation or reload is still in flight.
    #[error("busy: {0} in progress")]
    Busy(Phase),

    /// The edit would break the tree, or the forest received was malformed.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// The store could not be reached or refused the request.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How serious a [`Notice`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A user-facing message about a failed or partially applied edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub raised_at: OffsetDateTime,
}

/// Drives tag tree edits against a [`TagStore`].
pub struct TagTreeController<S> {
    store: S,
    tree: TagTree,
    selection: Selection,
    phase: Phase,
    issued: u64,
    applied: u64,
    stale: bool,
    counts: HashMap<TagId, u64>,
    notice: Option<Notice>,
}

impl<S: TagStore> TagTreeController<S> {
    /// Creates a controller with an empty tree; call [`Self::refresh`] to load.
    pub fn new(store: S) -> Self {
        Self {
            store,
            tree: TagTree::new(),
            selection: Selection::new(),
            phase: Phase::Idle,
            issued: 0,
            applied: 0,
            stale: false,
            counts: HashMap::new(),
            notice: None,
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the last loaded tree.
    pub fn tree(&self) -> &TagTree {
        &self.tree
    }

    /// Returns selection and editor state.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Returns the selected tag as present in the current tree.
    pub fn selected_tag(&self) -> Option<&Tag> {
        self.selection
            .selected()
            .and_then(|id| self.tree.find_by_id(id))
    }

    /// Returns the current cycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns `true` if a mutation was saved but the follow-up reload failed.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Returns the pending notice, if any.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Dismisses the pending notice.
    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Returns how many studies use `id`; unknown tags count zero.
    pub fn study_count(&self, id: TagId) -> u64 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    // ---------------------------------------------------------------------
    // Reloading
    // ---------------------------------------------------------------------

    /// Fetches the whole forest and replaces the tree.
    ///
    /// Study counts are refreshed as well; failing to fetch them is logged
    /// and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Busy`] while another cycle is running, or the
    /// store/tree error if the fetch fails. The current tree is kept on error.
    pub fn refresh(&mut self) -> Result<(), MutationError> {
        self.ensure_idle()?;
        let result = self.reload();
        if let Err(e) = &result {
            self.raise(Severity::Error, format!("Could not load tags: {e}"));
        }
        result
    }

    /// Starts a forest fetch performed by the caller.
    ///
    /// Hand the fetched forest to [`Self::finish_reload`] together with the
    /// ticket. The controller stays in [`Phase::Reloading`] until the newest
    /// ticket is finished or abandoned.
    pub fn begin_reload(&mut self) -> ReloadTicket {
        self.issued += 1;
        self.phase = Phase::Reloading;
        ReloadTicket(self.issued)
    }

    /// Applies a fetched forest if `ticket` is newer than the last applied one.
    ///
    /// Returns `Ok(false)` when the response is stale and was dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError`] if the forest is malformed; the tree is kept.
    pub fn finish_reload(
        &mut self,
        ticket: ReloadTicket,
        forest: Vec<Tag>,
    ) -> Result<bool, TreeError> {
        self.settle(ticket);

        if ticket.0 <= self.applied {
            tracing::warn!(
                ticket = ticket.0,
                applied = self.applied,
                "dropping stale tag reload"
            );
            return Ok(false);
        }

        self.tree.load(forest)?;
        self.applied = ticket.0;
        self.stale = false;

        let before = self.selection.selected();
        if !self.selection.reconcile(&self.tree) && before.is_some() {
            tracing::debug!(tag = ?before, "selected tag vanished after reload");
        }
        tracing::debug!(tags = self.tree.len(), ticket = ticket.0, "tag tree reloaded");
        Ok(true)
    }

    /// Gives up on a fetch that failed.
    pub fn abandon_reload(&mut self, ticket: ReloadTicket) {
        self.settle(ticket);
    }

    fn settle(&mut self, ticket: ReloadTicket) {
        if ticket.0 >= self.issued {
            self.phase = Phase::Idle;
        }
    }

    fn reload(&mut self) -> Result<(), MutationError> {
        let ticket = self.begin_reload();
        let forest = match self.store.list_tags() {
            Ok(forest) => forest,
            Err(e) => {
                self.abandon_reload(ticket);
                return Err(e.into());
            }
        };
        self.finish_reload(ticket, forest)?;

        match self.store.tag_counts() {
            Ok(counts) => {
                self.counts = counts.into_iter().map(|c| (c.id, c.study_count)).collect();
            }
            Err(e) => tracing::warn!(error = %e, "could not fetch tag study counts"),
        }
        Ok(())
    }

    /// Reloads after a saved mutation; a failure only marks the tree stale.
    fn reload_after_mutation(&mut self) {
        if let Err(e) = self.reload() {
            tracing::warn!(error = %e, "mutation saved but reload failed");
            self.stale = true;
            self.raise(
                Severity::Warning,
                format!("Saved, but the tag tree could not be refreshed: {e}"),
            );
        }
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Creates a default-named tag under the selected tag, or at the root
    /// when nothing is selected. Returns the new tag's ID.
    ///
    /// # Errors
    ///
    /// See [`Self::create_under`].
    pub fn create(&mut self) -> Result<TagId, MutationError> {
        let parent = ParentTarget::from(self.selection.selected());
        self.create_under(DEFAULT_TAG_NAME, parent)
    }

    /// Creates a tag named `name` under `parent`.
    ///
    /// # Errors
    ///
    /// - [`MutationError::Busy`] while another cycle is running
    /// - [`MutationError::Tree`] if `parent` is not in the tree
    /// - [`MutationError::Store`] if the store call fails
    pub fn create_under(
        &mut self,
        name: &str,
        parent: ParentTarget,
    ) -> Result<TagId, MutationError> {
        self.ensure_idle()?;
        self.guard(self.tree.check_parent(parent))?;

        let created = self.mutate("create tag", |store| store.create_tag(name, parent))?;
        tracing::info!(tag = %created.id(), %parent, "created tag");

        if let ParentTarget::Tag(parent) = parent {
            self.selection.expand(parent);
        }
        self.reload_after_mutation();
        Ok(created.id())
    }

    /// Deletes the selected tag and its subtree, then clears the selection.
    ///
    /// # Errors
    ///
    /// See [`Self::delete_tag`].
    pub fn delete(&mut self) -> Result<Outcome, MutationError> {
        match self.selection.selected() {
            Some(id) => self.delete_tag(id),
            None => Ok(Outcome::NoOp(NoOpReason::NothingSelected)),
        }
    }

    /// Deletes `id` and its subtree, then clears the selection.
    ///
    /// # Errors
    ///
    /// - [`MutationError::Busy`] while another cycle is running
    /// - [`MutationError::Tree`] if `id` is not in the tree
    /// - [`MutationError::Store`] if the store call fails
    pub fn delete_tag(&mut self, id: TagId) -> Result<Outcome, MutationError> {
        self.ensure_idle()?;
        if !self.tree.contains(id) {
            return Err(self.reject(TreeError::UnknownTag(id)));
        }

        let removed = self.tree.subtree_ids(id).len();
        self.mutate("delete tag", |store| store.delete_tag(id))?;
        tracing::info!(tag = %id, removed, "deleted tag");

        self.selection.clear();
        self.reload_after_mutation();
        Ok(Outcome::Applied)
    }

    /// Moves `dragged` to the drop target reported by a tree widget, where
    /// `0` means the root.
    ///
    /// # Errors
    ///
    /// See [`Self::move_to`].
    pub fn move_tag(&mut self, dragged: TagId, raw_target: i64) -> Result<Outcome, MutationError> {
        self.move_to(dragged, ParentTarget::from_raw(raw_target))
    }

    /// Re-parents `tag` under `target`.
    ///
    /// Moves onto the tag itself or into its own subtree are rejected before
    /// anything is sent. Moving a tag to where it already is does nothing.
    /// The selection is re-resolved by ID after the reload.
    ///
    /// # Errors
    ///
    /// - [`MutationError::Busy`] while another cycle is running
    /// - [`MutationError::Tree`] for unknown tags and cyclic moves
    /// - [`MutationError::Store`] if the store call fails
    pub fn move_to(&mut self, tag: TagId, target: ParentTarget) -> Result<Outcome, MutationError> {
        self.ensure_idle()?;
        self.guard(self.tree.check_move(tag, target))?;

        if self.tree.parent_of(tag) == Some(target) {
            return Ok(Outcome::NoOp(NoOpReason::Unchanged));
        }

        self.mutate("move tag", |store| store.move_tag(tag, target))?;
        tracing::info!(tag = %tag, %target, "moved tag");

        if let ParentTarget::Tag(parent) = target {
            self.selection.expand(parent);
        }
        self.reload_after_mutation();
        Ok(Outcome::Applied)
    }

    /// Renames the selected tag.
    ///
    /// # Errors
    ///
    /// See [`Self::rename_tag`].
    pub fn rename(&mut self, new_name: &str) -> Result<Outcome, MutationError> {
        match self.selection.selected() {
            Some(id) => self.rename_tag(id, new_name),
            None => Ok(Outcome::NoOp(NoOpReason::NothingSelected)),
        }
    }

    /// Renames `id`; nothing is sent if the name is unchanged.
    ///
    /// # Errors
    ///
    /// - [`MutationError::Busy`] while another cycle is running
    /// - [`MutationError::Tree`] if `id` is not in the tree
    /// - [`MutationError::Store`] if the store call fails
    pub fn rename_tag(&mut self, id: TagId, new_name: &str) -> Result<Outcome, MutationError> {
        self.update_field(id, EditField::Name, new_name)
    }

    /// Replaces the selected tag's description.
    ///
    /// # Errors
    ///
    /// See [`Self::set_tag_description`].
    pub fn set_description(&mut self, new_value: &str) -> Result<Outcome, MutationError> {
        match self.selection.selected() {
            Some(id) => self.set_tag_description(id, new_value),
            None => Ok(Outcome::NoOp(NoOpReason::NothingSelected)),
        }
    }

    /// Replaces `id`'s description; nothing is sent if it is unchanged.
    ///
    /// A missing description compares equal to an empty one.
    ///
    /// # Errors
    ///
    /// Same as [`Self::rename_tag`].
    pub fn set_tag_description(
        &mut self,
        id: TagId,
        new_value: &str,
    ) -> Result<Outcome, MutationError> {
        self.update_field(id, EditField::Description, new_value)
    }

    fn update_field(
        &mut self,
        id: TagId,
        field: EditField,
        value: &str,
    ) -> Result<Outcome, MutationError> {
        self.ensure_idle()?;
        let current = match self.tree.find_by_id(id) {
            Some(tag) => match field {
                EditField::Name => tag.name().to_string(),
                EditField::Description => tag.description().unwrap_or_default().to_string(),
            },
            None => return Err(self.reject(TreeError::UnknownTag(id))),
        };
        if current == value {
            return Ok(Outcome::NoOp(NoOpReason::Unchanged));
        }

        match field {
            EditField::Name => {
                self.mutate("rename tag", |store| store.rename_tag(id, value))?;
            }
            EditField::Description => {
                self.mutate("update description", |store| {
                    store.set_description(id, value)
                })?;
            }
        }
        tracing::info!(tag = %id, ?field, "updated tag");

        // Show the new value right away; the reload below replaces it with
        // the stored record, or keeps it if the reload fails.
        if let Some(tag) = self.tree.find_by_id_mut(id) {
            match field {
                EditField::Name => tag.set_name(value),
                EditField::Description => tag.set_description(value),
            }
        }
        self.reload_after_mutation();
        Ok(Outcome::Applied)
    }

    // ---------------------------------------------------------------------
    // Selection and inline editing
    // ---------------------------------------------------------------------

    /// Handles a click on a node: commits any open editor (as losing focus
    /// would), then toggles the selection.
    ///
    /// # Errors
    ///
    /// Returns the commit's error; the click is still applied.
    pub fn click(&mut self, id: TagId) -> Result<Option<TagId>, MutationError> {
        let committed = self.commit_edit();
        let selected = self.selection.click(id);
        committed.map(|_| selected)
    }

    /// Flips a node's expansion without touching the selection.
    pub fn toggle_expanded(&mut self, id: TagId) -> bool {
        self.selection.toggle_expanded(id)
    }

    /// Clears the selection, committing any open editor first.
    ///
    /// # Errors
    ///
    /// Returns the commit's error; the selection is still cleared.
    pub fn clear_selection(&mut self) -> Result<(), MutationError> {
        let committed = self.commit_edit();
        self.selection.clear();
        committed.map(|_| ())
    }

    /// Opens the inline editor for `field` on the selected tag, committing
    /// the other editor first if it is open.
    ///
    /// # Errors
    ///
    /// Returns the commit's error. If the other editor could not be saved it
    /// stays open and `field` is not opened.
    pub fn begin_edit(&mut self, field: EditField) -> Result<Outcome, MutationError> {
        if let Some(open) = self.selection.edit_state().field()
            && open != field
        {
            self.commit_edit()?;
        }

        let Some(tag) = self.selected_tag() else {
            return Ok(Outcome::NoOp(NoOpReason::NothingSelected));
        };
        let current = match field {
            EditField::Name => tag.name().to_string(),
            EditField::Description => tag.description().unwrap_or_default().to_string(),
        };
        self.selection.begin_edit(field, &current);
        Ok(Outcome::Applied)
    }

    /// Types a character into the open editor.
    pub fn edit_input(&mut self, c: char) -> bool {
        self.selection.push_char(c)
    }

    /// Deletes the last character of the open editor.
    pub fn edit_backspace(&mut self) {
        self.selection.pop_char();
    }

    /// Closes the open editor and saves its buffer if it differs.
    ///
    /// # Errors
    ///
    /// Same as [`Self::rename_tag`]. If the store refuses or cannot be
    /// reached, or a cycle is already running, the editor stays open with
    /// the typed text.
    pub fn commit_edit(&mut self) -> Result<Outcome, MutationError> {
        let pending = self.selection.take_edit();
        let result = match &pending {
            EditState::Viewing => return Ok(Outcome::NoOp(NoOpReason::NotEditing)),
            EditState::EditingName(buffer) => self.rename(buffer),
            EditState::EditingDescription(buffer) => self.set_description(buffer),
        };
        if let Err(MutationError::Store(_) | MutationError::Busy(_)) = &result {
            self.selection.resume_edit(pending);
        }
        result
    }

    /// Closes the open editor without saving.
    pub fn cancel_edit(&mut self) {
        self.selection.cancel_edit();
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn ensure_idle(&self) -> Result<(), MutationError> {
        match self.phase {
            Phase::Idle => Ok(()),
            busy => Err(MutationError::Busy(busy)),
        }
    }

    fn guard(&mut self, check: Result<(), TreeError>) -> Result<(), MutationError> {
        check.map_err(|e| self.reject(e))
    }

    fn reject(&mut self, error: TreeError) -> MutationError {
        tracing::warn!(error = %error, "edit rejected locally");
        self.raise(Severity::Error, error.to_string());
        MutationError::Tree(error)
    }

    /// Runs one store call in [`Phase::Mutating`].
    fn mutate<T>(
        &mut self,
        action: &str,
        call: impl FnOnce(&S) -> Result<T, StoreError>,
    ) -> Result<T, MutationError> {
        self.phase = Phase::Mutating;
        let result = call(&self.store);
        self.phase = Phase::Idle;

        result.map_err(|e| {
            tracing::warn!(error = %e, action, "tag store call failed");
            let prefix = if e.is_rejection() {
                "Server refused to"
            } else {
                "Could not"
            };
            self.raise(Severity::Error, format!("{prefix} {action}: {e}"));
            MutationError::Store(e)
        })
    }

    fn raise(&mut self, severity: Severity, message: String) {
        self.notice = Some(Notice {
            severity,
            message,
            raised_at: OffsetDateTime::now_utc(),
        });
    }
}
