mod ids;
mod requests;
mod tag;

pub use ids::{ParentTarget, ReviewId, TagId};
pub use requests::{DEFAULT_TAG_NAME, MoveTag, NAME_MAX_CHARS, NewTag, TagPatch};
pub use tag::{DESCRIPTION_PLACEHOLDER, Tag, TagCount};
