pub mod compositor;
pub mod store;

pub use compositor::{CaptionCompositor, MatchPolicy};
pub use store::{Caption, CaptionDraft, CaptionStore};
