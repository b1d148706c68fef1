//! Video and channel galleries: paging, scroll restoration and user actions.

pub mod actions;
pub mod controller;
pub mod list;

pub use actions::GalleryActions;
pub use controller::{InfiniteScroll, RestoreOutcome, Trigger, TriggerOutcome};
pub use list::ListView;
