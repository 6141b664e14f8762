//! Browsing model: entry paths, the navigation state machine and the
//! directory listing derived from it.

mod path;
mod state;
mod view;

pub use path::EntryPath;
pub use state::{BASE_DEPTH, Back, NavigationState, Step};
pub use view::{sort_entries, visible_entries};
