// Suggestion history - a bounded, most-recent-first list of opened APIs

mod recent;
mod tracker;


pub use recent::{MAX_RECENT_SELECTIONS, push_recent};
pub use tracker::{
    DEFAULT_SUGGESTIONS, InstallReason, SUGGESTIONS_KEY, Suggestion, SuggestionSet,
    SuggestionTracker,
};
