/// Maximum number of remembered selections.
pub const MAX_RECENT_SELECTIONS: usize = 4;

/// Prepends `term` and truncates to [`MAX_RECENT_SELECTIONS`].
///
/// No deduplication: opening the same API twice in a row stores it twice.
pub fn push_recent(mut entries: Vec<String>, term: &str) -> Vec<String> {
    entries.insert(0, term.to_string());
    entries.truncate(MAX_RECENT_SELECTIONS);
    entries
}
