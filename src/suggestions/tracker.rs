use std::sync::Arc;

use serde_json::Value;

use crate::store::{KvStore, StoreError};

use super::recent::push_recent;

/// Store key for the suggestion list, a JSON array of strings.
pub const SUGGESTIONS_KEY: &str = "apiSuggestions";

/// Terms seeded on a fresh install.
pub const DEFAULT_SUGGESTIONS: [&str; 3] = ["tabs", "storage", "scripting"];

const DEFAULT_DESCRIPTION: &str = "Enter a Chrome API or choose from past searches";

/// Why the install hook fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    /// First-ever install: the defaults get seeded.
    Install,
    /// Upgrade or reload of an existing install: history is left alone.
    Update,
}

/// One ranked entry: the raw term plus its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub content: String,
    pub description: String,
}

/// One suggestion round: the constant default line to show first, then the
/// ranked entries in stored order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionSet {
    pub default_description: &'static str,
    pub entries: Vec<Suggestion>,
}

/// Reads and updates the recency list through an injected store.
pub struct SuggestionTracker<S> {
    store: Arc<S>,
}

impl<S: KvStore> SuggestionTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Seeds [`DEFAULT_SUGGESTIONS`] on a fresh install.
    ///
    /// For [`InstallReason::Update`] this is a no-op, so an already-built
    /// history is never clobbered. Returns whether seeding happened.
    pub async fn initialize_defaults(&self, reason: InstallReason) -> Result<bool, StoreError> {
        if reason != InstallReason::Install {
            return Ok(false);
        }
        let seeds = DEFAULT_SUGGESTIONS
            .iter()
            .map(|term| Value::String(term.to_string()))
            .collect();
        self.store.set(SUGGESTIONS_KEY, Value::Array(seeds)).await?;
        log::info!("seeded default suggestions: {DEFAULT_SUGGESTIONS:?}");
        Ok(true)
    }

    /// Current suggestions, most recent first.
    ///
    /// A missing or unreadable list reads as empty rather than failing, so
    /// the suggestion surface keeps working even when defaults were never
    /// seeded.
    pub async fn suggestions(&self) -> SuggestionSet {
        let entries = self
            .recent_terms()
            .await
            .into_iter()
            .map(|term| Suggestion {
                description: format!("Open chrome.{term} API"),
                content: term,
            })
            .collect();
        SuggestionSet {
            default_description: DEFAULT_DESCRIPTION,
            entries,
        }
    }

    /// Confirms a selection: fires the navigation effect, then records
    /// `term`.
    ///
    /// `navigate` is fire-and-forget; its failure is the effect's to log,
    /// not this tracker's to propagate.
    pub async fn confirm_selection(
        &self,
        term: &str,
        navigate: impl FnOnce(&str),
    ) -> Result<(), StoreError> {
        navigate(term);
        self.record_selection(term).await
    }

    /// Prepends `term` to the stored list and truncates to capacity.
    ///
    /// Read-modify-write with no locking; two racing recorders are
    /// last-write-wins.
    pub async fn record_selection(&self, term: &str) -> Result<(), StoreError> {
        let entries = push_recent(self.recent_terms().await, term);
        let values = entries.into_iter().map(Value::String).collect();
        self.store.set(SUGGESTIONS_KEY, Value::Array(values)).await
    }

    async fn recent_terms(&self) -> Vec<String> {
        let value = match self.store.get(SUGGESTIONS_KEY).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("could not read suggestion history ({e}); treating it as empty");
                return Vec::new();
            }
        };
        match value {
            Some(Value::Array(items)) => {
                let mut terms = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(term) => terms.push(term),
                        other => {
                            log::warn!(
                                "suggestion history holds a non-string entry ({other}); treating the list as empty"
                            );
                            return Vec::new();
                        }
                    }
                }
                terms
            }
            Some(other) => {
                log::warn!("suggestion history is not a list ({other}); treating it as empty");
                Vec::new()
            }
            None => Vec::new(),
        }
    }
}
