//! Client model label → upstream model identifier resolution.
//!
//! A configurable rule table is consulted first; without one, a built-in
//! fallback scans the lowercased label for well-known family substrings.

use kirogate_core::config::{MatchType, ModelMappingRule};

/// Fixed upstream identifiers used by the built-in fallback.
pub const SONNET_MODEL_ID: &str = "CLAUDE_SONNET_4_20250514_V1_0";
pub const OPUS_MODEL_ID: &str = "CLAUDE_OPUS_4_20250514_V1_0";
pub const HAIKU_MODEL_ID: &str = "CLAUDE_3_7_SONNET_20250219_V1_0";

/// Rule-table lookup consumed by the translator. The shipped implementation
/// is config-backed; tests substitute their own.
pub trait ModelMappingStore: Send + Sync {
    /// Resolve a client model label to an upstream model id.
    fn find_mapping(&self, client_model: &str) -> Option<String>;
}

/// Rule table sourced from config, ordered by descending priority at
/// construction so lookups are a single scan.
pub struct StaticMappingStore {
    rules: Vec<ModelMappingRule>,
}

impl StaticMappingStore {
    pub fn new(mut rules: Vec<ModelMappingRule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { rules }
    }
}

impl ModelMappingStore for StaticMappingStore {
    fn find_mapping(&self, client_model: &str) -> Option<String> {
        let label = client_model.to_lowercase();
        self.rules
            .iter()
            .filter(|r| r.enabled)
            .find(|r| {
                let pattern = r.pattern.to_lowercase();
                match r.match_type {
                    MatchType::Exact => label == pattern,
                    MatchType::Contains => label.contains(&pattern),
                    MatchType::Prefix => label.starts_with(&pattern),
                    MatchType::Suffix => label.ends_with(&pattern),
                }
            })
            .map(|r| r.internal_id.clone())
    }
}

/// Resolve a model label through the bound store, falling back to the
/// built-in substring scan. `None` fails the whole translation.
pub fn map_model(store: Option<&dyn ModelMappingStore>, client_model: &str) -> Option<String> {
    if let Some(store) = store {
        if let Some(id) = store.find_mapping(client_model) {
            return Some(id);
        }
    }
    fallback(client_model)
}

/// Check order is sonnet, opus, haiku; a label naming several families
/// resolves to the first hit. The rule table is the authoritative path for
/// anything finer-grained.
fn fallback(client_model: &str) -> Option<String> {
    let label = client_model.to_lowercase();
    if label.contains("sonnet") {
        Some(SONNET_MODEL_ID.to_string())
    } else if label.contains("opus") {
        Some(OPUS_MODEL_ID.to_string())
    } else if label.contains("haiku") {
        Some(HAIKU_MODEL_ID.to_string())
    } else {
        None
    }
}
