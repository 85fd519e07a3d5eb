//! Tool names arriving from clients are arbitrary strings; the upstream only
//! accepts identifiers. The registry rewrites names into `[A-Za-z_][A-Za-z0-9_]*`
//! while keeping a per-request bijection so the response decoder can translate
//! tool-use events back.

use std::collections::{HashMap, HashSet};

/// Replacement used when a name sanitizes to nothing at all.
const EMPTY_NAME: &str = "tool";

/// Base sanitization: every character outside `[A-Za-z0-9_]` becomes `_`,
/// runs of `_` collapse to one. Leading/trailing `_` are kept so `a!` and `a`
/// stay distinct; the trimmed form only matters for the unsupported check.
pub fn sanitize_base(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = false;
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' {
            c
        } else {
            '_'
        };
        if c == '_' {
            if last_underscore {
                continue;
            }
            last_underscore = true;
        } else {
            last_underscore = false;
        }
        out.push(c);
    }
    if out.is_empty() {
        return EMPTY_NAME.to_string();
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return format!("t_{out}");
    }
    out
}

/// Tools the upstream cannot execute. Dropped from definitions and assistant
/// tool-uses; user tool-results referencing them pass through untouched.
pub fn is_unsupported(name: &str) -> bool {
    let lowered = name.to_lowercase();
    if matches_unsupported(&lowered) {
        return true;
    }
    matches_unsupported(
        sanitize_base(&lowered)
            .trim_matches('_'),
    )
}

fn matches_unsupported(name: &str) -> bool {
    name == "web_search" || name == "websearch"
}

/// Per-request map from original tool names to their assigned sanitized
/// names. Assignment is idempotent; collisions get `_2`, `_3`, … suffixes.
#[derive(Debug, Default)]
pub struct ToolNameRegistry {
    assigned: HashMap<String, String>,
    used: HashSet<String>,
}

impl ToolNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sanitized name for `original`, allocating one on first
    /// sight.
    pub fn assign(&mut self, original: &str) -> String {
        if let Some(existing) = self.assigned.get(original) {
            return existing.clone();
        }
        let base = sanitize_base(original);
        let mut candidate = base.clone();
        let mut n = 2u32;
        while self.used.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        self.used.insert(candidate.clone());
        self.assigned
            .insert(original.to_string(), candidate.clone());
        candidate
    }

    /// The original → sanitized map, handed back with the envelope.
    pub fn into_map(self) -> HashMap<String, String> {
        self.assigned
    }
}
