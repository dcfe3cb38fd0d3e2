//! Moderatable event matching
//!
//! Events are configured as literal names, `*` wildcard patterns, or
//! `{ pattern: getter }` mappings naming the attribute getter to use.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static WILDCARDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*+").expect("static pattern"));

/// One entry of the configured event list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventMatcher {
    /// Literal name or wildcard pattern; the getter follows the naming convention
    Pattern(String),
    /// Pattern -> explicit getter name, tried in declaration order
    Mapped(IndexMap<String, String>),
}

impl From<&str> for EventMatcher {
    fn from(pattern: &str) -> Self {
        EventMatcher::Pattern(pattern.to_string())
    }
}

impl EventMatcher {
    pub fn mapped(pattern: &str, getter: &str) -> Self {
        EventMatcher::Mapped(IndexMap::from([(pattern.to_string(), getter.to_string())]))
    }
}

/// Conventional getter name for an event: `get<Capitalized event>EventAttributes`
pub fn conventional_getter(event: &str) -> String {
    let mut chars = event.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("get{}EventAttributes", capitalized)
}

/// Whether `event` matches `pattern`, where `*` stands for any run of characters
pub fn pattern_matches(pattern: &str, event: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == event;
    }

    let escaped = WILDCARDS
        .split(pattern)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    Regex::new(&format!("^{}$", escaped))
        .map(|re| re.is_match(event))
        .unwrap_or(false)
}

/// Resolve the attribute getter for an event, or `None` when the event is not moderatable
pub fn resolve_getter(matchers: &[EventMatcher], event: &str) -> Option<String> {
    for matcher in matchers {
        match matcher {
            EventMatcher::Pattern(pattern) => {
                if pattern_matches(pattern, event) {
                    return Some(conventional_getter(event));
                }
            }
            EventMatcher::Mapped(mappings) => {
                if let Some(getter) = mappings
                    .iter()
                    .find(|(pattern, _)| pattern_matches(pattern, event))
                    .map(|(_, getter)| getter.clone())
                {
                    return Some(getter);
                }
            }
        }
    }

    None
}
