//! Check selectors — which checks a caller wants executed.
//!
//! A selector carries include/exclude tags and explicit names. Tag
//! matching semantics (AND vs OR) are decided per call by the executor;
//! a leading `-` marks an exclusion and always applies. Syntax errors
//! are the one programmer error in the system and are rejected before
//! any check is dispatched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid selector syntax.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty tag in selector")]
    EmptyTag,
    #[error("empty name in selector")]
    EmptyName,
    #[error("tag contains whitespace: {0:?}")]
    TagWithWhitespace(String),
}

/// Selects registered checks by tags and/or explicit names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSelector {
    /// Tags to match; a leading `-` excludes.
    pub tags: Vec<String>,
    /// Explicit check names, OR-ed with the tag match.
    pub names: Vec<String>,
}

impl CheckSelector {
    /// Matches every registered check.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            names: Vec::new(),
        }
    }

    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: Vec::new(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the selector constrains anything at all.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.names.is_empty()
    }

    /// Include tags (exclusions stripped of their `-` prefix go to
    /// [`excluded_tags`](Self::excluded_tags)).
    pub fn included_tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .filter(|t| !t.starts_with('-'))
            .map(String::as_str)
    }

    pub fn excluded_tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .filter_map(|t| t.strip_prefix('-'))
    }

    /// Validate selector syntax. Called by the executor before resolving.
    pub fn validate(&self) -> Result<(), SelectorError> {
        for tag in &self.tags {
            let bare = tag.strip_prefix('-').unwrap_or(tag);
            if bare.is_empty() {
                return Err(SelectorError::EmptyTag);
            }
            if bare.chars().any(char::is_whitespace) {
                return Err(SelectorError::TagWithWhitespace(tag.clone()));
            }
        }
        if self.names.iter().any(|n| n.trim().is_empty()) {
            return Err(SelectorError::EmptyName);
        }
        Ok(())
    }
}
