//! Pattern Resolver
//!
//! Three tiers, picked per selector:
//!
//! | Input              | Tier     | Matching                                  |
//! |--------------------|----------|-------------------------------------------|
//! | `-e` given         | Regex    | unanchored search anywhere in the name    |
//! | contains `*`       | Wildcard | anchored at both ends; each `*` is one or more non-dot chars |
//! | anything else      | Exact    | equality                                  |
//!
//! A wildcard never crosses a `.` and must cover the whole name: `stats.web.*`
//! matches `stats.web.requests` but neither `stats.web.requests.count` nor
//! `prod.stats.web.requests`. Write `stats.web.*.*` (or use a regex)
//! to reach deeper.

use regex::Regex;
use std::fmt;

use super::error::{SelectorError, SelectorResult};
use crate::index::MetricSet;

/// Stand-in for one `*`: a run of characters within a single segment
const SEGMENT_WILDCARD: &str = "[^.]+";

/// How a selector matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    Exact,
    Wildcard,
    Regex,
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorKind::Exact => write!(f, "exact"),
            SelectorKind::Wildcard => write!(f, "wildcard"),
            SelectorKind::Regex => write!(f, "regex"),
        }
    }
}

/// A compiled selector
#[derive(Debug, Clone)]
pub enum Selector {
    Exact(String),
    Wildcard { pattern: String, regex: Regex },
    Regex { pattern: String, regex: Regex },
}

impl Selector {
    /// Compile a selector
    pub fn parse(selector: &str, is_regex: bool) -> SelectorResult<Self> {
        if selector.is_empty() {
            return Err(SelectorError::Empty);
        }

        if is_regex {
            let regex = compile(selector, selector)?;
            Ok(Selector::Regex {
                pattern: selector.to_string(),
                regex,
            })
        } else if selector.contains('*') {
            let regex = compile(selector, &wildcard_to_regex(selector))?;
            Ok(Selector::Wildcard {
                pattern: selector.to_string(),
                regex,
            })
        } else {
            Ok(Selector::Exact(selector.to_string()))
        }
    }

    pub fn kind(&self) -> SelectorKind {
        match self {
            Selector::Exact(_) => SelectorKind::Exact,
            Selector::Wildcard { .. } => SelectorKind::Wildcard,
            Selector::Regex { .. } => SelectorKind::Regex,
        }
    }

    /// Original selector text
    pub fn as_str(&self) -> &str {
        match self {
            Selector::Exact(s) => s,
            Selector::Wildcard { pattern, .. } | Selector::Regex { pattern, .. } => pattern,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Selector::Exact(s) => s == name,
            Selector::Wildcard { regex, .. } | Selector::Regex { regex, .. } => regex.is_match(name),
        }
    }

    /// Every name in `index` this selector matches
    pub fn resolve(&self, index: &MetricSet) -> MetricSet {
        match self {
            Selector::Exact(name) => index.get(name).cloned().into_iter().collect(),
            _ => index.iter().filter(|m| self.matches(m)).cloned().collect(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.kind())
    }
}

/// Escape everything, then turn each `*` into a single-segment wildcard
pub fn wildcard_to_regex(pattern: &str) -> String {
    let escaped = regex::escape(pattern).replace(r"\*", SEGMENT_WILDCARD);
    format!("^{}$", escaped)
}

fn compile(selector: &str, pattern: &str) -> SelectorResult<Regex> {
    Regex::new(pattern).map_err(|e| SelectorError::InvalidPattern {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve one selector against an index
pub fn resolve(selector: &str, is_regex: bool, index: &MetricSet) -> SelectorResult<MetricSet> {
    Ok(Selector::parse(selector, is_regex)?.resolve(index))
}

/// Union of every selector's matches.
///
/// All selectors are compiled before any matching, so one bad pattern fails
/// the whole call instead of yielding a partial set.
pub fn resolve_all<S: AsRef<str>>(
    selectors: &[S],
    is_regex: bool,
    index: &MetricSet,
) -> SelectorResult<MetricSet> {
    let compiled = selectors
        .iter()
        .map(|s| Selector::parse(s.as_ref(), is_regex))
        .collect::<SelectorResult<Vec<_>>>()?;

    Ok(compiled.iter().flat_map(|s| s.resolve(index)).collect())
}

/// A set of selectors plus the regex flag, as given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorSpec {
    pub selectors: Vec<String>,
    pub is_regex: bool,
}

impl SelectorSpec {
    pub fn new(selectors: Vec<String>, is_regex: bool) -> Self {
        Self {
            selectors,
            is_regex,
        }
    }

    /// Single exact-or-wildcard selector
    pub fn single(selector: impl Into<String>) -> Self {
        Self::new(vec![selector.into()], false)
    }

    /// Single regex selector
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::new(vec![pattern.into()], true)
    }

    pub fn resolve(&self, index: &MetricSet) -> SelectorResult<MetricSet> {
        resolve_all(&self.selectors, self.is_regex, index)
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_regex {
            write!(f, "-e ")?;
        }
        write!(f, "{}", self.selectors.join(" "))
    }
}
