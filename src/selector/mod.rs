//! Selector resolution
//!
//! Selectors pick metrics out of an index: exact names, `*` wildcards, or
//! regular expressions with `-e`. Several selectors resolve to the union of
//! their matches.
//!
//! ```rust
//! use whisperctl::index::MetricSet;
//! use whisperctl::selector::resolve;
//!
//! let index: MetricSet = ["stats.web.requests", "stats.web.requests.count"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//!
//! let hits = resolve("stats.web.*", false, &index).unwrap();
//! assert_eq!(hits.len(), 1);
//! ```

mod error;
mod resolver;

pub use error::{SelectorError, SelectorResult};
pub use resolver::{
    resolve, resolve_all, wildcard_to_regex, Selector, SelectorKind, SelectorSpec,
};
