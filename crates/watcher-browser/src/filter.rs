//! Per-request allow/abort decisions for sub-resources.
//!
//! Blocking images also keeps density-suffixed asset names such as
//! `logo@2x.png` out of the rendered DOM, where the email pattern would
//! otherwise pick them up.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Declared type of a sub-resource request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    Xhr,
    Fetch,
    Other,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Stylesheet => "stylesheet",
            Self::Image => "image",
            Self::Media => "media",
            Self::Font => "font",
            Self::Script => "script",
            Self::Xhr => "xhr",
            Self::Fetch => "fetch",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Self::Document),
            "stylesheet" | "style" => Ok(Self::Stylesheet),
            "image" => Ok(Self::Image),
            "media" => Ok(Self::Media),
            "font" => Ok(Self::Font),
            "script" => Ok(Self::Script),
            "xhr" => Ok(Self::Xhr),
            "fetch" => Ok(Self::Fetch),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown resource type '{other}'")),
        }
    }
}

/// What to do with an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Allow,
    Abort,
}

/// Aborts a fixed set of resource types and allows everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFilter {
    blocked: BTreeSet<ResourceKind>,
}

impl Default for ResourceFilter {
    fn default() -> Self {
        Self::blocking([
            ResourceKind::Image,
            ResourceKind::Media,
            ResourceKind::Font,
            ResourceKind::Stylesheet,
        ])
    }
}

impl ResourceFilter {
    /// A filter aborting exactly the given kinds.
    pub fn blocking(kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        Self {
            blocked: kinds.into_iter().collect(),
        }
    }

    /// A filter that lets every request through.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            blocked: BTreeSet::new(),
        }
    }

    /// Build from configured type names. Unknown names are skipped with a warning.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let kinds = names.iter().filter_map(|name| {
            name.as_ref()
                .parse::<ResourceKind>()
                .map_err(|e| tracing::warn!("Ignoring blocked resource type: {}", e))
                .ok()
        });
        Self::blocking(kinds)
    }

    #[must_use]
    pub fn decide(&self, kind: ResourceKind) -> FilterDecision {
        if self.blocked.contains(&kind) {
            FilterDecision::Abort
        } else {
            FilterDecision::Allow
        }
    }

    /// Whether any request type is blocked at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.blocked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let filter = ResourceFilter::default();
        for kind in [
            ResourceKind::Image,
            ResourceKind::Media,
            ResourceKind::Font,
            ResourceKind::Stylesheet,
        ] {
            assert_eq!(filter.decide(kind), FilterDecision::Abort, "{kind}");
        }
        for kind in [
            ResourceKind::Document,
            ResourceKind::Script,
            ResourceKind::Xhr,
            ResourceKind::Fetch,
        ] {
            assert_eq!(filter.decide(kind), FilterDecision::Allow, "{kind}");
        }
    }

    #[test]
    fn test_from_names_skips_unknown() {
        let filter = ResourceFilter::from_names(&["image", "Font", "websocket"]);
        assert_eq!(filter.decide(ResourceKind::Image), FilterDecision::Abort);
        assert_eq!(filter.decide(ResourceKind::Font), FilterDecision::Abort);
        assert_eq!(filter.decide(ResourceKind::Stylesheet), FilterDecision::Allow);
    }

    #[test]
    fn test_allow_all() {
        let filter = ResourceFilter::allow_all();
        assert!(!filter.is_active());
        assert_eq!(filter.decide(ResourceKind::Image), FilterDecision::Allow);
    }
}
