//! Partial-load directives.

use std::collections::BTreeSet;

/// Relaxes required-field enforcement during a load.
///
/// Paths are dotted (`"main.width"`); [`Partial::descend`] narrows them as a
/// load moves into a nested schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Partial {
    /// Every required field is enforced.
    #[default]
    None,
    /// No required field is enforced, at any depth.
    All,
    /// Only the listed paths are waived.
    Paths(BTreeSet<String>),
}

impl Partial {
    pub fn paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Partial::Paths(paths.into_iter().map(Into::into).collect())
    }

    /// Whether a missing `field` at this level is acceptable.
    pub fn waives(&self, field: &str) -> bool {
        match self {
            Partial::None => false,
            Partial::All => true,
            Partial::Paths(paths) => paths.contains(field),
        }
    }

    /// The directive that applies inside the nested value stored under `field`.
    pub fn descend(&self, field: &str) -> Partial {
        match self {
            Partial::None => Partial::None,
            Partial::All => Partial::All,
            Partial::Paths(paths) => {
                let prefix = format!("{field}.");
                let nested: BTreeSet<String> = paths
                    .iter()
                    .filter_map(|p| p.strip_prefix(&prefix))
                    .map(str::to_string)
                    .collect();
                if nested.is_empty() {
                    Partial::None
                } else {
                    Partial::Paths(nested)
                }
            }
        }
    }
}
