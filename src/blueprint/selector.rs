//! Scope selection over blueprint documents.

use super::{BlueprintDocument, EnvironmentEntry, TagValue};

/// Returns `true` when `doc.tags[target_key]` is a list containing
/// `target_value`.
///
/// An absent key, a non-list value, or a list without the value all yield
/// `false`.
#[must_use]
pub fn is_in_scope(doc: &BlueprintDocument, target_key: &str, target_value: &str) -> bool {
    matches!(
        doc.tags.get(target_key),
        Some(TagValue::List(values)) if values.iter().any(|value| value == target_value)
    )
}

/// Yields the environment entries placed in `environment` and `datacenter`,
/// in source order. Entries missing either label never match.
pub fn matching_environments<'a>(
    doc: &'a BlueprintDocument,
    environment: &'a str,
    datacenter: &'a str,
) -> impl Iterator<Item = &'a EnvironmentEntry> + 'a {
    doc.environments
        .iter()
        .filter(move |entry| entry.is_placed_in(environment, datacenter))
}

/// The scope of one audit run: the target tag and the placement to inspect.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selection {
    /// Top-level key whose list must contain `target_value`.
    pub target_key: String,
    /// Value that marks a document as in scope.
    pub target_value: String,
    /// Environment label to match.
    pub environment: String,
    /// Datacenter label to match.
    pub datacenter: String,
}

impl Selection {
    /// Returns `true` when the document carries the target tag.
    #[must_use]
    pub fn includes(&self, doc: &BlueprintDocument) -> bool {
        is_in_scope(doc, &self.target_key, &self.target_value)
    }

    /// Yields the document's entries for the selected placement.
    pub fn environments<'a>(
        &'a self,
        doc: &'a BlueprintDocument,
    ) -> impl Iterator<Item = &'a EnvironmentEntry> + 'a {
        matching_environments(doc, &self.environment, &self.datacenter)
    }

    /// Returns `true` when the document is in scope and declares at least one
    /// entry for the selected placement.
    #[must_use]
    pub fn covers(&self, doc: &BlueprintDocument) -> bool {
        self.includes(doc) && self.environments(doc).next().is_some()
    }
}
