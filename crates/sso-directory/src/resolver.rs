//! Uniqueness-constrained attribute resolution.
//!
//! One search, exactly one entry, attributes renamed per the configured
//! mapping. A missing or unreadable attribute is skipped with a warning;
//! it never aborts the rest of the resolution.

use std::collections::HashMap;

use crate::client::{DirectoryClient, DirectoryEntry, SearchQuery};
use crate::error::{DirectoryError, DirectoryResult};

/// Mapping from directory attribute name to local claim name.
///
/// Keys are unique; names are taken as presented, with no case
/// normalization on the directory side.
pub type AttributeMapping = HashMap<String, String>;

/// Resolved claims: local claim name to a single string value.
///
/// Absent keys mean "not found or not retrievable"; there are never null
/// entries.
pub type ResolvedAttributes = HashMap<String, String>;

/// Resolves directory attributes for one configured search shape.
#[derive(Debug, Clone)]
pub struct AttributeResolver {
    base_dn: String,
    unique_attribute: String,
    mapping: AttributeMapping,
}

impl AttributeResolver {
    /// Creates a resolver for a base DN, unique-match attribute, and
    /// attribute mapping.
    #[must_use]
    pub fn new(
        base_dn: impl Into<String>,
        unique_attribute: impl Into<String>,
        mapping: AttributeMapping,
    ) -> Self {
        Self {
            base_dn: base_dn.into(),
            unique_attribute: unique_attribute.into(),
            mapping,
        }
    }

    /// The configured mapping.
    #[must_use]
    pub const fn mapping(&self) -> &AttributeMapping {
        &self.mapping
    }

    /// Searches for the single entry matching `match_value` and maps its
    /// attributes to local claim names.
    ///
    /// ## Errors
    ///
    /// [`DirectoryError::AmbiguousOrMissingEntry`] when the search matches
    /// zero or more than one entry; directory communication errors
    /// propagate from the client.
    pub async fn resolve(
        &self,
        client: &DirectoryClient,
        match_value: &str,
    ) -> DirectoryResult<ResolvedAttributes> {
        let query = SearchQuery::new(&self.base_dn, &self.unique_attribute, match_value);
        let requested: Vec<&str> = self.mapping.keys().map(String::as_str).collect();

        let entries = client.search(&query, &requested).await?;
        let entry = Self::expect_single(entries, &query)?;

        Ok(self.map_entry(&entry, &query))
    }

    /// Enforces the exactly-one cardinality rule.
    fn expect_single(
        mut entries: Vec<DirectoryEntry>,
        query: &SearchQuery,
    ) -> DirectoryResult<DirectoryEntry> {
        if entries.len() != 1 {
            return Err(DirectoryError::AmbiguousOrMissingEntry {
                count: entries.len(),
                base_dn: query.base_dn.clone(),
                filter: query.filter(),
            });
        }
        Ok(entries.remove(0))
    }

    /// Maps the found entry's attributes onto local claim names, skipping
    /// pairs whose source attribute is absent or unreadable.
    fn map_entry(&self, entry: &DirectoryEntry, query: &SearchQuery) -> ResolvedAttributes {
        let mut resolved = ResolvedAttributes::new();

        for (dir_attr, claim) in &self.mapping {
            if let Some(value) = entry.get_attr(dir_attr) {
                resolved.insert(claim.clone(), value.to_string());
            } else if entry.has_unreadable_attr(dir_attr) {
                tracing::warn!(
                    attribute = dir_attr.as_str(),
                    dn = entry.dn.as_str(),
                    "error when getting directory attribute value"
                );
            } else {
                tracing::warn!(
                    attribute = dir_attr.as_str(),
                    base_dn = query.base_dn.as_str(),
                    filter = %query.filter(),
                    "attribute not found"
                );
            }
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> AttributeMapping {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn entry(dn: &str, attrs: &[(&str, &str)]) -> DirectoryEntry {
        let mut entry = DirectoryEntry {
            dn: dn.to_string(),
            ..DirectoryEntry::default()
        };
        for (name, value) in attrs {
            entry
                .attributes
                .insert((*name).to_string(), vec![(*value).to_string()]);
        }
        entry
    }

    #[test]
    fn maps_existing_attributes_to_claims() {
        let resolver = AttributeResolver::new(
            "dc=example,dc=com",
            "uid",
            mapping(&[("title", "titolo"), ("employeeNumber", "numero")]),
        );
        let query = SearchQuery::new("dc=example,dc=com", "uid", "ldaptest1");
        let found = entry(
            "uid=ldaptest1,dc=example,dc=com",
            &[("title", "Worker"), ("employeeNumber", "42")],
        );

        let resolved = resolver.map_entry(&found, &query);

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["titolo"], "Worker");
        assert_eq!(resolved["numero"], "42");
    }

    #[test]
    fn missing_attribute_is_skipped_not_null() {
        let resolver = AttributeResolver::new(
            "dc=example,dc=com",
            "uid",
            mapping(&[("title", "titolo"), ("nonexistent", "absent")]),
        );
        let query = SearchQuery::new("dc=example,dc=com", "uid", "ldaptest1");
        let found = entry("uid=ldaptest1,dc=example,dc=com", &[("title", "Worker")]);

        let resolved = resolver.map_entry(&found, &query);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["titolo"], "Worker");
        assert!(!resolved.contains_key("absent"));
    }

    #[test]
    fn unreadable_attribute_is_skipped() {
        let resolver = AttributeResolver::new(
            "dc=example,dc=com",
            "uid",
            mapping(&[("photo", "foto"), ("title", "titolo")]),
        );
        let query = SearchQuery::new("dc=example,dc=com", "uid", "ldaptest1");
        let mut found = entry("uid=ldaptest1,dc=example,dc=com", &[("title", "Worker")]);
        found
            .binary_attributes
            .insert("photo".to_string(), vec![vec![0xff, 0xd8]]);

        let resolved = resolver.map_entry(&found, &query);

        assert_eq!(resolved.len(), 1);
        assert!(!resolved.contains_key("foto"));
    }

    #[test]
    fn unmapped_attributes_are_ignored() {
        let resolver =
            AttributeResolver::new("dc=example,dc=com", "uid", mapping(&[("title", "titolo")]));
        let query = SearchQuery::new("dc=example,dc=com", "uid", "ldaptest1");
        let found = entry(
            "uid=ldaptest1,dc=example,dc=com",
            &[("title", "Worker"), ("mail", "x@example.com")],
        );

        let resolved = resolver.map_entry(&found, &query);

        assert_eq!(resolved.len(), 1);
        assert!(!resolved.values().any(|v| v == "x@example.com"));
    }

    #[test]
    fn zero_matches_is_a_cardinality_error() {
        let query = SearchQuery::new("dc=example,dc=com", "uid", "ldaptest1");

        let err = AttributeResolver::expect_single(vec![], &query).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Found 0 record(s) using baseDN dc=example,dc=com and filter (uid=ldaptest1). Expected 1"
        );
    }

    #[test]
    fn multiple_matches_are_a_cardinality_error() {
        let query = SearchQuery::new("dc=example,dc=com", "cn", "smith");
        let entries = vec![
            entry("cn=smith1,dc=example,dc=com", &[]),
            entry("cn=smith2,dc=example,dc=com", &[]),
        ];

        let err = AttributeResolver::expect_single(entries, &query).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Found 2 record(s) using baseDN dc=example,dc=com and filter (cn=smith). Expected 1"
        );
    }

    #[test]
    fn single_match_passes_through() {
        let query = SearchQuery::new("dc=example,dc=com", "uid", "ldaptest1");
        let entries = vec![entry("uid=ldaptest1,dc=example,dc=com", &[])];

        let found = AttributeResolver::expect_single(entries, &query).unwrap();
        assert_eq!(found.dn, "uid=ldaptest1,dc=example,dc=com");
    }
}
