//! Role classifier
//!
//! Filters links down to those that carry the requested role. Rules, in
//! priority order:
//!
//! 1. a tag named like the role (case-insensitive) whose category is
//!    `USER_DEFINED`; a same-named `SYSTEM_DEFINED` tag never counts
//! 2. if rule 1 matched nothing and a `USER_DEFINED` descriptor is known, a
//!    tag whose type id equals the descriptor's and whose category is not
//!    `SYSTEM_DEFINED`
//! 3. if still nothing matched and no label is registered for the role,
//!    every link, flagged as a fallback
//! 4. otherwise nothing
//!
//! Output keeps the input order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::types::{LabelCategory, Link, RoleDescriptor};

/// Which rule produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// The organization has no links at all
    NoLinks,
    /// Matched by label name and `USER_DEFINED` category
    LabelMatch,
    /// Matched by association type id
    TypeIdMatch,
    /// No label registered for the role; every link returned unfiltered
    Unfiltered,
    /// The label exists but no link carries it
    NoMatch,
}

impl MatchOutcome {
    /// Whether the result came from the degrade-to-unfiltered rule
    pub fn fallback_applied(&self) -> bool {
        matches!(self, MatchOutcome::Unfiltered)
    }
}

/// Result of classifying a set of links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Matching target ids in link order
    pub target_ids: Vec<String>,
    pub outcome: MatchOutcome,
}

impl Classification {
    pub fn fallback_applied(&self) -> bool {
        self.outcome.fallback_applied()
    }

    pub fn is_empty(&self) -> bool {
        self.target_ids.is_empty()
    }
}

/// Classify links against a role.
///
/// `descriptor` is the catalog's resolution for `role_name`; `None` means
/// the catalog reported that no such label is registered.
pub fn classify(links: &[Link], role_name: &str, descriptor: Option<&RoleDescriptor>) -> Classification {
    if links.is_empty() {
        return Classification {
            target_ids: Vec::new(),
            outcome: MatchOutcome::NoLinks,
        };
    }

    let by_label = select(links, |link| {
        link.labels.iter().any(|tag| tag.is_user_label(role_name))
    });
    if !by_label.is_empty() {
        return Classification {
            target_ids: by_label,
            outcome: MatchOutcome::LabelMatch,
        };
    }

    if let Some(descriptor) = descriptor {
        // A built-in label never identifies a role, not even by type id
        let by_type = if descriptor.category == LabelCategory::SystemDefined {
            Vec::new()
        } else {
            select(links, |link| {
                link.labels.iter().any(|tag| {
                    tag.type_id == Some(descriptor.type_id)
                        && tag.category != Some(LabelCategory::SystemDefined)
                })
            })
        };
        if !by_type.is_empty() {
            debug!(
                role = %role_name,
                type_id = descriptor.type_id,
                matched = by_type.len(),
                "Links matched by type id"
            );
            return Classification {
                target_ids: by_type,
                outcome: MatchOutcome::TypeIdMatch,
            };
        }

        debug!(
            role = %role_name,
            available = %available_labels(links),
            "No links carry the role label"
        );
        return Classification {
            target_ids: Vec::new(),
            outcome: MatchOutcome::NoMatch,
        };
    }

    debug!(
        role = %role_name,
        links = links.len(),
        "Role label not registered, returning links unfiltered"
    );
    Classification {
        target_ids: links.iter().map(|l| l.target_id.clone()).collect(),
        outcome: MatchOutcome::Unfiltered,
    }
}

fn select(links: &[Link], predicate: impl Fn(&Link) -> bool) -> Vec<String> {
    links
        .iter()
        .filter(|link| predicate(link))
        .map(|link| link.target_id.clone())
        .collect()
}

/// Distinct labels present on the links, for diagnostics.
fn available_labels(links: &[Link]) -> String {
    let labels: BTreeSet<String> = links
        .iter()
        .flat_map(|l| l.labels.iter().map(|t| t.describe()))
        .collect();
    labels.into_iter().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LabelTag;

    fn user(name: &str, type_id: u64) -> LabelTag {
        LabelTag::new(name, LabelCategory::UserDefined, type_id)
    }

    fn system(name: &str, type_id: u64) -> LabelTag {
        LabelTag::new(name, LabelCategory::SystemDefined, type_id)
    }

    fn founder_descriptor() -> RoleDescriptor {
        RoleDescriptor::new("Founder", LabelCategory::UserDefined, 3)
    }

    #[test]
    fn test_user_label_beats_system_collision() {
        let links = vec![
            Link::new("A", vec![user("Founder", 3)]),
            Link::new("B", vec![system("Founder", 1)]),
            Link::new("X", vec![user("Mentor", 4)]),
        ];

        let result = classify(&links, "Founder", Some(&founder_descriptor()));

        assert_eq!(result.target_ids, vec!["A"]);
        assert_eq!(result.outcome, MatchOutcome::LabelMatch);
        assert!(!result.fallback_applied());
    }

    #[test]
    fn test_system_only_match_never_classifies() {
        let links = vec![Link::new("B", vec![system("founder", 1)])];

        let result = classify(&links, "Founder", Some(&founder_descriptor()));

        assert!(result.is_empty());
        assert_eq!(result.outcome, MatchOutcome::NoMatch);
    }

    #[test]
    fn test_system_descriptor_never_matches_by_type_id() {
        let links = vec![
            Link::new("B", vec![system("Founder", 1)]),
            Link::new(
                "C",
                vec![LabelTag {
                    name: None,
                    category: None,
                    type_id: Some(1),
                }],
            ),
        ];
        let builtin = RoleDescriptor::new("Founder", LabelCategory::SystemDefined, 1);

        let result = classify(&links, "Founder", Some(&builtin));

        assert!(result.is_empty());
        assert_eq!(result.outcome, MatchOutcome::NoMatch);
        assert!(!result.fallback_applied());
    }

    #[test]
    fn test_type_id_match_skips_system_tags() {
        // Same type id reported under a built-in category
        let links = vec![
            Link::new("B", vec![LabelTag::new("Co-founder", LabelCategory::SystemDefined, 3)]),
            Link::new("C", vec![LabelTag::new("Co-founder", LabelCategory::UserDefined, 3)]),
        ];

        let result = classify(&links, "Founder", Some(&founder_descriptor()));

        assert_eq!(result.target_ids, vec!["C"]);
        assert_eq!(result.outcome, MatchOutcome::TypeIdMatch);
    }

    #[test]
    fn test_name_match_is_case_insensitive() {
        let links = vec![Link::new("A", vec![user("EVENT HOST", 9)])];
        let result = classify(&links, "event host", None);
        assert_eq!(result.target_ids, vec!["A"]);
    }

    #[test]
    fn test_any_tag_on_link_can_match() {
        let links = vec![Link::new("A", vec![system("Primary", 1), user("Founder", 3)])];
        let result = classify(&links, "Founder", Some(&founder_descriptor()));
        assert_eq!(result.target_ids, vec!["A"]);
    }

    #[test]
    fn test_type_id_fallback_for_lossy_links() {
        let links = vec![
            Link::new(
                "A",
                vec![LabelTag {
                    name: Some("Founder".into()),
                    category: None,
                    type_id: Some(3),
                }],
            ),
            Link::new("B", vec![LabelTag::named("Mentor")]),
            Link::new(
                "C",
                vec![LabelTag {
                    name: None,
                    category: None,
                    type_id: Some(3),
                }],
            ),
        ];

        let result = classify(&links, "Founder", Some(&founder_descriptor()));

        assert_eq!(result.target_ids, vec!["A", "C"]);
        assert_eq!(result.outcome, MatchOutcome::TypeIdMatch);
        assert!(!result.fallback_applied());
    }

    #[test]
    fn test_unregistered_label_degrades_to_unfiltered() {
        let links = vec![
            Link::new("Y", vec![user("Mentor", 4)]),
            Link::new("Z", vec![]),
        ];

        let result = classify(&links, "Sponsor", None);

        assert_eq!(result.target_ids, vec!["Y", "Z"]);
        assert_eq!(result.outcome, MatchOutcome::Unfiltered);
        assert!(result.fallback_applied());
    }

    #[test]
    fn test_registered_label_without_matches_is_empty() {
        let links = vec![Link::new("Y", vec![user("Mentor", 4)])];
        let sponsor = RoleDescriptor::new("Sponsor", LabelCategory::UserDefined, 6);

        let result = classify(&links, "Sponsor", Some(&sponsor));

        assert!(result.is_empty());
        assert!(!result.fallback_applied());
    }

    #[test]
    fn test_no_links_is_not_a_fallback() {
        let result = classify(&[], "Sponsor", None);
        assert!(result.is_empty());
        assert_eq!(result.outcome, MatchOutcome::NoLinks);
        assert!(!result.fallback_applied());
    }

    #[test]
    fn test_preserves_input_order() {
        let links = vec![
            Link::new("3", vec![user("Investor", 5)]),
            Link::new("1", vec![user("Investor", 5)]),
            Link::new("2", vec![user("Investor", 5)]),
        ];
        let result = classify(&links, "Investor", None);
        assert_eq!(result.target_ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_available_labels_are_distinct() {
        let links = vec![
            Link::new("A", vec![user("Mentor", 4), system("Primary", 1)]),
            Link::new("B", vec![user("Mentor", 4)]),
        ];
        assert_eq!(
            available_labels(&links),
            "Mentor (USER_DEFINED), Primary (SYSTEM_DEFINED)"
        );
    }
}
