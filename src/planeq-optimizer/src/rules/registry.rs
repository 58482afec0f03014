//! Immutable catalogue of named rewrite rules.

use super::{
    AggregateRemoveRule, FilterIntoJoinRule, FilterMergeRule, FilterProjectTransposeRule,
    JoinAssociateRule, JoinCommuteRule, ProjectMergeRule, ProjectRemoveRule, PushNotDownRule,
    ReduceExpressionsRule, RewriteRule, SetOpMergeRule, SortRemoveRule,
};

static CATALOGUE: &[&dyn RewriteRule] = &[
    &ProjectMergeRule,
    &ProjectRemoveRule,
    &FilterMergeRule,
    &FilterProjectTransposeRule,
    &FilterIntoJoinRule,
    &JoinCommuteRule,
    &JoinAssociateRule,
    &AggregateRemoveRule,
    &SortRemoveRule,
    &SetOpMergeRule::UNION,
    &SetOpMergeRule::INTERSECT,
    &SetOpMergeRule::MINUS,
    &ReduceExpressionsRule::ALL,
    &ReduceExpressionsRule::FILTER,
    &ReduceExpressionsRule::PROJECT,
    &ReduceExpressionsRule::JOIN,
    &PushNotDownRule,
];

/// Alternative spellings, by lookup key.
static ALIASES: &[(&str, &str)] = &[("filterjoinrule", "filterintojoinrule")];

/// Lookup key: lower case, separators removed, `rule` suffix implied.
fn lookup_key(name: &str) -> String {
    let mut key: String = name
        .chars()
        .filter(|c| *c != '_' && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    if !key.ends_with("rule") {
        key.push_str("rule");
    }
    key
}

/// Resolve a rule by name.
///
/// Matching ignores case, underscores and a missing `Rule` suffix, so
/// `ProjectMergeRule`, `projectmergerule` and `project_merge` all resolve.
pub fn lookup(name: &str) -> Option<&'static dyn RewriteRule> {
    let key = lookup_key(name);
    let key = ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key.as_str(), |(_, target)| target);
    CATALOGUE
        .iter()
        .copied()
        .find(|rule| lookup_key(rule.name()) == key)
}

/// Names of every rule in the catalogue.
pub fn supported_rules() -> Vec<&'static str> {
    CATALOGUE.iter().map(|rule| rule.name()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_spellings() {
        for name in ["ProjectMergeRule", "projectmergerule", "project_merge", "PROJECTMERGE"] {
            assert_eq!(lookup(name).map(|r| r.name()), Some("ProjectMergeRule"), "{name}");
        }
    }

    #[test]
    fn test_alias() {
        assert_eq!(lookup("FilterJoinRule").map(|r| r.name()), Some("FilterIntoJoinRule"));
    }

    #[test]
    fn test_unknown() {
        assert!(lookup("AggregateJoinTransposeRule").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_catalogue_names_unique_and_resolvable() {
        let names = supported_rules();
        for name in &names {
            assert_eq!(lookup(name).map(|r| r.name()), Some(*name));
        }
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }
}
