//! Join kinds.

use serde::{Deserialize, Serialize};

/// Kind of a binary join.
///
/// Only [`JoinKind::Inner`] is symmetric; every other kind keeps the
/// identity of its left and right inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinKind {
    /// Inner join.
    #[default]
    Inner,
    /// Left outer join.
    Left,
    /// Right outer join.
    Right,
    /// Full outer join.
    Full,
    /// Left semi join.
    Semi,
    /// Left anti join.
    Anti,
}

impl JoinKind {
    /// Name used in digests.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Full => "FULL",
            Self::Semi => "SEMI",
            Self::Anti => "ANTI",
        }
    }

    /// Whether inputs may be swapped without changing the result.
    pub const fn is_commutative(self) -> bool {
        matches!(self, Self::Inner)
    }

    /// Whether the join outputs only the left input's columns.
    pub const fn projects_left_only(self) -> bool {
        matches!(self, Self::Semi | Self::Anti)
    }
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_kind_names() {
        assert_eq!(JoinKind::Inner.to_string(), "INNER");
        assert_eq!(JoinKind::Anti.to_string(), "ANTI");
        assert_eq!(JoinKind::default(), JoinKind::Inner);
    }

    #[test]
    fn test_join_kind_serde() {
        let json = serde_json::to_string(&JoinKind::Left).unwrap();
        assert_eq!(json, "\"LEFT\"");
        let kind: JoinKind = serde_json::from_str("\"SEMI\"").unwrap();
        assert!(kind.projects_left_only());
    }
}
