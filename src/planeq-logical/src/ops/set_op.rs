//! Set operation kinds.

use serde::{Deserialize, Serialize};

/// Kind of an n-ary set operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SetOpKind {
    /// UNION.
    Union,
    /// INTERSECT.
    Intersect,
    /// EXCEPT (MINUS); the first child is the minuend.
    Except,
}

impl SetOpKind {
    /// Name used in digests.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Union => "Union",
            Self::Intersect => "Intersect",
            Self::Except => "Except",
        }
    }

    /// Whether children may be reordered.
    pub const fn is_commutative(self) -> bool {
        !matches!(self, Self::Except)
    }
}

impl std::fmt::Display for SetOpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
