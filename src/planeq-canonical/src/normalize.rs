//! Textual digest normalization.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Token substituted for every positional column reference.
pub const POSITION_PLACEHOLDER: &str = "$x";

/// Quoted literals and identifiers, standalone positional references and
/// whitespace runs. A `$N` glued to a word character (`EXPR$0`) is part of a
/// name and is not matched.
static DIGEST_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<quoted>'(?:[^']|'')*'|"(?:[^"]|"")*")|(?P<position>\B\$\d+\b)|(?P<space>\s+)"#)
        .expect("digest token pattern")
});

/// Replace positional references (`$0`, `$12`, ...) with [`POSITION_PLACEHOLDER`],
/// collapse whitespace runs to one space and trim.
///
/// Text inside single or double quotes is copied unchanged.
pub fn normalize_digest(digest: &str) -> String {
    DIGEST_TOKEN
        .replace_all(digest, |caps: &Captures<'_>| {
            if let Some(quoted) = caps.name("quoted") {
                quoted.as_str().to_string()
            } else if caps.name("position").is_some() {
                POSITION_PLACEHOLDER.to_string()
            } else {
                " ".to_string()
            }
        })
        .trim()
        .to_string()
}
