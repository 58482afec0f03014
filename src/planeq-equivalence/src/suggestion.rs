//! Rule advisor answers.

use std::fmt;

use common_error::{PlanEqError, PlanEqResult};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The advisor's opinion on whether two plans are equivalent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    True,
    False,
    #[default]
    DontKnow,
}

impl Verdict {
    /// Parse a verdict token, case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "dont_know" | "dont know" | "don't know" | "unknown" => Some(Self::DontKnow),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::DontKnow => write!(f, "dont_know"),
        }
    }
}

/// Rules suggested by an advisor for bringing two plans together.
///
/// `preconditions` and `reasoning` are informational; only the verdict and
/// the rule names drive the comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSuggestion {
    pub verdict: Verdict,
    pub rules: Vec<String>,
    pub preconditions: Vec<String>,
    pub reasoning: Option<String>,
}

const NO_TRANSFORMATIONS: &[&str] = &["no transformations needed", "no transformations found"];

impl RuleSuggestion {
    /// A suggestion carrying the given verdict and rules.
    pub fn new<S: Into<String>>(verdict: Verdict, rules: impl IntoIterator<Item = S>) -> Self {
        Self {
            verdict,
            rules: rules.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// An empty `dont_know` suggestion.
    pub fn dont_know() -> Self {
        Self::default()
    }

    /// Attach preconditions.
    #[must_use]
    pub fn with_preconditions<S: Into<String>>(mut self, preconditions: impl IntoIterator<Item = S>) -> Self {
        self.preconditions = preconditions.into_iter().map(Into::into).collect();
        self
    }

    /// Parse the JSON object contract.
    ///
    /// Text around the outermost `{...}` (code fences, prose) is ignored.
    /// `equivalent` may be a boolean or one of `"true"`, `"false"`, `"dont_know"`.
    pub fn from_json(text: &str) -> PlanEqResult<Self> {
        let start = text.find('{');
        let end = text.rfind('}');
        let body = match (start, end) {
            (Some(start), Some(end)) if start < end => &text[start..=end],
            _ => return Err(PlanEqError::advisor("no JSON object in advisor response")),
        };
        let value: Value = serde_json::from_str(body)?;

        let verdict = match value.get("equivalent") {
            Some(Value::Bool(true)) => Verdict::True,
            Some(Value::Bool(false)) => Verdict::False,
            Some(Value::String(token)) => Verdict::parse(token)
                .ok_or_else(|| PlanEqError::advisor(format!("unknown verdict '{token}'")))?,
            Some(other) => {
                return Err(PlanEqError::advisor(format!("unexpected verdict value {other}")));
            }
            None => return Err(PlanEqError::advisor("advisor response lacks 'equivalent'")),
        };

        Ok(Self {
            verdict,
            rules: string_list(value.get("transformations"))
                .into_iter()
                .filter(|rule| !is_no_transformations(rule))
                .collect(),
            preconditions: string_list(value.get("preconditions")),
            reasoning: value
                .get("reasoning")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        })
    }

    /// Parse the line contract.
    ///
    /// The first non-blank line is `true` or `false`; each remaining non-blank
    /// line names a rule. A lone "No transformations needed" means no rules.
    pub fn from_lines(text: &str) -> PlanEqResult<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        let first = lines
            .next()
            .ok_or_else(|| PlanEqError::advisor("empty advisor response"))?;
        let verdict = match Verdict::parse(first) {
            Some(Verdict::DontKnow) | None => {
                return Err(PlanEqError::advisor(format!(
                    "first line must be true or false, got '{first}'"
                )));
            }
            Some(verdict) => verdict,
        };
        let rules: Vec<String> = lines
            .filter(|line| !is_no_transformations(line))
            .map(str::to_string)
            .collect();
        Ok(Self::new(verdict, rules))
    }

    /// Parse either contract, never failing.
    ///
    /// Malformed responses are logged and yield [`RuleSuggestion::dont_know`].
    pub fn parse(text: &str) -> Self {
        let result = if text.trim_start().starts_with('{') || text.contains("```") {
            Self::from_json(text)
        } else {
            Self::from_lines(text)
        };
        result.unwrap_or_else(|e| {
            warn!("Ignoring malformed advisor response: {e}");
            Self::dont_know()
        })
    }
}

fn is_no_transformations(line: &str) -> bool {
    let line = line.trim().trim_end_matches('.').to_ascii_lowercase();
    NO_TRANSFORMATIONS.contains(&line.as_str())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single.trim().to_string()],
        _ => Vec::new(),
    }
}
