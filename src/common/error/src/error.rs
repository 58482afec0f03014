//! Core error types for planeq.

use thiserror::Error;

/// Result type alias using `PlanEqError`.
pub type PlanEqResult<T> = std::result::Result<T, PlanEqError>;

/// Core error type for planeq operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlanEqError {
    /// Malformed or unplannable input query.
    #[error("ParseOrPlanError: {0}")]
    ParseOrPlanError(String),

    /// Subquery decorrelation does not apply to the plan shape.
    ///
    /// Recovered locally by the correlation normalizer.
    #[error("DecorrelationInapplicable: {0}")]
    DecorrelationInapplicable(String),

    /// A rewrite rule failed while transforming a plan.
    #[error("RuleError: {0}")]
    RuleError(String),

    /// The physical-plan oracle could not produce a plan.
    #[error("OracleUnavailable: {0}")]
    OracleUnavailable(String),

    /// The rule advisor failed or returned an unusable answer.
    #[error("AdvisorError: {0}")]
    AdvisorError(String),

    /// Invalid configuration value.
    #[error("ConfigError: {0}")]
    ConfigError(String),

    /// IO error.
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl PlanEqError {
    /// Create a new `ParseOrPlanError`.
    pub fn plan<S: Into<String>>(msg: S) -> Self {
        Self::ParseOrPlanError(msg.into())
    }

    /// Create a new `DecorrelationInapplicable` error.
    pub fn decorrelation<S: Into<String>>(msg: S) -> Self {
        Self::DecorrelationInapplicable(msg.into())
    }

    /// Create a new `RuleError`.
    pub fn rule<S: Into<String>>(msg: S) -> Self {
        Self::RuleError(msg.into())
    }

    /// Create a new `OracleUnavailable` error.
    pub fn oracle<S: Into<String>>(msg: S) -> Self {
        Self::OracleUnavailable(msg.into())
    }

    /// Create a new `AdvisorError`.
    pub fn advisor<S: Into<String>>(msg: S) -> Self {
        Self::AdvisorError(msg.into())
    }

    /// Create a new `ConfigError`.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether the error is recovered locally rather than surfaced to callers.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DecorrelationInapplicable(_) | Self::OracleUnavailable(_)
        )
    }
}

/// Ensure a condition holds, returning the named error variant if not.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $variant:ident: $($msg:tt)*) => {
        if !$cond {
            return Err($crate::PlanEqError::$variant(format!($($msg)*)));
        }
    };
}

/// Return early with a `ParseOrPlanError`.
#[macro_export]
macro_rules! plan_err {
    ($($arg:tt)*) => {
        return Err($crate::PlanEqError::ParseOrPlanError(format!($($arg)*)))
    };
}

/// Return early with a `DecorrelationInapplicable` error.
#[macro_export]
macro_rules! decorrelation_err {
    ($($arg:tt)*) => {
        return Err($crate::PlanEqError::DecorrelationInapplicable(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlanEqError::plan("unexpected token ')'");
        assert_eq!(err.to_string(), "ParseOrPlanError: unexpected token ')'");
    }

    #[test]
    fn test_error_constructors() {
        let _ = PlanEqError::decorrelation("no aggregate above correlated filter");
        let _ = PlanEqError::rule("match limit exceeded");
        let _ = PlanEqError::oracle("no connection");
        let _ = PlanEqError::advisor("empty response");
        let _ = PlanEqError::config("max_passes must be positive");
    }

    #[test]
    fn test_recoverable() {
        assert!(PlanEqError::decorrelation("x").is_recoverable());
        assert!(PlanEqError::oracle("x").is_recoverable());
        assert!(!PlanEqError::plan("x").is_recoverable());
    }

    fn checked(width: usize) -> PlanEqResult<usize> {
        ensure!(width > 0, ConfigError: "width must be positive");
        ensure!(width < 10, DecorrelationInapplicable: "width {} too large", width);
        Ok(width)
    }

    #[test]
    fn test_ensure_macro() {
        assert!(matches!(checked(0), Err(PlanEqError::ConfigError(_))));
        assert!(matches!(checked(12), Err(PlanEqError::DecorrelationInapplicable(_))));
        assert_eq!(checked(3).unwrap(), 3);
    }

    fn parsed(text: &str) -> PlanEqResult<&str> {
        if text.is_empty() {
            plan_err!("empty query");
        }
        Ok(text)
    }

    #[test]
    fn test_plan_err_macro() {
        assert!(matches!(parsed(""), Err(PlanEqError::ParseOrPlanError(_))));
        assert_eq!(parsed("SELECT 1").unwrap(), "SELECT 1");
    }

    #[test]
    fn test_every_variant_has_a_producer() {
        let errors = [
            PlanEqError::plan("x"),
            PlanEqError::decorrelation("x"),
            PlanEqError::rule("x"),
            PlanEqError::oracle("x"),
            PlanEqError::advisor("x"),
            PlanEqError::config("x"),
            PlanEqError::from(std::io::Error::other("x")),
        ];
        let names: Vec<String> = errors
            .iter()
            .map(|e| e.to_string().split(':').next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(
            names,
            [
                "ParseOrPlanError",
                "DecorrelationInapplicable",
                "RuleError",
                "OracleUnavailable",
                "AdvisorError",
                "ConfigError",
                "IoError"
            ]
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PlanEqError = io.into();
        assert!(err.to_string().starts_with("IoError"));
    }
}
