//! Rewrite errors
//!
//! These indicate a defect in a rule definition, not in the user's query.

use thiserror::Error;

/// Result type for rule application
pub type RewriteResult<T> = Result<T, RewriteError>;

/// A rewrite rule could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// Replacement asked for a variable its pattern never binds
    #[error("Rule {rule}: variable {variable} is not bound")]
    UnboundVariable { rule: String, variable: String },

    /// Replacement function failed
    #[error("Rule {rule} failed: {reason}")]
    Replacement { rule: String, reason: String },

    /// Rules kept rewriting past the pass cap
    #[error("Rewrite did not reach a fixed point; last rule applied: {rule}")]
    NoFixedPoint { rule: String },
}

impl RewriteError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            RewriteError::UnboundVariable { .. } => "QDX_REWRITE_UNBOUND_VARIABLE",
            RewriteError::Replacement { .. } => "QDX_REWRITE_FAILED",
            RewriteError::NoFixedPoint { .. } => "QDX_REWRITE_NO_FIXED_POINT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_variable_names_rule_and_variable() {
        let err = RewriteError::UnboundVariable {
            rule: "fold_status".into(),
            variable: "S".into(),
        };
        assert_eq!(err.to_string(), "Rule fold_status: variable S is not bound");
        assert_eq!(err.code(), "QDX_REWRITE_UNBOUND_VARIABLE");
    }
}
