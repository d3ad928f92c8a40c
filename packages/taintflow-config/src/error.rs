use thiserror::Error;

/// Errors raised while loading or validating a rule set.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("action {action} is not allowed in {rule_kind} rules")]
    ForbiddenAction {
        rule_kind: &'static str,
        action: String,
    },

    #[error("invalid regex pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to parse rule set JSON")]
    Parse(#[from] serde_json::Error),
}
