use cicd_stack_core::SynthError;

use crate::state::DeployedState;

/// All errors that can be returned while provisioning a stack.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// A temporary provider failure (throttling, eventual consistency).
    /// The convergence driver retries these with backoff.
    #[error("transient provider error on '{resource}': {message}")]
    Transient { resource: String, message: String },

    /// The provider refused because the physical name is already taken.
    #[error("naming conflict on '{resource}': {message}")]
    Conflict { resource: String, message: String },

    /// An account or service limit was reached.
    #[error("quota exceeded for '{resource}': {message}")]
    QuotaExceeded { resource: String, message: String },

    /// Any other non-retryable provider failure.
    #[error("provider rejected '{resource}': {message}")]
    Rejected { resource: String, message: String },

    /// A reference points at a resource (or attribute) that does not exist yet.
    #[error("resource '{resource}' references '{target}', which has not been materialized")]
    UnresolvedReference { resource: String, target: String },

    /// Outputs were requested from a stack that has not finished converging.
    #[error("stack '{stack}' is not materialized")]
    NotMaterialized { stack: String },

    /// The desired template itself is invalid.
    #[error(transparent)]
    Template(#[from] SynthError),
}

impl ProvisionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProvisionError::Transient { .. })
    }
}

/// A failed convergence. The engine does not roll back: `partial` holds
/// every resource that was materialized before the failure, so a re-run
/// can pick up from there.
#[derive(Debug, thiserror::Error)]
#[error("deployment of stack '{stack}' failed: {error}")]
pub struct ConvergeError {
    pub stack: String,
    #[source]
    pub error: ProvisionError,
    pub partial: Box<DeployedState>,
}
