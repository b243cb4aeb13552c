//! Error taxonomy for the authorization handoff.

use crate::outcome::InauthenticReason;
use crate::provider::Provider;

/// Failure reported by a remote collaborator. Passed through to callers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Why a flow ended in failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandoffError {
    /// Remote configuration says the provider is unavailable. Not retried.
    #[error("{provider} is not enabled")]
    FeatureDisabled { provider: Provider },
    /// The configuration lookup itself failed.
    #[error("configuration lookup failed: {0}")]
    Configuration(#[source] GatewayError),
    /// Context creation or tokenization failed remotely.
    #[error(transparent)]
    Remote(#[from] GatewayError),
    /// The remote context could not be turned into a launchable request.
    #[error("malformed authorization context: {0}")]
    MalformedContext(String),
    /// The return did not match the pending request.
    #[error("{0}")]
    Inauthentic(InauthenticReason),
    /// A pending request carries a return-routing code no provider owns.
    #[error("no provider routes request code {0}")]
    UnknownRequestCode(u32),
    /// `start` was called on a flow that already left `Idle`.
    #[error("flow has already been started")]
    AlreadyStarted,
}

impl HandoffError {
    /// True when the failure may indicate tampering rather than an ordinary remote error.
    pub fn is_inauthentic(&self) -> bool {
        matches!(self, HandoffError::Inauthentic(_))
    }
}
