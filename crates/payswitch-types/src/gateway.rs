//! Collaborator traits the handoff core depends on.
//!
//! The core never performs I/O itself. Configuration lookup, context creation
//! and tokenization are delegated to implementors of [`ConfigurationSource`]
//! and [`PaymentGateway`]; their errors are surfaced to callers verbatim.

use std::sync::Arc;

use crate::config::Configuration;
use crate::error::GatewayError;
use crate::proto::{AccountPayload, AuthorizationContext, ContextRequest, TokenizedAccount};

/// Asynchronous lookup of the remote [`Configuration`].
pub trait ConfigurationSource {
    /// Fetches the configuration. Called at most once per flow build.
    fn configuration(&self) -> impl Future<Output = Result<Configuration, GatewayError>> + Send;
}

/// Remote API creating authorization contexts and tokenizing authorized accounts.
pub trait PaymentGateway {
    /// Creates a pending authorization context (approval URL plus correlation id).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on any transport or API failure.
    fn create_authorization_context(
        &self,
        request: &ContextRequest,
    ) -> impl Future<Output = Result<AuthorizationContext, GatewayError>> + Send;

    /// Exchanges an authentic provider-account payload for a nonce.
    ///
    /// Invoked exactly once per authentic return and never retried by the core.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on any transport or API failure.
    fn tokenize(
        &self,
        account: &AccountPayload,
    ) -> impl Future<Output = Result<TokenizedAccount, GatewayError>> + Send;
}

impl<T: ConfigurationSource> ConfigurationSource for Arc<T> {
    fn configuration(&self) -> impl Future<Output = Result<Configuration, GatewayError>> + Send {
        self.as_ref().configuration()
    }
}

impl<T: PaymentGateway> PaymentGateway for Arc<T> {
    fn create_authorization_context(
        &self,
        request: &ContextRequest,
    ) -> impl Future<Output = Result<AuthorizationContext, GatewayError>> + Send {
        self.as_ref().create_authorization_context(request)
    }

    fn tokenize(
        &self,
        account: &AccountPayload,
    ) -> impl Future<Output = Result<TokenizedAccount, GatewayError>> + Send {
        self.as_ref().tokenize(account)
    }
}
