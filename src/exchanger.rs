//! Tokenization exchanger: trades an authentic return for a nonce.

use payswitch_types::codec::DecodedMetadata;
use payswitch_types::error::HandoffError;
use payswitch_types::gateway::PaymentGateway;
use payswitch_types::outcome::{AuthenticReturn, TerminalResult};
use payswitch_types::proto::AccountPayload;
use payswitch_types::provider::Provider;
use tracing::instrument;

/// Builds the provider-account payload for an authentic return.
pub fn account_payload(
    provider: Provider,
    authentic: AuthenticReturn,
    metadata: &DecodedMetadata,
) -> AccountPayload {
    AccountPayload {
        source: metadata
            .source
            .clone()
            .unwrap_or_else(|| provider.profile().source.to_string()),
        payment_type: authentic.payment_type,
        client_metadata_id: metadata.client_metadata_id.clone().unwrap_or_default(),
        correlation_token: authentic.correlation_token,
        url_response_data: authentic.url_response,
        merchant_account_id: metadata.merchant_account_id.clone(),
        intent: metadata.intent,
    }
}

/// Calls the gateway's tokenize operation once. Errors pass through unchanged.
#[instrument(name = "payswitch.exchanger.tokenize", skip_all, fields(provider = %provider))]
pub async fn tokenize<G: PaymentGateway>(
    gateway: &G,
    provider: Provider,
    authentic: AuthenticReturn,
    metadata: &DecodedMetadata,
) -> TerminalResult {
    let payload = account_payload(provider, authentic, metadata);
    match gateway.tokenize(&payload).await {
        Ok(account) => {
            tracing::debug!("account tokenized");
            TerminalResult::Success(account)
        }
        Err(error) => {
            tracing::debug!(%error, "tokenization failed");
            TerminalResult::Failure(HandoffError::Remote(error))
        }
    }
}
