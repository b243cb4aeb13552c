//! Wire types exchanged with the remote gateway.
//!
//! - [`ContextRequest`] / [`AuthorizationContext`] - create an authorization context
//! - [`AccountPayload`] / [`TokenizedAccount`] - exchange an authentic return for a nonce
//!
//! All types serialize to JSON using camelCase field names.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::outcome::UrlResponseData;
use crate::provider::{PaymentType, Provider};
use crate::request::Intent;
use crate::util::MoneyAmount;

/// Request to create a pending authorization context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextRequest {
    pub provider: Provider,
    pub payment_type: PaymentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<MoneyAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub pay_later: bool,
    #[serde(default)]
    pub offer_credit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_agreement_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_account_id: Option<String>,
    pub return_url: Url,
    pub cancel_url: Url,
}

/// Response of a successful context creation.
///
/// URLs stay as strings here; the request builder is responsible for checking them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationContext {
    pub approval_url: String,
    pub success_url: String,
    pub correlation_id: String,
    pub client_metadata_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

/// Provider-account payload submitted for tokenization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPayload {
    pub source: String,
    pub payment_type: PaymentType,
    pub client_metadata_id: String,
    pub correlation_token: String,
    pub url_response_data: UrlResponseData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

/// A tokenized payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizedAccount {
    pub nonce: String,
    /// Provider account details, opaque to the handoff.
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub is_default: bool,
}
