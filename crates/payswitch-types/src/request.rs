//! Request-side types: what the caller asks for and what it gets back to launch.
//!
//! - [`PaymentRequestVariant`] - caller-supplied checkout or vault request
//! - [`PendingAuthorization`] - correlation data for one in-flight authorization
//! - [`LaunchDescriptor`] - everything the external launcher needs
//! - [`PendingRequest`] - the persistable carrier that survives process death

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use url::Url;

use crate::codec::MetadataBlob;
use crate::provider::PaymentType;
use crate::util::MoneyAmount;

/// Payment intent for a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Authorize,
    Sale,
    Order,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Authorize => "authorize",
            Intent::Sale => "sale",
            Intent::Order => "order",
        }
    }
}

impl Display for Intent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "authorize" => Ok(Intent::Authorize),
            "sale" => Ok(Intent::Sale),
            "order" => Ok(Intent::Order),
            _ => Err(format!("unrecognized intent: {s}")),
        }
    }
}

/// A caller-supplied payment request. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PaymentRequestVariant {
    /// A one-time payment for a known amount.
    Checkout {
        amount: MoneyAmount,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        currency_code: Option<String>,
        intent: Intent,
        #[serde(default)]
        pay_later: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        merchant_account_id: Option<String>,
    },
    /// A stored agreement for future payments.
    Vault {
        #[serde(default)]
        offer_credit: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        billing_agreement_description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        merchant_account_id: Option<String>,
    },
}

impl PaymentRequestVariant {
    pub fn checkout(amount: MoneyAmount, intent: Intent) -> Self {
        PaymentRequestVariant::Checkout {
            amount,
            currency_code: None,
            intent,
            pay_later: false,
            merchant_account_id: None,
        }
    }

    pub fn vault() -> Self {
        PaymentRequestVariant::Vault {
            offer_credit: false,
            billing_agreement_description: None,
            merchant_account_id: None,
        }
    }

    /// The payment type is fixed by the variant tag alone.
    pub fn payment_type(&self) -> PaymentType {
        match self {
            PaymentRequestVariant::Checkout { .. } => PaymentType::SinglePayment,
            PaymentRequestVariant::Vault { .. } => PaymentType::BillingAgreement,
        }
    }

    pub fn intent(&self) -> Option<Intent> {
        match self {
            PaymentRequestVariant::Checkout { intent, .. } => Some(*intent),
            PaymentRequestVariant::Vault { .. } => None,
        }
    }

    pub fn merchant_account_id(&self) -> Option<&str> {
        match self {
            PaymentRequestVariant::Checkout {
                merchant_account_id,
                ..
            }
            | PaymentRequestVariant::Vault {
                merchant_account_id,
                ..
            } => merchant_account_id.as_deref(),
        }
    }
}

/// Correlation data for one in-flight authorization.
///
/// Never persisted on its own: it travels encoded inside the [`LaunchDescriptor`]
/// metadata and is recovered from there on return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAuthorization {
    pub correlation_id: String,
    pub approval_url: Url,
    pub success_url: Url,
    pub client_metadata_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    pub payment_type: PaymentType,
    pub source: String,
}

/// Return-routing key the platform uses to hand the asynchronous return back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRoute {
    pub request_code: u32,
    pub return_url_scheme: String,
}

/// Everything the external launch adapter needs, owned by the caller until launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchDescriptor {
    pub pending: PendingAuthorization,
    /// URL (or app link) the launcher opens.
    pub target: Url,
    pub route: ReturnRoute,
    pub launch_as_new_task: bool,
    pub metadata: MetadataBlob,
}

impl LaunchDescriptor {
    /// Carrier the host persists alongside the launch so the flow can be restored.
    pub fn pending_request(&self) -> PendingRequest {
        PendingRequest {
            request_code: self.route.request_code,
            metadata: self.metadata.clone(),
        }
    }
}

/// Persistable form of an in-flight flow: routing key plus encoded metadata.
///
/// The string form is `<request_code>:<metadata blob>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub request_code: u32,
    pub metadata: MetadataBlob,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed pending request: {0}")]
pub struct PendingRequestParseError(&'static str);

impl Display for PendingRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.request_code, self.metadata)
    }
}

impl FromStr for PendingRequest {
    type Err = PendingRequestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (code, blob) = s
            .split_once(':')
            .ok_or(PendingRequestParseError("missing separator"))?;
        let request_code = code
            .parse::<u32>()
            .map_err(|_| PendingRequestParseError("request code is not a number"))?;
        if blob.is_empty() {
            return Err(PendingRequestParseError("empty metadata"));
        }
        Ok(PendingRequest {
            request_code,
            metadata: MetadataBlob::from_encoded(blob),
        })
    }
}
