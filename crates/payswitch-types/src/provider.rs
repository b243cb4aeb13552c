//! Provider and payment-type lookup table.
//!
//! Every provider-specific constant the handoff needs (launch-surface tag,
//! correlation token keys, return-routing request code, analytics event names)
//! lives in one static [`ProviderProfile`] per [`Provider`]. Flow code selects a
//! profile by tag and never branches on the provider itself.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::analytics::FlowEvent;

/// External surface a payment method is authorized on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// PayPal web authorization through a browser switch.
    PayPal,
    /// Venmo authorization through an app switch.
    Venmo,
}

/// Whether the authorization is for a one-off payment or a stored agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    #[serde(rename = "single-payment")]
    SinglePayment,
    #[serde(rename = "billing-agreement")]
    BillingAgreement,
}

/// Static, per-provider constants.
#[derive(Debug)]
pub struct ProviderProfile {
    /// Launch-surface tag recorded in metadata and on the tokenized account.
    pub source: &'static str,
    /// Name of the feature flag that must be enabled in the remote configuration.
    pub feature: &'static str,
    /// Return-routing key the host uses to dispatch the asynchronous return.
    pub request_code: u32,
    single_payment_token_key: &'static str,
    billing_agreement_token_key: &'static str,
    started_event: &'static str,
    failed_event: &'static str,
    canceled_event: &'static str,
    succeeded_event: &'static str,
}

static PAYPAL: ProviderProfile = ProviderProfile {
    source: "paypal-browser",
    feature: "paypal",
    request_code: 13591,
    single_payment_token_key: "token",
    billing_agreement_token_key: "ba_token",
    started_event: "paypal:tokenize:started",
    failed_event: "paypal:tokenize:failed",
    canceled_event: "paypal:tokenize:browser-login:canceled",
    succeeded_event: "paypal:tokenize:succeeded",
};

static VENMO: ProviderProfile = ProviderProfile {
    source: "venmo-app",
    feature: "venmo",
    request_code: 13488,
    single_payment_token_key: "resource_id",
    billing_agreement_token_key: "resource_id",
    started_event: "venmo:tokenize:started",
    failed_event: "venmo:tokenize:failed",
    canceled_event: "venmo:tokenize:app-switch:canceled",
    succeeded_event: "venmo:tokenize:succeeded",
};

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::PayPal, Provider::Venmo];

    pub fn profile(&self) -> &'static ProviderProfile {
        match self {
            Provider::PayPal => &PAYPAL,
            Provider::Venmo => &VENMO,
        }
    }

    /// Looks up the provider owning a return-routing request code.
    pub fn by_request_code(request_code: u32) -> Option<Provider> {
        Self::ALL
            .into_iter()
            .find(|p| p.profile().request_code == request_code)
    }
}

impl ProviderProfile {
    /// Query-parameter key carrying the correlation token for a payment type.
    pub fn token_key(&self, payment_type: PaymentType) -> &'static str {
        match payment_type {
            PaymentType::SinglePayment => self.single_payment_token_key,
            PaymentType::BillingAgreement => self.billing_agreement_token_key,
        }
    }

    /// Analytics event name for a flow transition.
    pub fn event_name(&self, event: FlowEvent) -> &'static str {
        match event {
            FlowEvent::Started => self.started_event,
            FlowEvent::Failed => self.failed_event,
            FlowEvent::Canceled => self.canceled_event,
            FlowEvent::Succeeded => self.succeeded_event,
        }
    }
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::SinglePayment => "single-payment",
            PaymentType::BillingAgreement => "billing-agreement",
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::PayPal => write!(f, "paypal"),
            Provider::Venmo => write!(f, "venmo"),
        }
    }
}

impl Display for PaymentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized {kind}: {value}")]
pub struct UnrecognizedTag {
    kind: &'static str,
    value: String,
}

impl FromStr for Provider {
    type Err = UnrecognizedTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "paypal" => Ok(Provider::PayPal),
            "venmo" => Ok(Provider::Venmo),
            _ => Err(UnrecognizedTag {
                kind: "provider",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for PaymentType {
    type Err = UnrecognizedTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("billing-agreement") {
            Ok(PaymentType::BillingAgreement)
        } else if s.eq_ignore_ascii_case("single-payment") {
            Ok(PaymentType::SinglePayment)
        } else {
            Err(UnrecognizedTag {
                kind: "payment type",
                value: s.to_string(),
            })
        }
    }
}
