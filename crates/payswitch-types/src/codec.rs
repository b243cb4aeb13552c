//! Metadata codec for pending authorizations.
//!
//! A [`PendingAuthorization`] is flattened into a fixed set of string keys,
//! serialized as a JSON object and carried as URL-safe base64 ([`MetadataBlob`]).
//! Decoding is lenient: unknown keys are ignored, and missing or malformed
//! values decode as unset. Whether the result is usable is decided separately
//! by [`DecodedMetadata::into_pending`].

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use url::Url;

use crate::provider::PaymentType;
use crate::request::{Intent, PendingAuthorization};
use crate::util::Base64Bytes;

pub const APPROVAL_URL: &str = "approval-url";
pub const SUCCESS_URL: &str = "success-url";
pub const PAYMENT_TYPE: &str = "payment-type";
pub const CLIENT_METADATA_ID: &str = "client-metadata-id";
pub const MERCHANT_ACCOUNT_ID: &str = "merchant-account-id";
pub const INTENT: &str = "intent";
pub const SOURCE: &str = "source";
pub const CORRELATION_ID: &str = "correlation-id";

/// Opaque encoded metadata attached to a launch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataBlob(String);

impl MetadataBlob {
    /// Wraps an already-encoded blob, e.g. one read back from storage.
    pub fn from_encoded<S: Into<String>>(encoded: S) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MetadataBlob {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wire shape of the flattened metadata. Field order fixes the encoding.
#[derive(Serialize)]
struct MetadataWire<'a> {
    #[serde(rename = "approval-url")]
    approval_url: &'a str,
    #[serde(rename = "success-url")]
    success_url: &'a str,
    #[serde(rename = "payment-type")]
    payment_type: &'static str,
    #[serde(rename = "client-metadata-id")]
    client_metadata_id: &'a str,
    #[serde(rename = "merchant-account-id", skip_serializing_if = "Option::is_none")]
    merchant_account_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<&'static str>,
    source: &'a str,
    #[serde(rename = "correlation-id")]
    correlation_id: &'a str,
}

/// Encodes a pending authorization into its opaque carrier.
pub fn encode(pending: &PendingAuthorization) -> MetadataBlob {
    let wire = MetadataWire {
        approval_url: pending.approval_url.as_str(),
        success_url: pending.success_url.as_str(),
        payment_type: pending.payment_type.as_str(),
        client_metadata_id: &pending.client_metadata_id,
        merchant_account_id: pending.merchant_account_id.as_deref(),
        intent: pending.intent.as_ref().map(Intent::as_str),
        source: &pending.source,
        correlation_id: &pending.correlation_id,
    };
    // A struct of borrowed strings always serializes.
    let json = serde_json::to_vec(&wire).unwrap_or_default();
    MetadataBlob(Base64Bytes::encode(json).to_string())
}

/// Metadata recovered from a blob. Every field may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedMetadata {
    pub approval_url: Option<Url>,
    pub success_url: Option<Url>,
    pub payment_type: Option<PaymentType>,
    pub client_metadata_id: Option<String>,
    pub merchant_account_id: Option<String>,
    pub intent: Option<Intent>,
    pub source: Option<String>,
    pub correlation_id: Option<String>,
}

/// A required metadata field was missing or unreadable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("pending request metadata is missing `{0}`")]
    Missing(&'static str),
}

/// Decodes a blob. Never fails: anything unreadable decodes as unset.
pub fn decode(blob: &MetadataBlob) -> DecodedMetadata {
    let object = Base64Bytes::from(blob.as_str())
        .decode()
        .ok()
        .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok());
    let Some(serde_json::Value::Object(object)) = object else {
        tracing::debug!("metadata blob is not a JSON object, decoding as empty");
        return DecodedMetadata::default();
    };
    let string = |key: &str| {
        object
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    DecodedMetadata {
        approval_url: string(APPROVAL_URL).and_then(|s| Url::parse(&s).ok()),
        success_url: string(SUCCESS_URL).and_then(|s| Url::parse(&s).ok()),
        payment_type: string(PAYMENT_TYPE).and_then(|s| s.parse().ok()),
        client_metadata_id: string(CLIENT_METADATA_ID),
        merchant_account_id: string(MERCHANT_ACCOUNT_ID),
        intent: string(INTENT).and_then(|s| s.parse().ok()),
        source: string(SOURCE),
        correlation_id: string(CORRELATION_ID),
    }
}

impl DecodedMetadata {
    /// Rebuilds the pending authorization, requiring approval URL, success URL
    /// and payment type.
    pub fn into_pending(self) -> Result<PendingAuthorization, MetadataError> {
        let approval_url = self.approval_url.ok_or(MetadataError::Missing(APPROVAL_URL))?;
        let success_url = self.success_url.ok_or(MetadataError::Missing(SUCCESS_URL))?;
        let payment_type = self.payment_type.ok_or(MetadataError::Missing(PAYMENT_TYPE))?;
        Ok(PendingAuthorization {
            correlation_id: self.correlation_id.unwrap_or_default(),
            approval_url,
            success_url,
            client_metadata_id: self.client_metadata_id.unwrap_or_default(),
            merchant_account_id: self.merchant_account_id,
            intent: self.intent,
            payment_type,
            source: self.source.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> PendingAuthorization {
        PendingAuthorization {
            correlation_id: "EC-123".into(),
            approval_url: Url::parse("https://x/checkoutnow?token=EC-123").unwrap(),
            success_url: Url::parse("https://x/success").unwrap(),
            client_metadata_id: "cmid".into(),
            merchant_account_id: None,
            intent: Some(Intent::Authorize),
            payment_type: PaymentType::SinglePayment,
            source: "paypal-browser".into(),
        }
    }

    fn blob_of(json: serde_json::Value) -> MetadataBlob {
        MetadataBlob(Base64Bytes::encode(json.to_string()).to_string())
    }

    #[test]
    fn test_encode_is_deterministic_and_reversible() {
        let a = encode(&pending());
        let b = encode(&pending());
        assert_eq!(a, b);
        assert_eq!(decode(&a).into_pending().unwrap(), pending());
    }

    #[test]
    fn test_unset_optionals_are_omitted() {
        let blob = encode(&pending());
        let bytes = Base64Bytes::from(blob.as_str()).decode().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json.get(MERCHANT_ACCOUNT_ID).is_none());
        assert_eq!(json[INTENT], "authorize");
        assert_eq!(json[PAYMENT_TYPE], "single-payment");
    }

    #[test]
    fn test_decode_ignores_unknown_and_malformed_fields() {
        let blob = blob_of(serde_json::json!({
            "approval-url": "https://x/a?ba_token=BA-1",
            "success-url": "https://x/success",
            "payment-type": "billing-agreement",
            "intent": 42,
            "merchant-account-id": null,
            "something-new": "ignored",
        }));
        let decoded = decode(&blob);
        assert_eq!(decoded.intent, None);
        assert_eq!(decoded.merchant_account_id, None);
        assert_eq!(decoded.payment_type, Some(PaymentType::BillingAgreement));
        assert!(decoded.into_pending().is_ok());
    }

    #[test]
    fn test_missing_required_field_is_unusable() {
        let blob = blob_of(serde_json::json!({
            "approval-url": "https://x/a?token=T",
            "payment-type": "single-payment",
        }));
        assert_eq!(
            decode(&blob).into_pending(),
            Err(MetadataError::Missing(SUCCESS_URL))
        );

        let blob = blob_of(serde_json::json!({
            "approval-url": "https://x/a?token=T",
            "success-url": "https://x/success",
            "payment-type": "unknown",
        }));
        assert_eq!(
            decode(&blob).into_pending(),
            Err(MetadataError::Missing(PAYMENT_TYPE))
        );
    }

    #[test]
    fn test_garbage_blob_decodes_as_empty() {
        let decoded = decode(&MetadataBlob::from_encoded("%%% not base64"));
        assert_eq!(decoded, DecodedMetadata::default());
    }
}
