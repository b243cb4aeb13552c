//! Result validator.
//!
//! Decides whether a return from the external surface belongs to the pending
//! authorization it claims to answer. The approval URL carries a correlation
//! token that only the provider session can echo back; a return is authentic
//! only when that token reappears unchanged under the payment type's key.

use payswitch_types::codec::{self, DecodedMetadata};
use payswitch_types::outcome::{
    AuthenticReturn, InauthenticReason, RawOutcome, UrlResponseData, ValidatedOutcome,
};
use payswitch_types::provider::Provider;
use url::Url;

/// Classifies `outcome` against the metadata recovered from the pending request.
///
/// A returned URL whose last path segment differs from the success URL's is a
/// cancellation, whatever token it carries.
pub fn validate(
    provider: Provider,
    outcome: &RawOutcome,
    metadata: &DecodedMetadata,
) -> ValidatedOutcome {
    match outcome {
        RawOutcome::Canceled => ValidatedOutcome::Canceled,
        RawOutcome::PlatformError { cause } => {
            ValidatedOutcome::Inauthentic(InauthenticReason::PlatformError(cause.clone()))
        }
        RawOutcome::Returned {
            deep_link_or_payload,
            ..
        } => validate_return(provider, deep_link_or_payload, metadata)
            .unwrap_or_else(ValidatedOutcome::Inauthentic),
    }
}

fn validate_return(
    provider: Provider,
    payload: &str,
    metadata: &DecodedMetadata,
) -> Result<ValidatedOutcome, InauthenticReason> {
    if payload.is_empty() {
        return Err(InauthenticReason::MissingPayload);
    }
    let success_url = metadata
        .success_url
        .as_ref()
        .ok_or(InauthenticReason::UnusableMetadata(codec::SUCCESS_URL))?;
    let approval_url = metadata
        .approval_url
        .as_ref()
        .ok_or(InauthenticReason::UnusableMetadata(codec::APPROVAL_URL))?;
    let payment_type = metadata
        .payment_type
        .ok_or(InauthenticReason::UnusableMetadata(codec::PAYMENT_TYPE))?;
    let returned = Url::parse(payload).map_err(|_| InauthenticReason::UnparseableReturnUrl)?;

    if last_path_segment(&returned) != last_path_segment(success_url) {
        return Ok(ValidatedOutcome::Canceled);
    }

    let token_key = provider.profile().token_key(payment_type);
    let expected = query_parameter(approval_url, token_key);
    let actual = query_parameter(&returned, token_key);
    match actual {
        Some(token) if expected.as_deref() == Some(token.as_str()) => {
            Ok(ValidatedOutcome::Authentic(AuthenticReturn {
                url_response: UrlResponseData::web(payload),
                correlation_token: token,
                payment_type,
            }))
        }
        _ => Err(InauthenticReason::InconsistentResponseData),
    }
}

fn last_path_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.filter(|s| !s.is_empty()).next_back()
}

fn query_parameter(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
