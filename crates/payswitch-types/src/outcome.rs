//! Outcome types on the return path.
//!
//! [`RawOutcome`] is what the external launch adapter hands back,
//! [`ValidatedOutcome`] is the validator's classification of it, and
//! [`TerminalResult`] is what the caller finally receives.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::error::HandoffError;
use crate::proto::TokenizedAccount;
use crate::provider::PaymentType;

/// Outcome of an external launch, as delivered by the launch adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutcome {
    /// The external surface returned through a deep link or return URL.
    Returned {
        deep_link_or_payload: String,
        status_code: Option<i32>,
    },
    /// The user dismissed the external surface.
    Canceled,
    /// The platform could not complete the switch.
    PlatformError { cause: String },
}

impl RawOutcome {
    pub fn returned<S: Into<String>>(payload: S) -> Self {
        RawOutcome::Returned {
            deep_link_or_payload: payload.into(),
            status_code: None,
        }
    }
}

/// Reason a return was not accepted as authentic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InauthenticReason {
    PlatformError(String),
    MissingPayload,
    UnparseableReturnUrl,
    UnusableMetadata(&'static str),
    InconsistentResponseData,
}

impl Display for InauthenticReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InauthenticReason::PlatformError(cause) => write!(f, "platform error: {cause}"),
            InauthenticReason::MissingPayload => f.write_str("missing return payload"),
            InauthenticReason::UnparseableReturnUrl => f.write_str("unparseable return url"),
            InauthenticReason::UnusableMetadata(field) => {
                write!(f, "pending request metadata is missing `{field}`")
            }
            InauthenticReason::InconsistentResponseData => {
                f.write_str("The response contained inconsistent data.")
            }
        }
    }
}

/// Normalized payload of an authentic web return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlResponseData {
    pub client: ClientEnvironment,
    pub response: WebResponse,
    pub response_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEnvironment {
    pub environment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResponse {
    #[serde(rename = "webURL")]
    pub web_url: String,
}

impl UrlResponseData {
    pub const RESPONSE_TYPE_WEB: &'static str = "web";

    /// Records the returned URL verbatim as the web-response artifact.
    pub fn web<S: Into<String>>(returned_url: S) -> Self {
        Self {
            client: ClientEnvironment::default(),
            response: WebResponse {
                web_url: returned_url.into(),
            },
            response_type: Self::RESPONSE_TYPE_WEB.to_string(),
        }
    }
}

/// An authentic return: the normalized payload plus the matched correlation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticReturn {
    pub url_response: UrlResponseData,
    pub correlation_token: String,
    /// Payment type whose token key the return was matched under.
    pub payment_type: PaymentType,
}

/// Classification of a [`RawOutcome`] against the recovered metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedOutcome {
    Authentic(AuthenticReturn),
    Canceled,
    Inauthentic(InauthenticReason),
}

/// The single result a flow delivers to its caller.
#[derive(Debug)]
pub enum TerminalResult {
    Success(TokenizedAccount),
    Cancel,
    Failure(HandoffError),
}

impl TerminalResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, TerminalResult::Failure(_))
    }
}
