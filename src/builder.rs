//! Request builder: turns a caller's payment request into a launchable descriptor.
//!
//! [`build_pending_authorization`] asks the gateway for an authorization
//! context and checks what comes back; [`launch_descriptor`] packages the
//! result together with its encoded metadata and return-routing key.

use payswitch_types::codec;
use payswitch_types::config::Configuration;
use payswitch_types::error::HandoffError;
use payswitch_types::gateway::PaymentGateway;
use payswitch_types::proto::{AuthorizationContext, ContextRequest};
use payswitch_types::provider::Provider;
use payswitch_types::request::{
    LaunchDescriptor, PaymentRequestVariant, PendingAuthorization, ReturnRoute,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

/// Host-side launch settings, threaded explicitly into every build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSettings {
    /// Scheme the external surface returns to, e.g. `com.merchant.app.payments`.
    pub return_url_scheme: String,
    /// Launch the external surface as a new task.
    #[serde(default)]
    pub launch_as_new_task: bool,
}

impl LaunchSettings {
    pub fn new<S: Into<String>>(return_url_scheme: S) -> Self {
        Self {
            return_url_scheme: return_url_scheme.into(),
            launch_as_new_task: false,
        }
    }

    /// Return URL for a final path segment, `<scheme>://onetouch/v1/<segment>`.
    pub fn return_url(&self, segment: &str) -> Result<Url, HandoffError> {
        let raw = format!("{}://onetouch/v1/{}", self.return_url_scheme, segment);
        Url::parse(&raw).map_err(|e| {
            HandoffError::MalformedContext(format!("invalid return url `{raw}`: {e}"))
        })
    }
}

/// Creates a [`PendingAuthorization`] for `variant`.
///
/// # Errors
///
/// - [`HandoffError::FeatureDisabled`] if the provider is disabled in `configuration`
/// - [`HandoffError::Remote`] with the gateway error, unchanged
/// - [`HandoffError::MalformedContext`] if the returned URLs are unusable
#[instrument(name = "payswitch.builder.build", skip_all, fields(provider = %provider), err)]
pub async fn build_pending_authorization<G: PaymentGateway>(
    provider: Provider,
    variant: &PaymentRequestVariant,
    configuration: &Configuration,
    settings: &LaunchSettings,
    gateway: &G,
) -> Result<PendingAuthorization, HandoffError> {
    let profile = provider.profile();
    if !configuration.is_feature_enabled(profile.feature) {
        return Err(HandoffError::FeatureDisabled { provider });
    }

    let request = context_request(provider, variant, settings)?;
    let context = gateway.create_authorization_context(&request).await?;
    tracing::debug!(correlation_id = %context.correlation_id, "authorization context created");

    let authorization_domain = configuration
        .provider_settings(provider)
        .and_then(|s| s.authorization_domain.as_deref());
    into_pending(provider, variant, context, authorization_domain)
}

fn context_request(
    provider: Provider,
    variant: &PaymentRequestVariant,
    settings: &LaunchSettings,
) -> Result<ContextRequest, HandoffError> {
    let mut request = ContextRequest {
        provider,
        payment_type: variant.payment_type(),
        amount: None,
        currency_code: None,
        intent: None,
        pay_later: false,
        offer_credit: false,
        billing_agreement_description: None,
        merchant_account_id: variant.merchant_account_id().map(str::to_string),
        return_url: settings.return_url("success")?,
        cancel_url: settings.return_url("cancel")?,
    };
    match variant {
        PaymentRequestVariant::Checkout {
            amount,
            currency_code,
            intent,
            pay_later,
            ..
        } => {
            request.amount = Some(*amount);
            request.currency_code = currency_code.clone();
            request.intent = Some(*intent);
            request.pay_later = *pay_later;
        }
        PaymentRequestVariant::Vault {
            offer_credit,
            billing_agreement_description,
            ..
        } => {
            request.offer_credit = *offer_credit;
            request.billing_agreement_description = billing_agreement_description.clone();
        }
    }
    Ok(request)
}

fn into_pending(
    provider: Provider,
    variant: &PaymentRequestVariant,
    context: AuthorizationContext,
    authorization_domain: Option<&str>,
) -> Result<PendingAuthorization, HandoffError> {
    let approval_url = parse_context_url("approval", &context.approval_url)?;
    let success_url = parse_context_url("success", &context.success_url)?;
    if let Some(domain) = authorization_domain {
        if !within_domain(&approval_url, domain) {
            return Err(HandoffError::MalformedContext(format!(
                "approval url host {:?} is outside {domain}",
                approval_url.host_str()
            )));
        }
    }
    Ok(PendingAuthorization {
        correlation_id: context.correlation_id,
        approval_url,
        success_url,
        client_metadata_id: context.client_metadata_id,
        merchant_account_id: context
            .merchant_account_id
            .or_else(|| variant.merchant_account_id().map(str::to_string)),
        intent: context.intent.or(variant.intent()),
        payment_type: variant.payment_type(),
        source: provider.profile().source.to_string(),
    })
}

fn parse_context_url(name: &str, raw: &str) -> Result<Url, HandoffError> {
    if raw.is_empty() {
        return Err(HandoffError::MalformedContext(format!("empty {name} url")));
    }
    Url::parse(raw)
        .map_err(|e| HandoffError::MalformedContext(format!("invalid {name} url `{raw}`: {e}")))
}

fn within_domain(url: &Url, domain: &str) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Packages a pending authorization into a [`LaunchDescriptor`].
pub fn launch_descriptor(
    provider: Provider,
    pending: PendingAuthorization,
    settings: &LaunchSettings,
) -> LaunchDescriptor {
    LaunchDescriptor {
        target: pending.approval_url.clone(),
        route: ReturnRoute {
            request_code: provider.profile().request_code,
            return_url_scheme: settings.return_url_scheme.clone(),
        },
        launch_as_new_task: settings.launch_as_new_task,
        metadata: codec::encode(&pending),
        pending,
    }
}
