//! Flow state machine.
//!
//! A [`Flow`] drives one authorization handoff from request to terminal
//! result. The build half ([`Flow::start`]) yields a [`LaunchDescriptor`] or
//! the terminal failure; the resume half ([`Flow::resume`]) yields the terminal
//! result at most once. Every terminal path emits exactly one analytics event,
//! and the event is emitted before the result is returned.
//!
//! The resume half needs no in-memory session: [`Flow::restore`] rebuilds a
//! waiting flow from the [`PendingRequest`] carrier after the host process
//! was recreated.

use payswitch_types::analytics::{AnalyticsSink, FlowEvent};
use payswitch_types::codec;
use payswitch_types::error::HandoffError;
use payswitch_types::gateway::{ConfigurationSource, PaymentGateway};
use payswitch_types::outcome::{InauthenticReason, RawOutcome, TerminalResult, ValidatedOutcome};
use payswitch_types::provider::Provider;
use payswitch_types::request::{LaunchDescriptor, PaymentRequestVariant, PendingRequest};
use tracing::instrument;

use crate::builder::{self, LaunchSettings};
use crate::exchanger;
use crate::validator;

/// Which terminal result a flow delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    Success,
    Cancel,
    Failure,
}

impl From<&TerminalResult> for TerminalKind {
    fn from(result: &TerminalResult) -> Self {
        match result {
            TerminalResult::Success(_) => TerminalKind::Success,
            TerminalResult::Cancel => TerminalKind::Cancel,
            TerminalResult::Failure(_) => TerminalKind::Failure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Building,
    AwaitingExternalReturn,
    Validating,
    Exchanging,
    /// Absorbing: no further transitions or deliveries.
    Terminal(TerminalKind),
}

/// One authorization handoff for a single provider.
#[derive(Debug)]
pub struct Flow<G, A> {
    provider: Provider,
    gateway: G,
    analytics: A,
    settings: LaunchSettings,
    state: FlowState,
    pending: Option<PendingRequest>,
}

impl<G, A> Flow<G, A>
where
    G: ConfigurationSource + PaymentGateway,
    A: AnalyticsSink,
{
    pub fn new(provider: Provider, gateway: G, analytics: A, settings: LaunchSettings) -> Self {
        Self {
            provider,
            gateway,
            analytics,
            settings,
            state: FlowState::Idle,
            pending: None,
        }
    }

    /// Recreates a flow waiting for its external return. Performs no remote calls.
    ///
    /// The provider is the one owning the carrier's return-routing code.
    ///
    /// # Errors
    ///
    /// [`HandoffError::UnknownRequestCode`] if no provider owns that code.
    pub fn restore(
        gateway: G,
        analytics: A,
        pending: PendingRequest,
    ) -> Result<Self, HandoffError> {
        let provider = Provider::by_request_code(pending.request_code)
            .ok_or(HandoffError::UnknownRequestCode(pending.request_code))?;
        Ok(Self {
            provider,
            gateway,
            analytics,
            settings: LaunchSettings::default(),
            state: FlowState::AwaitingExternalReturn,
            pending: Some(pending),
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Carrier to persist while the external surface is in front.
    pub fn pending_request(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    /// Runs the build half.
    ///
    /// An `Err` is the flow's terminal delivery, except for
    /// [`HandoffError::AlreadyStarted`], which leaves the flow untouched.
    #[instrument(name = "payswitch.flow.start", skip_all, fields(provider = %self.provider))]
    pub async fn start(
        &mut self,
        variant: &PaymentRequestVariant,
    ) -> Result<LaunchDescriptor, HandoffError> {
        if self.state != FlowState::Idle {
            return Err(HandoffError::AlreadyStarted);
        }
        self.state = FlowState::Building;
        self.emit(FlowEvent::Started);

        let configuration = match self.gateway.configuration().await {
            Ok(configuration) => configuration,
            Err(error) => return Err(self.fail_build(HandoffError::Configuration(error))),
        };
        let pending = match builder::build_pending_authorization(
            self.provider,
            variant,
            &configuration,
            &self.settings,
            &self.gateway,
        )
        .await
        {
            Ok(pending) => pending,
            Err(error) => return Err(self.fail_build(error)),
        };

        let descriptor = builder::launch_descriptor(self.provider, pending, &self.settings);
        self.pending = Some(descriptor.pending_request());
        self.state = FlowState::AwaitingExternalReturn;
        tracing::info!(approval_url = %descriptor.target, "awaiting external return");
        Ok(descriptor)
    }

    /// Runs the resume half.
    ///
    /// Returns `Some` exactly once per flow. Outcomes arriving before `start`
    /// or after the terminal result are dropped with `None` and emit nothing.
    ///
    /// # Cancellation
    ///
    /// Dropping the returned future while tokenization is in flight leaves the
    /// flow in [`FlowState::Exchanging`]: the tokenize call may already have
    /// reached the gateway, so the flow is never re-run. No terminal event is
    /// emitted and every later outcome is dropped; start a new flow instead.
    #[instrument(name = "payswitch.flow.resume", skip_all, fields(provider = %self.provider))]
    pub async fn resume(&mut self, outcome: RawOutcome) -> Option<TerminalResult> {
        if self.state != FlowState::AwaitingExternalReturn {
            tracing::debug!(state = ?self.state, "dropping outcome");
            return None;
        }
        let pending = self.pending.as_ref()?;
        self.state = FlowState::Validating;
        let metadata = codec::decode(&pending.metadata);

        let result = match validator::validate(self.provider, &outcome, &metadata) {
            ValidatedOutcome::Canceled => TerminalResult::Cancel,
            ValidatedOutcome::Inauthentic(reason) => {
                log_inauthentic(&reason);
                TerminalResult::Failure(HandoffError::Inauthentic(reason))
            }
            ValidatedOutcome::Authentic(authentic) => {
                self.state = FlowState::Exchanging;
                exchanger::tokenize(&self.gateway, self.provider, authentic, &metadata).await
            }
        };
        Some(self.finish(result))
    }

    fn fail_build(&mut self, error: HandoffError) -> HandoffError {
        tracing::info!(%error, "flow failed before launch");
        self.state = FlowState::Terminal(TerminalKind::Failure);
        self.emit(FlowEvent::Failed);
        error
    }

    fn finish(&mut self, result: TerminalResult) -> TerminalResult {
        let kind = TerminalKind::from(&result);
        self.state = FlowState::Terminal(kind);
        self.emit(match kind {
            TerminalKind::Success => FlowEvent::Succeeded,
            TerminalKind::Cancel => FlowEvent::Canceled,
            TerminalKind::Failure => FlowEvent::Failed,
        });
        tracing::info!(result = ?kind, "flow finished");
        result
    }

    fn emit(&self, event: FlowEvent) {
        self.analytics.emit(self.provider.profile().event_name(event));
    }
}

fn log_inauthentic(reason: &InauthenticReason) {
    match reason {
        InauthenticReason::PlatformError(cause) => {
            tracing::warn!(%cause, "external launch reported a platform error");
        }
        reason => {
            tracing::warn!(target: "payswitch::tamper", %reason, "rejected inauthentic return");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeGateway, Journal, context_for, tokenized};
    use payswitch_types::config::Configuration;
    use payswitch_types::error::GatewayError;
    use payswitch_types::request::Intent;
    use payswitch_types::util::MoneyAmount;

    fn settings() -> LaunchSettings {
        LaunchSettings::new("com.merchant.app.payments")
    }

    fn checkout() -> PaymentRequestVariant {
        PaymentRequestVariant::checkout(MoneyAmount::try_from(10).unwrap(), Intent::Authorize)
    }

    fn scenario_gateway(journal: &Journal) -> FakeGateway {
        FakeGateway::default()
            .with_journal(journal.clone())
            .with_context(Ok(context_for(
                "https://x/success?token=ABC",
                "https://x/success",
            )))
            .with_tokenize(Ok(tokenized("n1")))
    }

    async fn started(journal: &Journal, gateway: FakeGateway) -> Flow<FakeGateway, Journal> {
        let mut flow = Flow::new(Provider::PayPal, gateway, journal.clone(), settings());
        flow.start(&checkout()).await.unwrap();
        assert_eq!(flow.state(), FlowState::AwaitingExternalReturn);
        flow
    }

    #[tokio::test]
    async fn test_authentic_return_tokenizes_once() {
        let journal = Journal::default();
        let mut flow = started(&journal, scenario_gateway(&journal)).await;

        let result = flow
            .resume(RawOutcome::returned("https://x/success?token=ABC"))
            .await;
        journal.push("delivered");

        assert!(matches!(result, Some(TerminalResult::Success(ref a)) if a.nonce == "n1"));
        assert_eq!(flow.state(), FlowState::Terminal(TerminalKind::Success));
        assert_eq!(
            journal.entries(),
            vec![
                "event:paypal:tokenize:started",
                "gateway:configuration",
                "gateway:create_authorization_context",
                "gateway:tokenize",
                "event:paypal:tokenize:succeeded",
                "delivered",
            ]
        );
    }

    #[tokio::test]
    async fn test_cancel_path_delivers_cancel() {
        let journal = Journal::default();
        let mut flow = started(&journal, scenario_gateway(&journal)).await;

        let result = flow
            .resume(RawOutcome::returned("https://x/cancel?token=ABC"))
            .await;
        assert!(matches!(result, Some(TerminalResult::Cancel)));
        assert_eq!(
            journal.events(),
            vec![
                "paypal:tokenize:started",
                "paypal:tokenize:browser-login:canceled"
            ]
        );
        assert!(flow.gateway.tokenize_requests().is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_token_fails_without_tokenizing() {
        let journal = Journal::default();
        let mut flow = started(&journal, scenario_gateway(&journal)).await;

        let result = flow
            .resume(RawOutcome::returned("https://x/success?token=XYZ"))
            .await;
        let Some(TerminalResult::Failure(error)) = result else {
            panic!("expected failure");
        };
        assert!(error.is_inauthentic());
        assert_eq!(error.to_string(), "The response contained inconsistent data.");
        assert_eq!(
            journal.events(),
            vec!["paypal:tokenize:started", "paypal:tokenize:failed"]
        );
        assert!(flow.gateway.tokenize_requests().is_empty());
    }

    #[tokio::test]
    async fn test_context_timeout_fails_before_launch() {
        let journal = Journal::default();
        let gateway = FakeGateway::default()
            .with_journal(journal.clone())
            .with_context(Err(GatewayError::Timeout));
        let mut flow = Flow::new(Provider::PayPal, gateway, journal.clone(), settings());

        let result = flow.start(&checkout()).await;
        journal.push("delivered");

        assert_eq!(result, Err(HandoffError::Remote(GatewayError::Timeout)));
        assert_eq!(flow.state(), FlowState::Terminal(TerminalKind::Failure));
        assert!(flow.pending_request().is_none());
        assert_eq!(
            journal.entries(),
            vec![
                "event:paypal:tokenize:started",
                "gateway:configuration",
                "gateway:create_authorization_context",
                "event:paypal:tokenize:failed",
                "delivered",
            ]
        );
        assert_eq!(
            flow.resume(RawOutcome::returned("https://x/success?token=ABC"))
                .await
                .map(|r| TerminalKind::from(&r)),
            None
        );
    }

    #[tokio::test]
    async fn test_billing_agreement_round_trip() {
        let journal = Journal::default();
        let gateway = FakeGateway::default()
            .with_context(Ok(context_for(
                "https://x/agreements/approve?ba_token=BA-7",
                "https://x/success",
            )))
            .with_tokenize(Ok(tokenized("n2")));
        let mut flow = Flow::new(Provider::PayPal, gateway, journal.clone(), settings());
        flow.start(&PaymentRequestVariant::vault()).await.unwrap();

        let result = flow
            .resume(RawOutcome::returned("https://x/success?ba_token=BA-7"))
            .await;
        assert!(matches!(result, Some(TerminalResult::Success(ref a)) if a.nonce == "n2"));
        let payloads = flow.gateway.tokenize_requests();
        assert_eq!(payloads[0].correlation_token, "BA-7");
    }

    #[tokio::test]
    async fn test_billing_agreement_rejects_single_payment_key() {
        let journal = Journal::default();
        let gateway = FakeGateway::default().with_context(Ok(context_for(
            "https://x/agreements/approve?ba_token=BA-7&token=BA-7",
            "https://x/success",
        )));
        let mut flow = Flow::new(Provider::PayPal, gateway, journal.clone(), settings());
        flow.start(&PaymentRequestVariant::vault()).await.unwrap();

        let result = flow
            .resume(RawOutcome::returned("https://x/success?token=BA-7"))
            .await;
        assert!(matches!(result, Some(TerminalResult::Failure(ref e)) if e.is_inauthentic()));
    }

    #[tokio::test]
    async fn test_duplicate_outcome_is_dropped() {
        let journal = Journal::default();
        let mut flow = started(&journal, scenario_gateway(&journal)).await;
        let outcome = RawOutcome::returned("https://x/success?token=ABC");

        assert!(flow.resume(outcome.clone()).await.is_some());
        let events_after_first = journal.events();
        assert!(flow.resume(outcome).await.is_none());
        assert!(flow.resume(RawOutcome::Canceled).await.is_none());

        assert_eq!(journal.events(), events_after_first);
        assert_eq!(flow.gateway.tokenize_requests().len(), 1);
        assert_eq!(flow.state(), FlowState::Terminal(TerminalKind::Success));
    }

    #[tokio::test]
    async fn test_disabled_provider_short_circuits() {
        let journal = Journal::default();
        let gateway = FakeGateway::default()
            .with_journal(journal.clone())
            .with_configuration(Ok(Configuration::default().with_feature("venmo")));
        let mut flow = Flow::new(Provider::PayPal, gateway, journal.clone(), settings());

        let result = flow.start(&checkout()).await;
        assert_eq!(
            result,
            Err(HandoffError::FeatureDisabled {
                provider: Provider::PayPal
            })
        );
        assert!(flow.gateway.context_requests().is_empty());
        assert!(flow.pending_request().is_none());
        assert_eq!(
            journal.events(),
            vec!["paypal:tokenize:started", "paypal:tokenize:failed"]
        );
    }

    #[tokio::test]
    async fn test_configuration_error_is_passed_through() {
        let journal = Journal::default();
        let gateway = FakeGateway::default()
            .with_configuration(Err(GatewayError::Transport("offline".into())));
        let mut flow = Flow::new(Provider::Venmo, gateway, journal.clone(), settings());

        let result = flow.start(&checkout()).await;
        assert_eq!(
            result,
            Err(HandoffError::Configuration(GatewayError::Transport(
                "offline".into()
            )))
        );
        assert_eq!(flow.gateway.configuration_calls(), 1);
        assert_eq!(
            journal.events(),
            vec!["venmo:tokenize:started", "venmo:tokenize:failed"]
        );
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_silently() {
        let journal = Journal::default();
        let mut flow = started(&journal, scenario_gateway(&journal)).await;
        let before = journal.entries();

        assert_eq!(
            flow.start(&checkout()).await,
            Err(HandoffError::AlreadyStarted)
        );
        assert_eq!(journal.entries(), before);
        assert_eq!(flow.state(), FlowState::AwaitingExternalReturn);
    }

    #[tokio::test]
    async fn test_outcome_before_start_is_dropped() {
        let journal = Journal::default();
        let mut flow = Flow::new(
            Provider::PayPal,
            scenario_gateway(&journal),
            journal.clone(),
            settings(),
        );
        assert!(flow.resume(RawOutcome::Canceled).await.is_none());
        assert_eq!(flow.state(), FlowState::Idle);
        assert!(journal.entries().is_empty());
    }

    #[tokio::test]
    async fn test_restored_flow_completes_after_process_death() {
        let journal = Journal::default();
        let carrier = {
            let flow = started(&journal, scenario_gateway(&journal)).await;
            flow.pending_request().unwrap().to_string()
        };

        let journal = Journal::default();
        let pending: PendingRequest = carrier.parse().unwrap();
        let gateway = FakeGateway::default()
            .with_journal(journal.clone())
            .with_tokenize(Ok(tokenized("n1")));
        let mut flow = Flow::restore(gateway, journal.clone(), pending).unwrap();
        assert_eq!(flow.provider(), Provider::PayPal);
        assert_eq!(flow.state(), FlowState::AwaitingExternalReturn);

        let result = flow
            .resume(RawOutcome::returned("https://x/success?token=ABC"))
            .await;
        assert!(matches!(result, Some(TerminalResult::Success(_))));
        assert_eq!(
            journal.entries(),
            vec!["gateway:tokenize", "event:paypal:tokenize:succeeded"]
        );
        assert_eq!(
            flow.gateway.tokenize_requests()[0].client_metadata_id,
            "client-metadata"
        );
    }

    #[tokio::test]
    async fn test_restore_routes_by_request_code() {
        let journal = Journal::default();
        let carrier = started(&journal, scenario_gateway(&journal))
            .await
            .pending_request()
            .unwrap()
            .clone();
        assert_eq!(carrier.request_code, 13591);

        let journal = Journal::default();
        let gateway = FakeGateway::default().with_tokenize(Ok(tokenized("n1")));
        let mut flow = Flow::restore(gateway, journal.clone(), carrier.clone()).unwrap();
        assert_eq!(flow.provider(), Provider::PayPal);
        let result = flow
            .resume(RawOutcome::returned("https://x/success?token=ABC"))
            .await;
        assert!(matches!(result, Some(TerminalResult::Success(ref a)) if a.nonce == "n1"));
        assert_eq!(journal.events(), vec!["paypal:tokenize:succeeded"]);

        let venmo = PendingRequest {
            request_code: 13488,
            metadata: carrier.metadata.clone(),
        };
        let flow = Flow::restore(FakeGateway::default(), Journal::default(), venmo).unwrap();
        assert_eq!(flow.provider(), Provider::Venmo);
    }

    #[tokio::test]
    async fn test_restore_rejects_unknown_request_code() {
        let journal = Journal::default();
        let pending: PendingRequest = "4242:e30".parse().unwrap();
        let result = Flow::restore(FakeGateway::default(), journal.clone(), pending);
        assert!(matches!(result, Err(HandoffError::UnknownRequestCode(4242))));
        assert!(journal.entries().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_resume_stays_exchanging() {
        let journal = Journal::default();
        let gateway = FakeGateway::default()
            .with_context(Ok(context_for(
                "https://x/success?token=ABC",
                "https://x/success",
            )))
            .with_stalled_tokenize();
        let mut flow = started(&journal, gateway).await;
        let outcome = RawOutcome::returned("https://x/success?token=ABC");

        let elapsed = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            flow.resume(outcome.clone()),
        )
        .await;
        assert!(elapsed.is_err());
        assert_eq!(flow.state(), FlowState::Exchanging);
        assert_eq!(flow.gateway.tokenize_requests().len(), 1);

        assert!(flow.resume(outcome).await.is_none());
        assert_eq!(flow.gateway.tokenize_requests().len(), 1);
        assert_eq!(journal.events(), vec!["paypal:tokenize:started"]);
    }

    #[tokio::test]
    async fn test_tokenize_failure_is_delivered_once() {
        let journal = Journal::default();
        let gateway = FakeGateway::default()
            .with_context(Ok(context_for(
                "https://x/success?token=ABC",
                "https://x/success",
            )))
            .with_tokenize(Err(GatewayError::Rejected("account locked".into())));
        let mut flow = started(&journal, gateway).await;

        let result = flow
            .resume(RawOutcome::returned("https://x/success?token=ABC"))
            .await;
        assert!(matches!(
            result,
            Some(TerminalResult::Failure(HandoffError::Remote(GatewayError::Rejected(_))))
        ));
        assert_eq!(
            journal.events(),
            vec!["paypal:tokenize:started", "paypal:tokenize:failed"]
        );
    }

    #[tokio::test]
    async fn test_platform_error_and_corrupt_carrier_fail() {
        let journal = Journal::default();
        let mut flow = started(&journal, scenario_gateway(&journal)).await;
        let result = flow
            .resume(RawOutcome::PlatformError {
                cause: "no browser".into(),
            })
            .await;
        assert!(matches!(result, Some(TerminalResult::Failure(ref e)) if e.is_inauthentic()));

        let pending: PendingRequest = "13591:not-base64!".parse().unwrap();
        let mut flow = Flow::restore(FakeGateway::default(), Journal::default(), pending).unwrap();
        let result = flow
            .resume(RawOutcome::returned("https://x/success?token=ABC"))
            .await;
        assert!(matches!(result, Some(TerminalResult::Failure(ref e)) if e.is_inauthentic()));
    }
}
