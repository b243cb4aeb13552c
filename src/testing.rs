//! In-memory collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use payswitch_types::analytics::AnalyticsSink;
use payswitch_types::config::Configuration;
use payswitch_types::error::GatewayError;
use payswitch_types::gateway::{ConfigurationSource, PaymentGateway};
use payswitch_types::proto::{AccountPayload, AuthorizationContext, ContextRequest, TokenizedAccount};

/// Ordered record of everything observable during a flow.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push<S: Into<String>>(&self, entry: S) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix("event:").map(str::to_string))
            .collect()
    }
}

impl AnalyticsSink for Journal {
    fn emit(&self, event_name: &str) {
        self.push(format!("event:{event_name}"));
    }
}

/// Scripted gateway recording every request it receives.
#[derive(Debug, Default)]
pub struct FakeGateway {
    configuration: Option<Result<Configuration, GatewayError>>,
    context: Option<Result<AuthorizationContext, GatewayError>>,
    tokenize: Option<Result<TokenizedAccount, GatewayError>>,
    journal: Journal,
    stall_tokenize: bool,
    configuration_calls: AtomicUsize,
    context_requests: Mutex<Vec<ContextRequest>>,
    tokenize_requests: Mutex<Vec<AccountPayload>>,
}

impl FakeGateway {
    pub fn with_configuration(mut self, configuration: Result<Configuration, GatewayError>) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn with_context(mut self, context: Result<AuthorizationContext, GatewayError>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_tokenize(mut self, account: Result<TokenizedAccount, GatewayError>) -> Self {
        self.tokenize = Some(account);
        self
    }

    /// Makes `tokenize` record the request and then never complete.
    pub fn with_stalled_tokenize(mut self) -> Self {
        self.stall_tokenize = true;
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn configuration_calls(&self) -> usize {
        self.configuration_calls.load(Ordering::SeqCst)
    }

    pub fn context_requests(&self) -> Vec<ContextRequest> {
        self.context_requests.lock().unwrap().clone()
    }

    pub fn tokenize_requests(&self) -> Vec<AccountPayload> {
        self.tokenize_requests.lock().unwrap().clone()
    }
}

impl ConfigurationSource for FakeGateway {
    fn configuration(&self) -> impl Future<Output = Result<Configuration, GatewayError>> + Send {
        self.configuration_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.push("gateway:configuration");
        let result = self.configuration.clone().unwrap_or_else(|| {
            Ok(Configuration::default()
                .with_feature("paypal")
                .with_feature("venmo"))
        });
        std::future::ready(result)
    }
}

impl PaymentGateway for FakeGateway {
    fn create_authorization_context(
        &self,
        request: &ContextRequest,
    ) -> impl Future<Output = Result<AuthorizationContext, GatewayError>> + Send {
        self.context_requests.lock().unwrap().push(request.clone());
        self.journal.push("gateway:create_authorization_context");
        let result = self
            .context
            .clone()
            .unwrap_or_else(|| Err(GatewayError::Transport("no context scripted".into())));
        std::future::ready(result)
    }

    fn tokenize(
        &self,
        account: &AccountPayload,
    ) -> impl Future<Output = Result<TokenizedAccount, GatewayError>> + Send {
        self.tokenize_requests.lock().unwrap().push(account.clone());
        self.journal.push("gateway:tokenize");
        let result = self
            .tokenize
            .clone()
            .unwrap_or_else(|| Err(GatewayError::Transport("no tokenize scripted".into())));
        let stall = self.stall_tokenize;
        async move {
            if stall {
                std::future::pending::<()>().await;
            }
            result
        }
    }
}

pub fn context_for(approval_url: &str, success_url: &str) -> AuthorizationContext {
    AuthorizationContext {
        approval_url: approval_url.to_string(),
        success_url: success_url.to_string(),
        correlation_id: "EC-CORRELATION".to_string(),
        client_metadata_id: "client-metadata".to_string(),
        merchant_account_id: None,
        intent: None,
    }
}

pub fn tokenized(nonce: &str) -> TokenizedAccount {
    TokenizedAccount {
        nonce: nonce.to_string(),
        details: serde_json::json!({ "email": "buyer@example.com" }),
        is_default: false,
    }
}
