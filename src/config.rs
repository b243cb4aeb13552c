//! Local client configuration and command-line arguments for the `payswitch` binary.

use clap::{Args, Parser, Subcommand};
use payswitch_types::config::LiteralOrEnv;
use payswitch_types::outcome::RawOutcome;
use payswitch_types::provider::Provider;
use payswitch_types::request::{Intent, PaymentRequestVariant, PendingRequest};
use payswitch_types::util::MoneyAmount;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::builder::LaunchSettings;

/// CLI arguments for the payswitch client.
#[derive(Parser, Debug)]
#[command(name = "payswitch")]
#[command(about = "Authorization handoff client for PayPal and Venmo")]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, short, env = "CONFIG", default_value = "payswitch.json")]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an authorization context and print the launch descriptor.
    Start {
        #[arg(long)]
        provider: Provider,
        #[command(subcommand)]
        request: RequestArgs,
    },
    /// Validate an external return and print the terminal result.
    ///
    /// The provider is taken from the carrier's return-routing code.
    Resume {
        /// Carrier printed by `start` as `pending_request`.
        #[arg(long)]
        pending: PendingRequest,
        #[command(flatten)]
        outcome: OutcomeArgs,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum RequestArgs {
    /// One-time payment.
    Checkout {
        #[arg(long)]
        amount: MoneyAmount,
        #[arg(long, default_value = "authorize")]
        intent: Intent,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        pay_later: bool,
        #[arg(long)]
        merchant_account_id: Option<String>,
    },
    /// Billing agreement for future payments.
    Vault {
        #[arg(long)]
        offer_credit: bool,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        merchant_account_id: Option<String>,
    },
}

impl From<RequestArgs> for PaymentRequestVariant {
    fn from(args: RequestArgs) -> Self {
        match args {
            RequestArgs::Checkout {
                amount,
                intent,
                currency,
                pay_later,
                merchant_account_id,
            } => PaymentRequestVariant::Checkout {
                amount,
                currency_code: currency,
                intent,
                pay_later,
                merchant_account_id,
            },
            RequestArgs::Vault {
                offer_credit,
                description,
                merchant_account_id,
            } => PaymentRequestVariant::Vault {
                offer_credit,
                billing_agreement_description: description,
                merchant_account_id,
            },
        }
    }
}

/// How the external surface came back. Exactly one must be given.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct OutcomeArgs {
    /// Deep link or return URL the external surface returned with
    #[arg(long)]
    pub return_url: Option<String>,
    /// The user dismissed the external surface
    #[arg(long)]
    pub canceled: bool,
    /// The platform could not complete the switch
    #[arg(long)]
    pub error: Option<String>,
}

impl From<OutcomeArgs> for RawOutcome {
    fn from(args: OutcomeArgs) -> Self {
        match (args.return_url, args.error) {
            (Some(url), _) => RawOutcome::returned(url),
            (None, Some(cause)) => RawOutcome::PlatformError { cause },
            (None, None) => RawOutcome::Canceled,
        }
    }
}

/// Client configuration.
///
/// `authorization` accepts `$VAR` or `${VAR}` to read the key from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub gateway_url: Url,
    pub authorization: LiteralOrEnv<String>,
    pub return_url_scheme: String,
    #[serde(default)]
    pub launch_as_new_task: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "config_defaults::default_configuration_ttl_secs")]
    pub configuration_ttl_secs: u64,
}

pub mod config_defaults {
    use std::env;

    pub const DEFAULT_CONFIGURATION_TTL_SECS: u64 = 600;

    /// Returns the configuration cache TTL: $PAYSWITCH_CONFIGURATION_TTL_SECS env var -> 600
    pub fn default_configuration_ttl_secs() -> u64 {
        env::var("PAYSWITCH_CONFIGURATION_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONFIGURATION_TTL_SECS)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl ClientConfig {
    /// Loads the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let path = path
            .canonicalize()
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead(path, e))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn launch_settings(&self) -> LaunchSettings {
        LaunchSettings {
            return_url_scheme: self.return_url_scheme.clone(),
            launch_as_new_task: self.launch_as_new_task,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn configuration_ttl(&self) -> Duration {
        Duration::from_secs(self.configuration_ttl_secs)
    }
}
