//! `payswitch` command-line client.
//!
//! - `payswitch start` creates an authorization context and prints the launch
//!   descriptor, including the `pending_request` carrier to keep while the
//!   external surface is in front.
//! - `payswitch resume` validates what the external surface returned and
//!   prints the terminal result.
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `CONFIG` points at the JSON configuration file
//! - `RUST_LOG` controls log filtering, `OTEL_*` enables OTLP export

use clap::Parser;
use dotenvy::dotenv;
use payswitch::config::{Cli, ClientConfig, Command};
use payswitch::flow::Flow;
use payswitch::http_gateway::HttpGateway;
use payswitch::telemetry::Telemetry;
use payswitch_types::analytics::TracingAnalytics;
use payswitch_types::outcome::TerminalResult;
use serde_json::json;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenv().ok();
    let _telemetry = Telemetry::init()?;

    let cli = Cli::parse();
    let config = ClientConfig::load(&cli.config)?;
    let gateway = gateway(&config)?;

    let (report, failed) = match cli.command {
        Command::Start { provider, request } => {
            let mut flow = Flow::new(provider, gateway, TracingAnalytics, config.launch_settings());
            match flow.start(&request.into()).await {
                Ok(descriptor) => {
                    let report = json!({
                        "result": "launch",
                        "pending_request": descriptor.pending_request().to_string(),
                        "descriptor": descriptor,
                    });
                    (report, false)
                }
                Err(error) => (failure(&error), true),
            }
        }
        Command::Resume { pending, outcome } => {
            let mut flow = Flow::restore(gateway, TracingAnalytics, pending)?;
            match flow.resume(outcome.into()).await {
                Some(result) => (terminal_report(&result), result.is_failure()),
                None => return Err("flow did not accept the outcome".into()),
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    if failed {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn gateway(config: &ClientConfig) -> Result<HttpGateway, Box<dyn std::error::Error>> {
    let mut gateway = HttpGateway::try_from(config.gateway_url.as_str())?
        .with_authorization(config.authorization.inner().as_str())
        .with_configuration_cache_ttl(config.configuration_ttl());
    if let Some(timeout) = config.timeout() {
        gateway = gateway.with_timeout(timeout);
    }
    Ok(gateway)
}

fn terminal_report(result: &TerminalResult) -> serde_json::Value {
    match result {
        TerminalResult::Success(account) => json!({
            "result": "success",
            "account": account,
        }),
        TerminalResult::Cancel => json!({ "result": "cancel" }),
        TerminalResult::Failure(error) => failure(error),
    }
}

fn failure(error: &payswitch_types::error::HandoffError) -> serde_json::Value {
    json!({
        "result": "failure",
        "error": error.to_string(),
        "inauthentic": error.is_inauthentic(),
    })
}
