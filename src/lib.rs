//! Browser-switch and app-switch payment authorization handoff.
//!
//! A merchant application hands the buyer off to an external surface (the
//! PayPal checkout page in a browser, or the Venmo app), then resumes when that
//! surface returns. This crate owns everything around the handoff:
//!
//! - [`builder`] creates the pending authorization and the launch descriptor.
//! - [`validator`] decides whether a return is authentic, a cancellation, or suspect.
//! - [`exchanger`] trades an authentic return for a nonce.
//! - [`flow`] sequences the above and delivers exactly one terminal result.
//! - [`http_gateway`] is a JSON-over-HTTP implementation of the remote collaborators.
//!
//! Launching the external surface is left to the host. All data needed to
//! validate the return travels in the [`PendingRequest`](payswitch_types::request::PendingRequest)
//! carrier, so the resume half works after the host process was recreated.
//!
//! Shared types live in the [`payswitch_types`] crate.

pub mod builder;
pub mod config;
pub mod exchanger;
pub mod flow;
pub mod http_gateway;
pub mod telemetry;
pub mod validator;

#[cfg(test)]
mod testing;
