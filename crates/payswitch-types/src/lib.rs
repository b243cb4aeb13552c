#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for browser-switch and app-switch payment authorization.
//!
//! This crate holds the I/O-free half of the handoff: the data model, the
//! metadata codec that lets a pending request survive process death, the
//! provider lookup table, the error taxonomy, and the traits for remote
//! collaborators. The behavior (building, validating, tokenizing and the flow
//! state machine) lives in the `payswitch` crate.
//!
//! # Modules
//!
//! - [`analytics`] - Telemetry sink trait and flow events
//! - [`codec`] - Metadata codec for pending authorizations
//! - [`config`] - Remote configuration and environment variable resolution
//! - [`error`] - Error taxonomy
//! - [`gateway`] - Collaborator traits for configuration, context creation and tokenization
//! - [`outcome`] - Raw, validated and terminal outcomes
//! - [`proto`] - Wire types exchanged with the gateway
//! - [`provider`] - Provider and payment-type lookup table
//! - [`request`] - Payment requests, pending authorizations and launch descriptors
//! - [`util`] - Helper types (base64 carrier, money amounts)

pub mod analytics;
pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod outcome;
pub mod proto;
pub mod provider;
pub mod request;
pub mod util;
