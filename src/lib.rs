//! Client Onboarding Intake API Library
//!
//! This library provides the core functionality for the onboarding intake
//! service: the submission endpoint, the external record-store integration
//! (records, attachment uploads, schema metadata), webhook fan-out, and the
//! client-side form state machine.
//!
//! # Modules
//!
//! - `attachment_upload`: Token and direct attachment upload clients.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `form`: Onboarding form state machine.
//! - `handlers`: HTTP request handlers and routing.
//! - `models`: Core data models.
//! - `phone`: Phone value parsing and derivation.
//! - `record_store`: Record store client.
//! - `schema_lookup`: Schema metadata client.
//! - `webhook_notifier`: Outbound webhook notifier.

pub mod attachment_upload;
pub mod config;
pub mod errors;
pub mod form;
pub mod handlers;
pub mod models;
pub mod phone;
pub mod record_store;
pub mod schema_lookup;
pub mod webhook_notifier;
