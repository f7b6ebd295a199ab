//! Client SDK for the newsroom portal REST API.
//!
//! The crate covers the authenticated data-fetch and state-synchronisation
//! layer of the portal: a session store with durable credentials, an API
//! client that propagates the bearer token, an upload client for the media
//! host, and controllers that keep local collections reconciled with the
//! outcome of server mutations.

pub mod auth;
pub mod authoring;
pub mod client;
pub mod collection;
pub mod config;
pub mod dashboard;
pub mod detail;
pub mod download;
pub mod error;
mod lock;
pub mod navigation;
pub mod session;
pub mod telemetry;

pub use newsroom_api_types as api_types;
