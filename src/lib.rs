//! # CRM Token Agent Library
//!
//! Hands out bearer tokens for CRM calls. Tokens are read from a shared
//! distributed cache, then from process memory, and only issued by the
//! identity provider when neither tier holds a token that passes the
//! validity probe.
//!
//! Modules:
//! - `config` — service configuration, secret resolution and validation
//! - `cache` — access token type, local memory tier and distributed tier
//! - `sources` — OAuth2 issuance and the CRM validity probe
//! - `provider` — the `TokenProvider` pipeline and its error type
//! - `crm` — CRM client that invalidates and retries once on 401/403
//! - `server` — HTTP surface exposing the token, invalidation and metrics

pub mod config;
pub mod cache;
pub mod sources;
pub mod provider;
pub mod crm;
pub mod resilience;
pub mod observability;
pub mod server;
pub mod helpers;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::types::ServiceConfig;
pub use crate::provider::token_provider::TokenProvider;
pub use crate::provider::error::TokenError;
