//! # Auth Broker Library
//!
//! Resolves a valid bearer token for a named SAP destination, hiding where
//! it comes from: the in-memory cache, a stored session, a refresh grant,
//! a direct client-credentials grant or an interactive browser login.
//!
//! Modules:
//! - `broker`: the resolution algorithm and its builder
//! - `cache`: in-memory token cache with expiry
//! - `validator`: cheap liveness probe of a token
//! - `browser`: OAuth2 authorization-code flow with a local callback listener
//! - `providers`: token acquisition strategies and the UAA token client
//! - `stores`: session and service-key store seams, file and memory backed
//! - `config`: YAML configuration and credential types

pub mod broker;
pub mod browser;
pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod providers;
pub mod stores;
pub mod utils;
pub mod validator;

#[cfg(test)]
mod tests;

pub use crate::broker::{AuthBroker, AuthBrokerBuilder};
pub use crate::config::types::{AuthorizationConfig, ConnectionConfig, SessionKind, TokenProviderResult};
pub use crate::error::{AuthError, StoreError};
