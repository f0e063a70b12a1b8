//! Token resolution: the fallback chain over cache, session, provider and UAA.

pub mod auth_broker;
pub mod builder;
pub mod single_flight;

pub use auth_broker::{AuthBroker, TokenSource};
pub use builder::AuthBrokerBuilder;
pub use single_flight::SingleFlight;
