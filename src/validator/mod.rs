//! Cheap liveness check of a bearer token against its destination.

pub mod token_validator;

pub use token_validator::{classify, TokenValidator, ValidateToken, Validation};
