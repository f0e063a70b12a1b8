//! Shared constants and invariants

pub const DEFAULT_VALIDATOR_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TOKEN_EXCHANGE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BROWSER_AUTH_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_REDIRECT_PORT: u16 = 3001;

// ADT discovery document, cheap to serve and always behind authentication
pub const DEFAULT_PROBE_PATH: &str = "/sap/bc/adt/discovery";

pub const TOKEN_ENDPOINT_PATH: &str = "/oauth/token";
pub const AUTHORIZE_ENDPOINT_PATH: &str = "/oauth/authorize";
pub const CALLBACK_PATH: &str = "/callback";

pub const AUTH_BROKER_PATH_ENV: &str = "AUTH_BROKER_PATH";
pub const DEFAULT_CONFIG_FILE: &str = "auth-broker.yaml";

// Grant types
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";
pub const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";
