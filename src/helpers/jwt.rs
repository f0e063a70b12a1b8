use anyhow::{anyhow, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::helpers::time::from_unix;

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: i64,
}

fn decode_jwt_from_string(token_string: &str) -> Result<JwtClaims> {
    let parts: Vec<&str> = token_string.split('.').collect();
    if parts.len() != 3 {
        return Err(anyhow!("invalid JWT format"));
    }

    // some issuers pad the segments anyway
    let payload = parts[1].trim_end_matches('=');
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| anyhow!("base64 decode error: {}", e))?;

    serde_json::from_slice::<JwtClaims>(&decoded).map_err(|e| anyhow!("invalid JWT payload: {}", e))
}

/// `exp` claim of a JWT, `None` for opaque tokens.
pub fn jwt_expiration(token: &str) -> Option<DateTime<Utc>> {
    match decode_jwt_from_string(token) {
        Ok(claims) => from_unix(claims.exp),
        Err(e) => {
            debug!(error = %e, "token is not a decodable JWT");
            None
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_jwt(exp: i64) -> String {
    // minimal unsigned JWT for tests: {"exp": exp}
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp));
    format!("{}.{}.", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::time::now_i64;

    #[test]
    fn reads_exp_claim() {
        let exp = now_i64() + 600;
        let parsed = jwt_expiration(&sample_jwt(exp)).unwrap();
        assert_eq!(parsed.timestamp(), exp);
    }

    #[test]
    fn opaque_token_has_no_expiration() {
        assert!(jwt_expiration("not-a-jwt").is_none());
        assert!(jwt_expiration("a.b.c").is_none());
    }
}
