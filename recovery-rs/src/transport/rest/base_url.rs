//! REST base URL resolution

use jsonwebtoken::{decode, DecodingKey, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{RecoveryError, Result};

pub const DEFAULT_REST_BASE: &str = "https://outlook.office.com";

lazy_static! {
    static ref RX_URL_AUDIENCE: Regex = Regex::new(r"https://([^@]*)").expect("valid regex");
    // guid/host@guid
    static ref RX_HOST_AUDIENCE: Regex = Regex::new(r"/([^@]*)@").expect("valid regex");
}

#[derive(Debug, Deserialize)]
struct AudienceClaims {
    #[serde(default)]
    aud: Option<serde_json::Value>,
}

/// `scheme://host[:port]` of a URL
pub fn origin(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url)
        .map_err(|e| RecoveryError::Host(format!("Invalid REST URL '{}': {}", url, e)))?;
    Ok(parsed.origin().ascii_serialization())
}

/// Read the `aud` claim without verifying the token signature
pub fn token_audience(token: &str) -> Result<Option<String>> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<AudienceClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;

    let audience = match data.claims.aud {
        Some(serde_json::Value::String(aud)) => Some(aud),
        Some(serde_json::Value::Array(values)) => values
            .into_iter()
            .next()
            .and_then(|v| v.as_str().map(|s| s.to_string())),
        _ => None,
    };

    Ok(audience)
}

/// Base URL derived from a token audience
pub fn base_from_audience(aud: &str) -> Option<String> {
    if RX_URL_AUDIENCE.is_match(aud) {
        return Some(aud.to_string());
    }

    RX_HOST_AUDIENCE
        .captures(aud)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|h| !h.is_empty())
        .map(|host| format!("https://{}", host))
}

/// Pick the REST base URL from the host property or the token
pub fn resolve_base_url(rest_url: Option<&str>, token: &str) -> Result<String> {
    if let Some(rest_url) = rest_url.filter(|u| !u.is_empty()) {
        return origin(rest_url);
    }

    let audience = match token_audience(token) {
        Ok(aud) => aud,
        Err(e) => {
            warn!("Could not decode access token: {}", e);
            None
        }
    };

    match audience.as_deref().and_then(base_from_audience) {
        Some(base) => {
            debug!("REST base URL from token audience: {}", base);
            Ok(base)
        }
        None => Ok(DEFAULT_REST_BASE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn token(claims: serde_json::Value) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret")).unwrap()
    }

    #[test]
    fn test_rest_url_property_wins() {
        let base = resolve_base_url(
            Some("https://outlook.office365.com/api/v2.0/me"),
            "not-a-token",
        )
        .unwrap();
        assert_eq!(base, "https://outlook.office365.com");

        let base = resolve_base_url(Some("http://127.0.0.1:8080/api"), "").unwrap();
        assert_eq!(base, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_audience_url_shape() {
        let jwt = token(json!({ "aud": "https://outlook.office365.com" }));
        assert_eq!(
            resolve_base_url(None, &jwt).unwrap(),
            "https://outlook.office365.com"
        );
    }

    #[test]
    fn test_audience_guid_host_shape() {
        let jwt = token(json!({
            "aud": ["00000002-0000-0ff1-ce00-000000000000/mail.contoso.com@72f988bf-86f1-41af-91ab-2d7cd011db47"]
        }));
        assert_eq!(resolve_base_url(None, &jwt).unwrap(), "https://mail.contoso.com");
    }

    #[test]
    fn test_base_from_audience_shapes() {
        assert_eq!(
            base_from_audience("https://outlook.office.com/").as_deref(),
            Some("https://outlook.office.com/")
        );
        assert_eq!(
            base_from_audience("guid/outlook.office365.com@tenant").as_deref(),
            Some("https://outlook.office365.com")
        );
        assert_eq!(base_from_audience("guid/@tenant"), None);
        assert_eq!(base_from_audience("api://something"), None);
    }

    #[test]
    fn test_fallback_default() {
        let jwt = token(json!({ "sub": "someone" }));
        assert_eq!(resolve_base_url(None, &jwt).unwrap(), DEFAULT_REST_BASE);
        assert_eq!(resolve_base_url(None, "garbage").unwrap(), DEFAULT_REST_BASE);

        let jwt = token(json!({ "aud": "urn:unrelated" }));
        assert_eq!(resolve_base_url(None, &jwt).unwrap(), DEFAULT_REST_BASE);
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let jwt = token(json!({ "aud": "https://mail.example.com", "exp": 1 }));
        assert_eq!(
            token_audience(&jwt).unwrap().as_deref(),
            Some("https://mail.example.com")
        );
    }
}
