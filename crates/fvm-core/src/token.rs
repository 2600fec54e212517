//! Anti-forgery token scraping and login response interpretation
//!
//! The portal has no documented API. Its anti-forgery token is rendered into
//! server-side HTML and its login endpoint answers with a nested JSON
//! envelope. Both formats are matched here and nowhere else.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::{Error, Result};

/// Name of the hidden anti-forgery form field
pub const TOKEN_FIELD: &str = "__RequestVerificationToken";

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<input name="__RequestVerificationToken" type="hidden" value="([^"]*)" />"#)
        .expect("token pattern is a valid regex")
});

/// Extract the first anti-forgery token from an HTML page
pub fn extract_token(html: &str) -> Result<String> {
    TOKEN_PATTERN
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
        .ok_or_else(|| Error::Parse(format!("{} not found in page", TOKEN_FIELD)))
}

/// Interpret the body returned by the login POST
///
/// `Success` and `Object.Success` must both be `true` for a successful login.
/// A top-level `Success: false` is a rejected login, not an error.
pub fn login_succeeded(body: &str) -> Result<bool> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("login response is not JSON: {}", e)))?;

    let success = value
        .get("Success")
        .and_then(Value::as_bool)
        .ok_or_else(|| Error::Protocol("login response has no boolean Success".to_string()))?;

    if !success {
        return Ok(false);
    }

    value
        .get("Object")
        .and_then(|object| object.get("Success"))
        .and_then(Value::as_bool)
        .ok_or_else(|| Error::Protocol("login response has no boolean Object.Success".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token() {
        let html = r#"<form><input name="__RequestVerificationToken" type="hidden" value="abc123" /></form>"#;
        assert_eq!(extract_token(html).unwrap(), "abc123");
    }

    #[test]
    fn test_extract_token_first_match_wins() {
        let html = concat!(
            r#"<input name="__RequestVerificationToken" type="hidden" value="first" />"#,
            "\n",
            r#"<input name="__RequestVerificationToken" type="hidden" value="second" />"#,
        );
        assert_eq!(extract_token(html).unwrap(), "first");
    }

    #[test]
    fn test_extract_token_missing() {
        let result = extract_token("<html><body>Karbantartás</body></html>");
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_extract_token_attribute_order_matters() {
        let html = r#"<input type="hidden" name="__RequestVerificationToken" value="abc123" />"#;
        assert!(extract_token(html).is_err());
    }

    #[test]
    fn test_login_succeeded() {
        let body = r#"{"Success": true, "Object": {"Success": true}}"#;
        assert!(login_succeeded(body).unwrap());
    }

    #[test]
    fn test_login_rejected_by_object() {
        let body = r#"{"Success": true, "Object": {"Success": false}}"#;
        assert!(!login_succeeded(body).unwrap());
    }

    #[test]
    fn test_login_rejected_at_top_level() {
        let body = r#"{"Success": false, "Object": null, "Message": "Hibás jelszó"}"#;
        assert!(!login_succeeded(body).unwrap());
    }

    #[test]
    fn test_login_non_json() {
        let result = login_succeeded("<html>error</html>");
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn test_login_unexpected_shape() {
        let result = login_succeeded(r#"{"Success": true}"#);
        assert!(matches!(result, Err(Error::Protocol(_))));

        let result = login_succeeded(r#"{"Success": "yes"}"#);
        assert!(matches!(result, Err(Error::Protocol(_))));
    }
}
