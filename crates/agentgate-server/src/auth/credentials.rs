use axum::http::{HeaderMap, HeaderName};
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compare a presented secret against the configured one.
///
/// Both sides are hashed to equal-length digests, then compared in constant
/// time, so neither length nor matching prefix shows in the timing.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided.as_slice().ct_eq(expected.as_slice()).into()
}

/// Decode `Authorization: Basic <base64(user:pass)>` into `(user, pass)`.
///
/// The pair is split on the first `:`, so passwords may contain colons.
pub fn parse_basic(header: &str) -> Option<(String, String)> {
    let encoded = header
        .strip_prefix("Basic ")
        .or_else(|| header.strip_prefix("basic "))?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// A header value as a string, ignoring values that are not valid UTF-8.
pub fn header_str(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// The `api_key` field of a JSON request body, if any.
pub fn api_key_from_body(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("api_key")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(raw: &str) -> String {
        format!("Basic {}", STANDARD.encode(raw))
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("k-123", "k-123"));
        assert!(!secrets_match("k-124", "k-123"));
        assert!(!secrets_match("", "k-123"));
        assert!(!secrets_match("k-123-and-more", "k-123"));
        assert!(!secrets_match("K-123", "k-123"));
    }

    #[test]
    fn test_parse_basic() {
        assert_eq!(
            parse_basic(&basic("admin:hunter2")),
            Some(("admin".to_string(), "hunter2".to_string()))
        );
        assert_eq!(
            parse_basic(&basic("admin:pa:ss")),
            Some(("admin".to_string(), "pa:ss".to_string()))
        );
        assert_eq!(
            parse_basic(&basic("admin:")),
            Some(("admin".to_string(), String::new()))
        );
    }

    #[test]
    fn test_parse_basic_rejects_malformed() {
        assert_eq!(parse_basic(&basic("no-colon")), None);
        assert_eq!(parse_basic("Basic !!!not-base64!!!"), None);
        assert_eq!(parse_basic("Bearer abc"), None);
        assert_eq!(parse_basic(""), None);
    }

    #[test]
    fn test_api_key_from_body() {
        assert_eq!(
            api_key_from_body(br#"{"api_key": "k-1", "command": "ls"}"#),
            Some("k-1".to_string())
        );
        assert_eq!(api_key_from_body(br#"{"api_key": 42}"#), None);
        assert_eq!(api_key_from_body(br#"{"command": "ls"}"#), None);
        assert_eq!(api_key_from_body(b"not json"), None);
        assert_eq!(api_key_from_body(b""), None);
    }
}
