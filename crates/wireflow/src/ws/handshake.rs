//! WebSocket opening handshake.
//!
//! Validates an HTTP upgrade request
//! ([RFC 6455 Section 4.2](https://datatracker.ietf.org/doc/html/rfc6455#section-4.2))
//! and produces the `101 Switching Protocols` response. Parsing the request
//! head off the wire belongs to the HTTP layer; this module only inspects
//! the headers it is handed.

use base64::prelude::*;
use http::HeaderMap;
use http::header::{self, HeaderValue};
use sha1::{Digest, Sha1};

use crate::ensure;
use crate::protocol::WsError;

/// Fixed GUID appended to the client key before hashing (RFC 6455 section 4.2.2).
const WS_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Validates an upgrade request's headers and returns the accept key to
/// answer with.
///
/// Checks, in order: `Connection` lists the `upgrade` token, `Upgrade` is
/// `websocket`, `Sec-WebSocket-Version` is `13`, and `Sec-WebSocket-Key` is
/// present. Any failure is a [`WsError::Handshake`]; the transport is left
/// untouched so the HTTP layer can answer with a regular error response.
pub fn validate_upgrade(headers: &HeaderMap) -> Result<String, WsError> {
    ensure!(
        has_token(headers.get(header::CONNECTION), "upgrade"),
        WsError::handshake("connection header does not request an upgrade")
    );
    ensure!(
        value_equals(headers.get(header::UPGRADE), "websocket"),
        WsError::handshake("upgrade header is not websocket")
    );
    ensure!(
        value_equals(headers.get(header::SEC_WEBSOCKET_VERSION), "13"),
        WsError::handshake("unsupported websocket version")
    );

    let key = headers
        .get(header::SEC_WEBSOCKET_KEY)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| WsError::handshake("missing sec-websocket-key header"))?;

    Ok(accept_key(key.trim()))
}

/// Computes the `Sec-WebSocket-Accept` value for a client key.
pub fn accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(WS_GUID);
    BASE64_STANDARD.encode(sha1.finalize())
}

/// Renders the protocol-switch response for a validated upgrade.
pub fn switching_protocols(accept: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\
         \r\n"
    )
}

/// Whether a comma-separated header value contains `token`
/// (case-insensitive). `Connection: keep-alive, Upgrade` must match.
fn has_token(value: Option<&HeaderValue>, token: &str) -> bool {
    let Some(value) = value.and_then(|v| v.to_str().ok()) else {
        return false;
    };
    value.split(',').any(|part| part.trim().eq_ignore_ascii_case(token))
}

fn value_equals(value: Option<&HeaderValue>, expected: &str) -> bool {
    value
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upgrade_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::SEC_WEBSOCKET_VERSION, HeaderValue::from_static("13"));
        headers.insert(header::SEC_WEBSOCKET_KEY, HeaderValue::from_static("dGhlIHNhbXBsZSBub25jZQ=="));
        headers
    }

    #[test]
    fn accept_key_matches_rfc_sample() {
        // the worked example from RFC 6455 section 1.3
        assert_eq!(accept_key("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn valid_upgrade_is_accepted() {
        let accept = validate_upgrade(&upgrade_headers()).unwrap();
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn connection_token_list_is_accepted() {
        let mut headers = upgrade_headers();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, Upgrade"));
        assert!(validate_upgrade(&headers).is_ok());
    }

    #[test]
    fn plain_request_is_rejected() {
        let mut headers = upgrade_headers();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        assert!(matches!(validate_upgrade(&headers), Err(WsError::Handshake { .. })));
    }

    #[test]
    fn wrong_upgrade_target_is_rejected() {
        let mut headers = upgrade_headers();
        headers.insert(header::UPGRADE, HeaderValue::from_static("h2c"));
        assert!(matches!(validate_upgrade(&headers), Err(WsError::Handshake { .. })));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut headers = upgrade_headers();
        headers.insert(header::SEC_WEBSOCKET_VERSION, HeaderValue::from_static("8"));
        assert!(matches!(validate_upgrade(&headers), Err(WsError::Handshake { .. })));
    }

    #[test]
    fn missing_key_is_rejected() {
        let mut headers = upgrade_headers();
        headers.remove(header::SEC_WEBSOCKET_KEY);
        assert!(matches!(validate_upgrade(&headers), Err(WsError::Handshake { .. })));
    }

    #[test]
    fn response_contains_accept_key() {
        let response = switching_protocols("s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
        assert!(response.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
    }
}
