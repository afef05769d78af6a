//! SASL response builders for SMTP AUTH.
//!
//! Implements:
//! - PLAIN (RFC 4616)
//! - LOGIN (draft-murchison-sasl-login)
//! - CRAM-MD5 (RFC 2195)
//! - XOAUTH2 (Google/Microsoft)
//!
//! The exchange itself is driven by [`Client::authenticate`](crate::Client::authenticate).

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use md5::Md5;

/// Generates the PLAIN initial response: base64 of `\0<username>\0<password>`.
#[must_use]
pub fn plain_response(username: &str, password: &str) -> String {
    STANDARD.encode(format!("\0{username}\0{password}"))
}

/// Encodes one LOGIN prompt answer (the username or the password).
#[must_use]
pub fn login_response(value: &str) -> String {
    STANDARD.encode(value)
}

/// Answers a CRAM-MD5 challenge.
///
/// The challenge is the base64 text of the server's 334 reply. The answer is
/// base64 of `<username> <hex(HMAC-MD5(password, challenge))>`.
///
/// # Errors
///
/// Returns an error if the challenge is not valid base64.
pub fn cram_md5_response(username: &str, password: &str, challenge: &str) -> Result<String> {
    let challenge = STANDARD
        .decode(challenge.trim())
        .map_err(|e| Error::Protocol(format!("Invalid CRAM-MD5 challenge: {e}")))?;

    let mut mac = Hmac::<Md5>::new_from_slice(password.as_bytes())
        .map_err(|e| Error::Protocol(format!("Invalid CRAM-MD5 key: {e}")))?;
    mac.update(&challenge);
    let digest = hex::encode(mac.finalize().into_bytes());

    Ok(STANDARD.encode(format!("{username} {digest}")))
}

/// Generates the XOAUTH2 initial response.
///
/// Format: base64 of `user=<user>\x01auth=Bearer <token>\x01\x01`
#[must_use]
pub fn xoauth2_response(user: &str, token: &str) -> String {
    STANDARD.encode(format!("user={user}\x01auth=Bearer {token}\x01\x01"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_response() {
        let response = plain_response("user", "pass");
        assert_eq!(STANDARD.decode(&response).unwrap(), b"\0user\0pass");
        assert_eq!(response, "AHVzZXIAcGFzcw==");
    }

    #[test]
    fn test_login_response() {
        assert_eq!(login_response("user@example.com"), "dXNlckBleGFtcGxlLmNvbQ==");
    }

    #[test]
    fn test_cram_md5_rfc2195_example() {
        let challenge = STANDARD.encode("<1896.697170952@postoffice.reston.mci.net>");
        let response = cram_md5_response("tim", "tanstaaftanstaaf", &challenge).unwrap();
        assert_eq!(
            String::from_utf8(STANDARD.decode(response).unwrap()).unwrap(),
            "tim b913a602c7eda7a495b4e6e7334d3890"
        );
    }

    #[test]
    fn test_cram_md5_bad_challenge() {
        assert!(cram_md5_response("tim", "secret", "not base64!").is_err());
    }

    #[test]
    fn test_xoauth2_response() {
        let response = xoauth2_response("user@example.com", "ya29.token");
        assert_eq!(
            STANDARD.decode(response).unwrap(),
            b"user=user@example.com\x01auth=Bearer ya29.token\x01\x01"
        );
    }
}
