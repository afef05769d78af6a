//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header encoding.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum line length for Quoted-Printable and Base64 bodies.
pub const MAX_LINE_LENGTH: usize = 76;

/// ASCII punctuation passed through unencoded inside a Q-encoded word.
const Q_SAFE_PUNCTUATION: &[u8] = b"!*+-/.:";

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 split into CRLF-separated lines of at most
/// [`MAX_LINE_LENGTH`] characters.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);

    // Base64 output is pure ASCII, so chunking bytes never splits a char.
    for (i, chunk) in encoded.as_bytes().chunks(MAX_LINE_LENGTH).enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        result.push_str(&String::from_utf8_lossy(chunk));
    }

    result
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Hard line breaks (`\n` or `\r\n`) are kept as CRLF; every other byte that
/// is not printable ASCII is escaped. Lines are soft-broken so that no output
/// line exceeds [`MAX_LINE_LENGTH`] characters.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        encode_quoted_printable_line(line.as_bytes(), &mut result);
    }

    result
}

fn encode_quoted_printable_line(line: &[u8], result: &mut String) {
    let mut line_length = 0;
    let mut token = String::with_capacity(3);

    for (i, byte) in line.iter().enumerate() {
        token.clear();
        let is_last = i + 1 == line.len();

        match byte {
            // Printable ASCII except '='
            b'!'..=b'<' | b'>'..=b'~' => token.push(char::from(*byte)),
            // Whitespace is literal unless it would end the line
            b' ' | b'\t' if !is_last => token.push(char::from(*byte)),
            _ => {
                let _ = write!(token, "={byte:02X}");
            }
        }

        // Reserve one column for the soft line break marker
        if line_length + token.len() > MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        result.push_str(&token);
        line_length += token.len();
    }
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or the
/// decoded bytes are not UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    let decoded = decode_quoted_printable_bytes(text.as_bytes())?;
    String::from_utf8(decoded).map_err(Into::into)
}

/// Decodes Quoted-Printable data into raw bytes.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        // Soft line break
        match bytes.get(i + 1..i + 3) {
            Some(b"\r\n") => {
                i += 3;
                continue;
            }
            _ if bytes.get(i + 1) == Some(&b'\n') => {
                i += 2;
                continue;
            }
            _ => {}
        }

        // Hex encoded byte
        let hex = bytes
            .get(i + 1..i + 3)
            .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".to_string()))?;
        let hex = std::str::from_utf8(hex)
            .map_err(|_| Error::InvalidEncoding("Invalid escape sequence".to_string()))?;
        let byte = u8::from_str_radix(hex, 16)
            .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
        result.push(byte);
        i += 3;
    }

    Ok(result)
}

/// Encodes a header value as an RFC 2047 encoded word when needed.
///
/// Values made only of printable ASCII (space included) are returned
/// unchanged. Anything else becomes a single `=?UTF-8?Q?...?=` word: ASCII
/// alphanumerics and `!*+-/.:` pass through, space becomes `_`, and every
/// other byte (including `?`, `=` and `_`) is written as `=XX`.
///
/// The output is never split across several encoded words, so very long
/// non-ASCII values produce one word longer than the 75 characters RFC 2047
/// recommends.
#[must_use]
pub fn encode_header(value: &str) -> String {
    if value.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
        return value.to_string();
    }

    let mut result = String::with_capacity(value.len() * 3 + 12);
    result.push_str("=?UTF-8?Q?");
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || Q_SAFE_PUNCTUATION.contains(&byte) {
            result.push(char::from(byte));
        } else if byte == b' ' {
            result.push('_');
        } else {
            let _ = write!(result, "={byte:02X}");
        }
    }
    result.push_str("?=");
    result
}

/// Decodes a single RFC 2047 encoded word.
///
/// Format: `=?charset?encoding?encoded-text?=`. Input that is not an encoded
/// word is returned unchanged.
///
/// # Errors
///
/// Returns an error if the input is a malformed encoded word.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    // Check for RFC 2047 format
    if !text.starts_with("=?") || !text.ends_with("?=") || text.len() < 4 {
        return Ok(text.to_string());
    }

    let inner = &text[2..text.len() - 2];
    let parts: Vec<&str> = inner.split('?').collect();

    if parts.len() != 3 {
        return Err(Error::InvalidEncoding(
            "Invalid RFC 2047 format".to_string(),
        ));
    }

    let encoding = parts[1].to_uppercase();
    let encoded_text = parts[2];

    match encoding.as_str() {
        "B" => {
            // Base64
            let decoded = decode_base64(encoded_text)?;
            String::from_utf8(decoded).map_err(Into::into)
        }
        "Q" => {
            // Quoted-Printable (with underscore for space)
            let text_with_spaces = encoded_text.replace('_', " ");
            decode_quoted_printable(&text_with_spaces)
        }
        _ => Err(Error::InvalidEncoding(format!(
            "Unknown encoding: {encoding}"
        ))),
    }
}

/// Decodes every encoded word inside a header value.
///
/// Whitespace between two adjacent encoded words is dropped, as RFC 2047
/// requires. Malformed words are kept literally.
#[must_use]
pub fn decode_header_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;
    let mut after_word = false;

    while let Some((start, end, decoded)) = next_encoded_word(rest) {
        let between = &rest[..start];
        if !(after_word && between.chars().all(char::is_whitespace)) {
            result.push_str(between);
        }
        result.push_str(&decoded);
        after_word = true;
        rest = &rest[end..];
    }

    result.push_str(rest);
    result
}

fn next_encoded_word(text: &str) -> Option<(usize, usize, String)> {
    let mut from = 0;
    while let Some(pos) = text[from..].find("=?") {
        let start = from + pos;
        if let Some(len) = encoded_word_len(&text[start..]) {
            if let Ok(decoded) = decode_rfc2047(&text[start..start + len]) {
                return Some((start, start + len, decoded));
            }
        }
        from = start + 2;
    }
    None
}

/// Length of the encoded word at the start of `text`, if there is one.
fn encoded_word_len(text: &str) -> Option<usize> {
    let body = text.strip_prefix("=?")?;
    let charset_end = body.find('?')?;
    let after_charset = &body[charset_end + 1..];
    let encoding_end = after_charset.find('?')?;
    let payload = &after_charset[encoding_end + 1..];
    let payload_end = payload.find("?=")?;
    if payload[..payload_end].contains(char::is_whitespace) {
        return None;
    }
    Some(2 + charset_end + 1 + encoding_end + 1 + payload_end + 2)
}
