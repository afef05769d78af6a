//! SMTP transparency (RFC 5321 §4.5.2).
//!
//! A line that starts with `.` gets one more `.` so it cannot be mistaken
//! for the end-of-data marker, and the payload is closed with `.` on a line
//! of its own.

/// End-of-data marker appended after the stuffed payload.
pub const TERMINATOR: &[u8] = b".\r\n";

/// Normalizes line endings to CRLF, dot-stuffs every line and appends the
/// terminator line.
#[must_use]
pub fn dot_stuff(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 8);

    // A trailing line break ends the last line rather than starting a new one
    let body = message
        .strip_suffix(b"\r\n")
        .or_else(|| message.strip_suffix(b"\n"))
        .unwrap_or(message);

    if !message.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            if line.first() == Some(&b'.') {
                out.push(b'.');
            }

            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(TERMINATOR);
    out
}

/// Reverses [`dot_stuff`]: drops the terminator line and removes one
/// leading `.` from every line, as a receiving server does.
#[must_use]
pub fn dot_unstuff(data: &[u8]) -> Vec<u8> {
    let body = if data == TERMINATOR {
        &data[..0]
    } else {
        data.strip_suffix(b"\r\n.\r\n")
            .map_or(data, |b| &data[..b.len() + 2])
    };

    let mut out = Vec::with_capacity(body.len());
    let mut at_line_start = true;
    for (i, &byte) in body.iter().enumerate() {
        if at_line_start && byte == b'.' {
            at_line_start = false;
            continue;
        }
        out.push(byte);
        at_line_start = byte == b'\n' && i > 0 && body[i - 1] == b'\r';
    }
    out
}
