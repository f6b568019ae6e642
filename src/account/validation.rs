//! Syntax checks applied to API credentials and update payloads before they reach the store.

use uuid::Uuid;

/// Length of generated API keys.
pub const KEY_LEN: usize = 40;

/// Length of a [DNS-01] challenge response: an unpadded base64url SHA-256 digest.
///
/// [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
pub const TXT_LEN: usize = 43;

const MAX_LABEL_LEN: usize = 63;

/// The URL safe base64 alphabet (without padding) used by ACME, and by generated API keys.
pub fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn sanitized_len(s: &str) -> usize {
    s.chars().filter(|c| is_token_char(*c)).count()
}

/// Parse an `X-Api-User` value into an account identity.
#[must_use]
pub fn valid_username(s: &str) -> Option<Uuid> {
    Uuid::try_parse(s).ok()
}

#[must_use]
pub fn valid_key(s: &str) -> bool {
    s.chars().count() == KEY_LEN && sanitized_len(s) == KEY_LEN
}

/// A delegated subdomain is a single DNS label: 1-63 alphanumerics or hyphens, not starting or
/// ending with a hyphen.
#[must_use]
pub fn valid_subdomain(s: &str) -> bool {
    let bytes = s.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= MAX_LABEL_LEN
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        }
        _ => false,
    }
}

#[must_use]
pub fn valid_txt(s: &str) -> bool {
    s.chars().count() == TXT_LEN && sanitized_len(s) == TXT_LEN
}
