// For signature verification
use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
type HmacSha256 = Hmac<Sha256>;

/// Helper function for verifying GitHub webhook signature
///
/// Expects the `X-Hub-Signature-256` header value in the form
/// `sha256=<hex digest>` and checks it against an HMAC-SHA256 digest
/// of the raw request body, keyed with the repository secret.
pub fn verify_github_signature(secret: &str, payload: &[u8], signature_header: &str) -> bool {
    // Expected format: "sha256=..."
    let expected_prefix = "sha256=";
    if !signature_header.starts_with(expected_prefix) {
        return false;
    }

    // signature from git
    let git_signature = &signature_header[expected_prefix.len()..];

    // GitHub provides the signature as hex
    let claimed = match hex_decode(git_signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    // Compute HMAC SHA256 over the raw body
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    // Constant-time comparison
    mac.verify_slice(&claimed).is_ok()
}

/// Splits `text` into parts of at most `limit` characters.
///
/// Each part breaks at the last line break inside the window when there
/// is one, dropping that line break, and otherwise hard at the window
/// edge. Leading whitespace of every remainder is stripped, so a part
/// can come out empty.
pub fn split_text(text: &str, limit: usize) -> Vec<String> {
    debug_assert!(limit > 0, "split limit must be positive");
    if limit == 0 || text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut rest = text;
    while rest.chars().count() > limit {
        // Byte offset just past the first `limit` characters.
        let window_end = rest
            .char_indices()
            .nth(limit)
            .map(|(offset, _)| offset)
            .unwrap_or(rest.len());

        let (part, tail) = match rest[..window_end].rfind('\n') {
            Some(newline) => (&rest[..newline], &rest[newline..]),
            None => (&rest[..window_end], &rest[window_end..]),
        };
        parts.push(part.to_string());
        rest = tail.trim_start();
    }
    parts.push(rest.to_string());
    parts
}
