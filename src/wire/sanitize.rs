//! Sanitizer for attacker-supplied text that gets echoed into a reply.

/// Longest fragment ever echoed back.
pub const MAX_ECHO_LEN: usize = 32;

/// Keep only printable ASCII (0x20..=0x7E) and truncate to `MAX_ECHO_LEN`.
///
/// CR and LF never survive, so an echoed fragment cannot start a new protocol
/// line in the reply stream.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| (' '..='~').contains(c))
        .take(MAX_ECHO_LEN)
        .collect()
}
