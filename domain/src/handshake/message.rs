//! Wire-message building and escaping for the credential handoff.
//!
//! The message grammar is `authorization:<provider>:<status>:<jsonPayload>`.
//! The admin window detects it with a prefix check and only then parses the
//! payload, so the encoder must keep the first three segments free of
//! surprises; the payload segment may contain anything JSON can.

use serde::Serialize;

/// Identity provider literal carried in every message.
pub const PROVIDER: &str = "github";

/// Leading segment of the message grammar, used by consumers for prefix
/// detection.
pub const MESSAGE_PREFIX: &str = "authorization:";

/// Fallback payload when serialization itself fails. Building the message must
/// never panic, so this absorbs the (practically unreachable) error arm.
const ENCODING_FAILURE_PAYLOAD: &str = r#"{"error":"encoding failure"}"#;

/// Outcome of the authorization-code exchange, produced once per callback and
/// consumed once by the popup page.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeResult {
    Success { provider: String, token: String },
    Failure { reason: String, detail: String },
}

#[derive(Debug, Serialize)]
struct SuccessPayload<'a> {
    token: &'a str,
    provider: &'a str,
}

#[derive(Debug, Serialize)]
struct FailurePayload<'a> {
    error: &'a str,
    detail: &'a str,
}

impl ExchangeResult {
    pub fn success(token: impl Into<String>) -> Self {
        Self::Success {
            provider: PROVIDER.to_string(),
            token: token.into(),
        }
    }

    pub fn failure(reason: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
            detail: detail.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// The `<status>` segment for this result.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failure { .. } => "error",
        }
    }

    /// Build the wire message. Deterministic and total: inputs that cannot be
    /// serialized degrade to an error-shaped message rather than a panic.
    pub fn encode(&self) -> String {
        match self {
            Self::Success { provider, token } => {
                match serde_json::to_string(&SuccessPayload { token, provider }) {
                    Ok(payload) => format!("{MESSAGE_PREFIX}{provider}:success:{payload}"),
                    Err(_) => {
                        format!("{MESSAGE_PREFIX}{provider}:error:{ENCODING_FAILURE_PAYLOAD}")
                    }
                }
            }
            Self::Failure { reason, detail } => {
                format!("{MESSAGE_PREFIX}{PROVIDER}:error:{}", failure_payload(reason, detail))
            }
        }
    }
}

/// Provider-reported errors arrive as raw JSON objects and are forwarded
/// verbatim as the payload; anything else is wrapped so the payload segment is
/// always a JSON object.
fn failure_payload(reason: &str, detail: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(detail) {
        Ok(value) if value.is_object() => detail.trim().to_string(),
        _ => serde_json::to_string(&FailurePayload {
            error: reason,
            detail,
        })
        .unwrap_or_else(|_| ENCODING_FAILURE_PAYLOAD.to_string()),
    }
}

/// Escape a string for embedding inside a double-quoted string literal in an
/// inline `<script>` element.
///
/// Security-critical: provider error payloads are attacker-influenceable (a
/// malicious or misconfigured provider can return arbitrary text), and this is
/// the only barrier between that text and an executable script context. Beyond
/// the usual JS string escapes, the literal `</script` sequence must not
/// survive in any casing, or the markup parser would terminate the script
/// element mid-string.
pub fn escape_for_script_embedding(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    replace_ascii_case_insensitive(&escaped, "</script", "<\\/script")
}

/// Escape text rendered into visible HTML (error diagnostics).
pub fn escape_html_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn replace_ascii_case_insensitive(haystack: &str, needle: &str, replacement: &str) -> String {
    debug_assert!(needle.is_ascii());
    let mut out = String::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        let rest = &haystack[i..];
        if rest
            .get(..needle.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(needle))
        {
            out.push_str(replacement);
            i += needle.len();
            continue;
        }
        // Advance one full character; an ASCII needle can never start inside
        // a multi-byte sequence.
        match rest.chars().next() {
            Some(ch) => {
                out.push(ch);
                i += ch.len_utf8();
            }
            None => break,
        }
    }
    out
}
