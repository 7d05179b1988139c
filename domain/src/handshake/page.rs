//! Renders the popup callback page.
//!
//! The callback endpoint always answers 200 with HTML: the consumer is a
//! popup window, not an API client, so success and failure alike are
//! communicated in-page. The handoff page embeds the encoded message in an
//! inline script that executes the delivery policy from
//! [`super::broadcast`]; the error page renders the diagnostic and stops
//! there, so the operator can read it.

use crate::handshake::broadcast::{
    DELIVERED_NOTICE, FALLBACK_STORAGE_KEY, NO_OPENER_NOTICE, PROBE_MESSAGE,
    PROBE_TO_SEND_DELAY_MS, SEND_TO_CLOSE_DELAY_MS,
};
use crate::handshake::message::{escape_for_script_embedding, escape_html_text, ExchangeResult};

/// Policy for the callback response: same-origin plus the inline script and
/// style this page carries. Inline execution is required because the payload
/// is embedded in the document; everything else stays locked down.
pub const CONTENT_SECURITY_POLICY: &str =
    "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline';";

/// Render the popup document for an exchange outcome.
///
/// The encoded message is embedded on both variants; only the handoff page
/// also carries the delivery script.
pub fn render(result: &ExchangeResult) -> String {
    // Everything on the path from provider response to markup goes through
    // the script-embedding escape; the message lands inside a double-quoted
    // JS string literal.
    let embedded = escape_for_script_embedding(&result.encode());
    match result {
        ExchangeResult::Failure { reason, detail } => error_page(reason, detail, &embedded),
        ExchangeResult::Success { .. } => handoff_page(&embedded),
    }
}

fn handoff_page(embedded: &str) -> String {
    let script = handoff_script();
    format!(
        "<!doctype html>\n\
         <html>\n\
         <head>\n\
         <title>Completing sign-in</title>\n\
         <style>body{{font-family:sans-serif;text-align:center;padding:50px;}}</style>\n\
         </head>\n\
         <body>\n\
         <p id=\"msg\">Completing sign-in\u{2026}</p>\n\
         <button id=\"retry\">Complete sign-in</button>\n\
         <script>window.CMS_OAUTH_MSG=\"{embedded}\";</script>\n\
         <script>{script}</script>\n\
         </body>\n\
         </html>\n"
    )
}

/// The browser-side rendition of the broadcast machine, parameterized by the
/// same constants the Rust model uses. The target origin is deliberately
/// unrestricted: the popup cannot know which of the site's origins opened it,
/// and the message is inert without the opener's listener. Every window
/// operation is wrapped so racing an already-closed window stays silent.
fn handoff_script() -> String {
    format!(
        r#"(function () {{
  var op = window.opener;
  var msg = window.CMS_OAUTH_MSG;
  var done = false;
  var note = function (text) {{
    var el = document.getElementById("msg");
    if (el) el.textContent = text;
  }};
  var persist = function () {{
    try {{ localStorage.setItem("{key}", msg); }} catch (e) {{}}
  }};
  var send = function () {{
    if (!msg) return;
    persist();
    if (!op) {{ note("{no_opener}"); return; }}
    try {{ op.postMessage(msg, "*"); }} catch (e) {{}}
    if (done) return;
    done = true;
    note("{delivered}");
    setTimeout(function () {{ try {{ window.close(); }} catch (e) {{}} }}, {close_delay});
  }};
  var retry = document.getElementById("retry");
  if (retry) retry.addEventListener("click", function () {{ op = window.opener; send(); }});
  if (!op) {{
    persist();
    note("{no_opener}");
  }} else {{
    try {{ op.postMessage("{probe}", "*"); }} catch (e) {{}}
    setTimeout(send, {send_delay});
  }}
}})();"#,
        key = FALLBACK_STORAGE_KEY,
        no_opener = NO_OPENER_NOTICE,
        delivered = DELIVERED_NOTICE,
        probe = PROBE_MESSAGE,
        close_delay = SEND_TO_CLOSE_DELAY_MS,
        send_delay = PROBE_TO_SEND_DELAY_MS,
    )
}

/// Failure diagnostics are rendered, not relayed: the encoded message is
/// still embedded (useful when diagnosing with the console open), but the
/// page carries no delivery script, never closes itself, and leaves the
/// operator with actionable text.
fn error_page(reason: &str, detail: &str, embedded: &str) -> String {
    let reason_html = escape_html_text(reason);
    let detail_block = if detail.is_empty() {
        String::new()
    } else {
        format!(
            "<pre style=\"text-align:left;display:inline-block;\">{}</pre>\n",
            escape_html_text(detail)
        )
    };
    format!(
        "<!doctype html>\n\
         <html>\n\
         <head>\n\
         <title>Sign-in failed</title>\n\
         <style>body{{font-family:sans-serif;text-align:center;padding:50px;}}</style>\n\
         </head>\n\
         <body>\n\
         <h1>Sign-in failed</h1>\n\
         <p id=\"msg\">{reason_html}</p>\n\
         {detail_block}\
         <p>Close this window and start sign-in again from the admin page.</p>\n\
         <script>window.CMS_OAUTH_MSG=\"{embedded}\";</script>\n\
         </body>\n\
         </html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handoff_page_embeds_escaped_message() {
        let page = render(&ExchangeResult::success("T"));

        assert!(page.contains(
            r#"window.CMS_OAUTH_MSG="authorization:github:success:{\"token\":\"T\",\"provider\":\"github\"}";"#
        ));
    }

    #[test]
    fn test_handoff_page_neutralizes_hostile_token() {
        let page = render(&ExchangeResult::success("</script><script>alert(1)//"));

        assert!(!page.contains("</script><script>alert"));
        assert!(page.contains(r#"<\/script><script>alert(1)//"#));
    }

    #[test]
    fn test_handoff_page_carries_all_delivery_channels() {
        let page = render(&ExchangeResult::success("T"));

        assert!(page.contains(FALLBACK_STORAGE_KEY));
        assert!(page.contains(PROBE_MESSAGE));
        assert!(page.contains("id=\"retry\""));
        assert!(page.contains(&format!("setTimeout(send, {PROBE_TO_SEND_DELAY_MS})")));
        assert!(page.contains(&format!("}}, {SEND_TO_CLOSE_DELAY_MS})")));
    }

    #[test]
    fn test_error_page_shows_diagnostic_and_never_closes() {
        let result = ExchangeResult::failure(
            "provider error",
            r#"{"error":"bad_verification_code"}"#,
        );
        let page = render(&result);

        assert!(page.contains("bad_verification_code"));
        assert!(!page.contains("window.close"));
        assert!(!page.contains("localStorage"));
        assert!(!page.contains("postMessage"));
        // The encoded message stays embedded for diagnosis.
        assert!(page.contains("window.CMS_OAUTH_MSG=\"authorization:github:error:"));
    }

    #[test]
    fn test_error_page_escapes_hostile_detail() {
        let result = ExchangeResult::failure("provider error", "<script>alert(1)</script>");
        let page = render(&result);

        // The visible diagnostic is entity-escaped...
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        // ...and the embedded copy cannot close the script element early.
        assert!(page.contains(r#"alert(1)<\/script>"#));
        assert!(!page.contains("alert(1)</script>"));
    }

    #[test]
    fn test_csp_permits_only_same_origin_plus_inline() {
        assert!(CONTENT_SECURITY_POLICY.contains("default-src 'self'"));
        assert!(CONTENT_SECURITY_POLICY.contains("script-src 'self' 'unsafe-inline'"));
        assert!(!CONTENT_SECURITY_POLICY.contains("unsafe-eval"));
    }
}
