//! Cleaning of external tool output before it is logged or shown to a user.
//!
//! Renderer stderr is full of terminal colour codes and occasionally echoes
//! environment values; neither belongs in an API response.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::MAX_DIAGNOSTIC_CHARS;

/// Strip ANSI codes, redact secrets and clip to the diagnostic preview length.
pub fn clean_diagnostic(input: &str) -> String {
    let no_ansi = strip_ansi(input);
    let redacted = redact(no_ansi.trim());
    truncate_chars(&redacted, MAX_DIAGNOSTIC_CHARS)
}

pub fn strip_ansi(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        // CSI: ESC [ ... <final byte 0x40..=0x7e>
        if bytes[i] == 0x1b && i + 1 < bytes.len() && bytes[i + 1] == b'[' {
            i += 2;
            while i < bytes.len() {
                let b = bytes[i];
                i += 1;
                if (0x40..=0x7e).contains(&b) {
                    break;
                }
            }
            continue;
        }

        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Keeps the tail: tracebacks put the actual error on the last lines.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    let total = s.chars().count();
    if total <= max_chars {
        return s.to_string();
    }

    let skipped = total - max_chars;
    let tail: String = s.chars().skip(skipped).collect();
    format!("[truncated {skipped} chars]...{tail}")
}

fn redact(input: &str) -> String {
    static SK_RE: OnceLock<Regex> = OnceLock::new();
    static URL_CREDS_RE: OnceLock<Regex> = OnceLock::new();
    static KV_RE: OnceLock<Regex> = OnceLock::new();

    let sk_re = SK_RE.get_or_init(|| Regex::new(r"\bsk-[A-Za-z0-9_\-]{10,}\b").expect("sk regex"));
    let url_creds_re = URL_CREDS_RE.get_or_init(|| {
        Regex::new(r"(https?://)([^/\s:@]+):([^/\s@]+)@").expect("url creds regex")
    });
    let kv_re = KV_RE.get_or_init(|| {
        Regex::new(
            r#"(?i)(api[_-]?key|authorization|access[_-]?token|secret|password)\s*([:=])\s*(["']?)([^\s"'\r\n,}]+)(["']?)"#,
        )
        .expect("kv regex")
    });

    let s = url_creds_re.replace_all(input, "$1$2:[REDACTED]@");
    let s = sk_re.replace_all(&s, "sk-[REDACTED]");
    kv_re.replace_all(&s, "$1$2$3[REDACTED]$5").into_owned()
}
