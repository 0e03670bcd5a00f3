use regex::Regex;
use std::sync::OnceLock;

const DEFAULT_PREVIEW_LEN: usize = 400;

pub fn preview_len() -> usize {
    std::env::var("NUTRISNAP_PREVIEW_LEN")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_PREVIEW_LEN)
}

/// Redact credentials and cap the length of text headed for the log.
pub fn sanitize_for_log(input: &str) -> String {
    truncate_chars(&redact(input), preview_len())
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    let total = s.chars().count();
    if total <= max_chars {
        return s.to_string();
    }

    let truncated: String = s.chars().take(max_chars).collect();
    format!(
        "{truncated}... [truncated {} chars]",
        total.saturating_sub(max_chars)
    )
}

fn redact(input: &str) -> String {
    static SK_RE: OnceLock<Regex> = OnceLock::new();
    static GOOGLE_KEY_RE: OnceLock<Regex> = OnceLock::new();
    static QUERY_KEY_RE: OnceLock<Regex> = OnceLock::new();
    static URL_CREDS_RE: OnceLock<Regex> = OnceLock::new();
    static KV_RE: OnceLock<Regex> = OnceLock::new();

    let sk_re = SK_RE.get_or_init(|| Regex::new(r"\bsk-[A-Za-z0-9_\-]{10,}\b").expect("sk regex"));
    let google_key_re =
        GOOGLE_KEY_RE.get_or_init(|| Regex::new(r"\bAIza[0-9A-Za-z_\-]{20,}").expect("google key regex"));
    let query_key_re = QUERY_KEY_RE
        .get_or_init(|| Regex::new(r"([?&](?:key|apikey|access_token)=)[^&\s]+").expect("query key regex"));
    let url_creds_re = URL_CREDS_RE.get_or_init(|| {
        Regex::new(r"(https?://)([^/\s:@]+):([^/\s@]+)@").expect("url creds regex")
    });
    let kv_re = KV_RE.get_or_init(|| {
        // key: value  OR  key=value  (JSON/env-like)
        Regex::new(
            r#"(?i)(api[_-]?key|authorization|access[_-]?token|client[_-]?secret|secret|password)\s*([:=])\s*(["']?)([^\s"'\r\n,}]+)(["']?)"#,
        )
        .expect("kv regex")
    });

    let mut s = input.to_string();
    s = url_creds_re.replace_all(&s, "$1$2:[REDACTED]@").to_string();
    s = query_key_re.replace_all(&s, "$1[REDACTED]").to_string();
    s = sk_re.replace_all(&s, "sk-[REDACTED]").to_string();
    s = google_key_re.replace_all(&s, "AIza[REDACTED]").to_string();
    s = kv_re.replace_all(&s, "$1$2$3[REDACTED]$5").to_string();

    s
}
