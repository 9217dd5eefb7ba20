// PII redaction for evidence text headed to an external model

use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

// sk_live_..., pk_test_..., and bearer tokens
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:sk|pk|rk)_(?:live|test)_[A-Za-z0-9]+\b|(?i:bearer)\s+[A-Za-z0-9._~+/-]+=*")
        .unwrap()
});

static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap());

/// Mask emails, API tokens and IPv4 addresses. Running it twice changes nothing.
pub fn redact(text: &str) -> String {
    let text = EMAIL.replace_all(text, "<EMAIL>");
    let text = TOKEN.replace_all(&text, "<TOKEN>");
    IPV4.replace_all(&text, "IP_ADDR").into_owned()
}
